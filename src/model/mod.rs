// Data model for the navigation feed
//
// Decoding of generated tree/index scripts, the explicit node representation
// and the sorted reference index.

pub mod error;
pub mod index;
pub mod script;
pub mod tree_data;

pub use error::{DataError, NavError};
pub use index::{IndexEntry, NavIndex, NodePath, ReferenceIndex, SearchOutcome};
pub use tree_data::{root_from_list, ChildSource, NodeData};
