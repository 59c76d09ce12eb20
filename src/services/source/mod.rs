// Documentation data sources for async, pluggable access to navigation data
//
// This module provides an abstraction over where generated tree and index
// scripts come from, with request coalescing in front of the backends.

pub mod backend;
pub mod local;
pub mod manager;
pub mod memory;
pub mod slow;

pub use backend::DocSource;
pub use local::LocalDocSource;
pub use manager::SourceManager;
pub use memory::MemoryDocSource;
pub use slow::{SlowDocSource, SlowSourceConfig, SourceMetrics};
