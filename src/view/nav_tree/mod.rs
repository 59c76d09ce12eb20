// Navigation tree with lazily loaded sub-trees
//
// This module provides the tree store (node arena plus cached lazy
// expansions), the controller that keeps it in sync with the content pane,
// and the cursor/scroll state of the pane that displays it.

pub mod node;
pub mod pane;
pub mod store;
pub mod sync;

pub use node::{Children, NodeId, NodeState, TreeNode};
pub use pane::NavTreeView;
pub use store::{ExpandStep, FetchedSubtree, PendingExpand, TreeStore};
pub use sync::{
    resolve_reference, ContentPane, NavigationState, SyncController, SyncOutcome, SyncStep,
};
