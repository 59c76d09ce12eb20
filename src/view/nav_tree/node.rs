use std::fmt;

/// Unique identifier for a tree node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

/// Represents a node in the navigation tree
#[derive(Debug, Clone)]
pub struct TreeNode {
    /// Unique identifier
    pub id: NodeId,
    pub label: String,
    /// Page or anchor this node opens; `None` for grouping nodes
    pub target: Option<String>,
    /// Parent node ID (None for root)
    pub parent: Option<NodeId>,
    pub children: Children,
    /// Current UI state of the node
    pub state: NodeState,
    /// Expand as soon as the outstanding fetch lands
    pub(crate) open_on_load: bool,
}

/// Materialization state of a node's children
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Children {
    Leaf,
    /// Children known from the initial feed, in display order
    Eager(Vec<NodeId>),
    /// Children held by an external resource; `resolved` caches the nodes
    /// materialized on first expansion
    Lazy {
        resource: String,
        resolved: Option<Vec<NodeId>>,
    },
}

impl Children {
    /// Child ids if they are in memory
    pub fn materialized(&self) -> Option<&[NodeId]> {
        match self {
            Children::Leaf => Some(&[]),
            Children::Eager(ids) => Some(ids),
            Children::Lazy { resolved, .. } => resolved.as_deref(),
        }
    }

    /// The resource still to be fetched, if any
    pub fn unresolved_resource(&self) -> Option<&str> {
        match self {
            Children::Lazy {
                resource,
                resolved: None,
            } => Some(resource),
            _ => None,
        }
    }
}

impl TreeNode {
    pub(crate) fn new(
        id: NodeId,
        label: String,
        target: Option<String>,
        parent: Option<NodeId>,
        children: Children,
    ) -> Self {
        let state = if children == Children::Leaf {
            NodeState::Leaf
        } else {
            NodeState::Collapsed
        };

        Self {
            id,
            label,
            target,
            parent,
            children,
            state,
            open_on_load: false,
        }
    }

    /// Grouping nodes have no target of their own
    pub fn is_grouping(&self) -> bool {
        self.target.is_none()
    }

    pub fn is_expanded(&self) -> bool {
        self.state == NodeState::Expanded
    }

    /// Collapsed, including after a failed fetch (which is retried on expand)
    pub fn is_collapsed(&self) -> bool {
        matches!(self.state, NodeState::Collapsed | NodeState::Error(_))
    }

    pub fn is_loading(&self) -> bool {
        self.state == NodeState::Loading
    }

    pub fn is_error(&self) -> bool {
        matches!(self.state, NodeState::Error(_))
    }

    pub fn is_leaf(&self) -> bool {
        self.state == NodeState::Leaf
    }

    /// Whether the children still have to be fetched
    pub fn is_lazy(&self) -> bool {
        self.children.unresolved_resource().is_some()
    }

    /// Materialized child ids (empty while lazy)
    pub fn child_ids(&self) -> &[NodeId] {
        self.children.materialized().unwrap_or(&[])
    }
}

/// UI state of a tree node
#[derive(Debug, Clone, PartialEq)]
pub enum NodeState {
    Collapsed,
    /// Lazy children are being fetched
    Loading,
    Expanded,
    /// Last fetch failed (with error message); behaves as collapsed
    Error(String),
    /// No children, cannot be expanded
    Leaf,
}
