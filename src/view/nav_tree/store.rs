use super::node::{Children, NodeId, NodeState, TreeNode};
use crate::model::{root_from_list, ChildSource, NavError, NodeData};
use crate::services::source::SourceManager;
use std::io;

/// Navigation tree with lazy loading support
///
/// The store owns every node (an arena indexed by [`NodeId`]) and the cached
/// results of lazy expansion. Eager children from the initial feed are
/// materialized up front; lazy sub-trees are fetched on first expansion and
/// kept for the rest of the session, so expanding twice never refetches.
#[derive(Debug)]
pub struct TreeStore {
    /// All nodes; `nodes[0]` is the root
    nodes: Vec<TreeNode>,
    /// Data source for lazy sub-trees
    manager: SourceManager,
    /// Bumped by `dispose` so late fetch results are discarded
    epoch: u64,
    disposed: bool,
}

/// Outcome of starting an expansion
#[derive(Debug)]
pub enum ExpandStep {
    /// Children are in memory
    Ready(Vec<NodeId>),
    /// A fetch must be run; hand the result to [`TreeStore::complete_expand`]
    Pending(PendingExpand),
    /// A fetch for this node is already outstanding
    Attached,
}

/// A lazy sub-tree fetch detached from the store, so an event loop can run
/// it on another task while the UI keeps rendering
#[derive(Debug)]
pub struct PendingExpand {
    node: NodeId,
    resource: String,
    epoch: u64,
    manager: SourceManager,
}

impl PendingExpand {
    pub fn node(&self) -> NodeId {
        self.node
    }

    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Run the fetch
    pub async fn fetch(self) -> FetchedSubtree {
        let result = self.manager.load_subtree(&self.resource).await;
        FetchedSubtree {
            node: self.node,
            resource: self.resource,
            epoch: self.epoch,
            result,
        }
    }
}

/// Result of a [`PendingExpand`], ready to be installed into the store
#[derive(Debug)]
pub struct FetchedSubtree {
    node: NodeId,
    resource: String,
    epoch: u64,
    result: io::Result<Vec<NodeData>>,
}

impl FetchedSubtree {
    pub fn node(&self) -> NodeId {
        self.node
    }
}

impl TreeStore {
    /// Build a store from a root node; eager children are materialized now
    pub fn new(root: NodeData, manager: SourceManager) -> Self {
        let mut store = Self {
            nodes: Vec::new(),
            manager,
            epoch: 0,
            disposed: false,
        };
        let root_id = store.add_subtree(root, None);

        // the root's inline children are part of the initial load
        if let Some(root) = store.get_node_mut(root_id) {
            if matches!(root.children, Children::Eager(_)) {
                root.state = NodeState::Expanded;
            }
        }
        store
    }

    /// Load the top-level tree from the manager's source
    ///
    /// # Errors
    ///
    /// Returns an error if the tree cannot be read or has no entries.
    pub async fn load(manager: SourceManager, root_label: &str) -> io::Result<Self> {
        let nodes = manager.load_tree().await?;
        let root = root_from_list(nodes, root_label)?;
        Ok(Self::new(root, manager))
    }

    /// Get the root node ID
    pub fn root_id(&self) -> NodeId {
        NodeId(0)
    }

    /// The root grouping node; always present
    pub fn root(&self) -> &TreeNode {
        &self.nodes[0]
    }

    /// Get a node by ID
    pub fn get_node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id.0)
    }

    fn get_node_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        self.nodes.get_mut(id.0)
    }

    fn node_or_err(&self, id: NodeId) -> Result<&TreeNode, NavError> {
        self.get_node(id).ok_or(NavError::UnknownNode(id.0))
    }

    /// Get number of nodes currently in memory
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn manager(&self) -> &SourceManager {
        &self.manager
    }

    /// Materialized children of a node (None while still lazy)
    pub fn children(&self, id: NodeId) -> Option<&[NodeId]> {
        self.get_node(id).and_then(|node| node.children.materialized())
    }

    /// Add a node (and its eager descendants) to the arena
    fn add_subtree(&mut self, data: NodeData, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        let (children, eager) = match data.children {
            ChildSource::Leaf => (Children::Leaf, Vec::new()),
            ChildSource::Lazy(resource) => (
                Children::Lazy {
                    resource,
                    resolved: None,
                },
                Vec::new(),
            ),
            ChildSource::Eager(nodes) => (Children::Eager(Vec::new()), nodes),
        };
        self.nodes
            .push(TreeNode::new(id, data.label, data.target, parent, children));

        if !eager.is_empty() {
            let child_ids: Vec<NodeId> = eager
                .into_iter()
                .map(|child| self.add_subtree(child, Some(id)))
                .collect();
            if let Some(node) = self.get_node_mut(id) {
                node.children = Children::Eager(child_ids);
            }
        }
        id
    }

    /// Start materializing a node's children.
    ///
    /// Eager and already resolved children are returned immediately. For an
    /// unresolved lazy node the node enters `Loading` and the returned
    /// [`PendingExpand`] performs the fetch; a second call while that fetch
    /// is outstanding reports [`ExpandStep::Attached`] instead of starting
    /// another one.
    pub fn begin_expand(&mut self, id: NodeId) -> Result<ExpandStep, NavError> {
        if self.disposed {
            return Err(NavError::Disposed);
        }
        let node = self.node_or_err(id)?;
        if let Some(ids) = node.children.materialized() {
            return Ok(ExpandStep::Ready(ids.to_vec()));
        }
        if node.is_loading() {
            return Ok(ExpandStep::Attached);
        }

        let resource = node
            .children
            .unresolved_resource()
            .unwrap_or_default()
            .to_string();
        if let Some(node) = self.get_node_mut(id) {
            node.state = NodeState::Loading;
        }
        tracing::debug!("fetching sub-tree {:?} for {}", resource, id);

        Ok(ExpandStep::Pending(PendingExpand {
            node: id,
            resource,
            epoch: self.epoch,
            manager: self.manager.clone(),
        }))
    }

    /// Start materializing a node and open it once its children are present
    pub fn request_open(&mut self, id: NodeId) -> Result<ExpandStep, NavError> {
        let step = self.begin_expand(id)?;
        if let Some(node) = self.get_node_mut(id) {
            match &step {
                ExpandStep::Ready(ids) if !ids.is_empty() => node.state = NodeState::Expanded,
                ExpandStep::Ready(_) => {}
                ExpandStep::Pending(_) | ExpandStep::Attached => node.open_on_load = true,
            }
        }
        Ok(step)
    }

    /// Install the result of a [`PendingExpand`].
    ///
    /// Results for a disposed store are discarded. If the node was resolved
    /// in the meantime the cached children win and the duplicate is dropped.
    ///
    /// # Errors
    ///
    /// [`NavError::ResourceUnavailable`] if the fetch failed; the node stays
    /// lazy and records the failure so the next expansion retries.
    pub fn complete_expand(&mut self, fetched: FetchedSubtree) -> Result<Vec<NodeId>, NavError> {
        if self.disposed || fetched.epoch != self.epoch {
            tracing::debug!(
                "discarding sub-tree {:?} that arrived after dispose",
                fetched.resource
            );
            return Err(NavError::Disposed);
        }

        let id = fetched.node;
        let node = self.node_or_err(id)?;
        if let Some(ids) = node.children.materialized() {
            return Ok(ids.to_vec());
        }

        match fetched.result {
            Ok(data) => {
                let child_ids: Vec<NodeId> = data
                    .into_iter()
                    .map(|child| self.add_subtree(child, Some(id)))
                    .collect();
                if let Some(node) = self.get_node_mut(id) {
                    node.children = Children::Lazy {
                        resource: fetched.resource,
                        resolved: Some(child_ids.clone()),
                    };
                    node.state = if child_ids.is_empty() {
                        NodeState::Leaf
                    } else if node.open_on_load {
                        NodeState::Expanded
                    } else {
                        NodeState::Collapsed
                    };
                    node.open_on_load = false;
                }
                Ok(child_ids)
            }
            Err(e) => {
                tracing::warn!("failed to load sub-tree {:?}: {}", fetched.resource, e);
                if let Some(node) = self.get_node_mut(id) {
                    node.state = NodeState::Error(e.to_string());
                    node.open_on_load = false;
                }
                Err(NavError::unavailable(&fetched.resource, &e))
            }
        }
    }

    /// Materialize a node's children, fetching lazy ones exactly once.
    ///
    /// Subsequent calls return the cached children without refetching. If a
    /// detached fetch for this node is outstanding, the request attaches to
    /// it through the source manager.
    ///
    /// # Errors
    ///
    /// [`NavError::ResourceUnavailable`] if the sub-tree cannot be loaded;
    /// the node is left lazy and a later call retries.
    pub async fn expand_lazy(&mut self, id: NodeId) -> Result<Vec<NodeId>, NavError> {
        let pending = match self.begin_expand(id)? {
            ExpandStep::Ready(ids) => return Ok(ids),
            ExpandStep::Pending(pending) => pending,
            ExpandStep::Attached => {
                let resource = self
                    .node_or_err(id)?
                    .children
                    .unresolved_resource()
                    .unwrap_or_default()
                    .to_string();
                PendingExpand {
                    node: id,
                    resource,
                    epoch: self.epoch,
                    manager: self.manager.clone(),
                }
            }
        };
        let fetched = pending.fetch().await;
        self.complete_expand(fetched)
    }

    /// Walk `path` from the root, materializing lazy nodes on the way.
    ///
    /// Returns the nodes from the root to the target, inclusive.
    ///
    /// # Errors
    ///
    /// [`NavError::InvalidPath`] if an index is out of range at any level
    /// (index and tree data disagree); [`NavError::ResourceUnavailable`] if a
    /// sub-tree on the way cannot be loaded.
    pub async fn find_path(&mut self, path: &[usize]) -> Result<Vec<NodeId>, NavError> {
        let mut current = self.root_id();
        let mut nodes = Vec::with_capacity(path.len() + 1);
        nodes.push(current);

        for (depth, &index) in path.iter().enumerate() {
            let children = self.expand_lazy(current).await?;
            current = *children.get(index).ok_or_else(|| NavError::InvalidPath {
                path: path.to_vec(),
                depth,
            })?;
            nodes.push(current);
        }

        Ok(nodes)
    }

    /// Expand a node for display, loading its children first if needed
    pub async fn expand_node(&mut self, id: NodeId) -> Result<(), NavError> {
        let children = self.expand_lazy(id).await?;
        if !children.is_empty() {
            if let Some(node) = self.get_node_mut(id) {
                node.state = NodeState::Expanded;
            }
        }
        Ok(())
    }

    /// Collapse a node; its children stay cached
    pub fn collapse_node(&mut self, id: NodeId) {
        if let Some(node) = self.get_node_mut(id) {
            match node.state {
                NodeState::Expanded => node.state = NodeState::Collapsed,
                NodeState::Loading => node.open_on_load = false,
                _ => {}
            }
        }
    }

    /// Toggle node expansion (expand if collapsed, collapse if expanded)
    pub async fn toggle_node(&mut self, id: NodeId) -> Result<(), NavError> {
        let node = self.node_or_err(id)?;
        if node.is_leaf() {
            return Ok(());
        }

        if node.is_expanded() {
            self.collapse_node(id);
            Ok(())
        } else {
            self.expand_node(id).await
        }
    }

    /// Mark an already materialized node expanded (no-op for leaves and
    /// lazy nodes that have not been fetched)
    pub fn mark_expanded(&mut self, id: NodeId) {
        if let Some(node) = self.get_node_mut(id) {
            if !node.child_ids().is_empty() {
                node.state = NodeState::Expanded;
            }
        }
    }

    /// All nodes currently in the Expanded state
    pub fn expanded_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|node| node.is_expanded())
            .map(|node| node.id)
            .collect()
    }

    /// Nodes that are expanded or will expand once their fetch lands
    pub fn open_nodes(&self) -> Vec<NodeId> {
        self.nodes
            .iter()
            .filter(|node| node.is_expanded() || (node.is_loading() && node.open_on_load))
            .map(|node| node.id)
            .collect()
    }

    /// Get all visible nodes in tree order
    ///
    /// Returns a flat list of nodes that should be visible, respecting
    /// the expansion state of their ancestors.
    pub fn get_visible_nodes(&self) -> Vec<NodeId> {
        let mut visible = Vec::new();
        self.collect_visible_recursive(self.root_id(), &mut visible);
        visible
    }

    fn collect_visible_recursive(&self, id: NodeId, visible: &mut Vec<NodeId>) {
        visible.push(id);

        if let Some(node) = self.get_node(id) {
            if node.is_expanded() {
                for &child_id in node.child_ids() {
                    self.collect_visible_recursive(child_id, visible);
                }
            }
        }
    }

    /// Get the parent chain for a node (from root to node)
    pub fn get_ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut ancestors = Vec::new();
        let mut current = self.get_node(id).map(|n| n.id);

        while let Some(node_id) = current {
            ancestors.push(node_id);
            current = self.get_node(node_id).and_then(|n| n.parent);
        }

        ancestors.reverse();
        ancestors
    }

    /// Get the depth of a node (root is 0)
    pub fn get_depth(&self, id: NodeId) -> usize {
        self.get_ancestors(id).len().saturating_sub(1)
    }

    /// Child-index path from the root to a node
    pub fn path_of(&self, id: NodeId) -> Vec<usize> {
        let ancestors = self.get_ancestors(id);
        ancestors
            .windows(2)
            .filter_map(|pair| {
                self.children(pair[0])
                    .and_then(|ids| ids.iter().position(|&c| c == pair[1]))
            })
            .collect()
    }

    /// First materialized node (in arena order) pointing at `target`
    pub fn find_by_target(&self, target: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|node| node.target.as_deref() == Some(target))
            .map(|node| node.id)
    }

    /// Tear the store down; pending fetch results will be discarded
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.epoch += 1;
        for node in &mut self.nodes {
            if node.is_loading() {
                node.state = NodeState::Collapsed;
                node.open_on_load = false;
            }
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}
