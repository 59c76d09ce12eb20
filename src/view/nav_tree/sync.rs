//! Keeps the navigation tree in step with the content pane
//!
//! Content to tree: when the content pane shows a new page, the page's
//! reference is looked up in the index and the tree is opened along the path
//! to its node. Tree to content: selecting a node asks the content pane to
//! show the node's target. Only the first direction is gated by the sync
//! toggle.
//!
//! Resolution is split into steps so an event loop can run the sub-tree
//! fetches on other tasks and keep rendering; [`SyncController::on_content_navigated`]
//! drives the same steps to completion for callers that can simply await.

use super::node::NodeId;
use super::store::{ExpandStep, FetchedSubtree, PendingExpand, TreeStore};
use crate::config::SyncConfig;
use crate::model::{NavError, NodePath, ReferenceIndex};

/// Host side of the tree -> content direction
pub trait ContentPane {
    /// Show `reference` in the content pane
    fn navigate_content_to(&mut self, reference: &str);
}

/// Navigation state of one browsing session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NavigationState {
    /// Reference last shown by the content pane (as far as the tree knows)
    pub current_reference: Option<String>,
    /// Nodes from the root to the selected node
    pub expanded_path: Vec<NodeId>,
    pub selected: Option<NodeId>,
    pub sync_enabled: bool,
}

/// Result of a content -> tree synchronization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The tree now shows the reference's node
    Synced,
    /// Sync is off; the tree was left alone
    SyncDisabled,
    /// The reference is not documented; the tree was left alone
    NotFound,
    /// Resolution failed; the tree is simply not synced
    Failed(NavError),
}

impl SyncOutcome {
    pub fn is_synced(&self) -> bool {
        matches!(self, SyncOutcome::Synced)
    }
}

/// Progress of a step-wise synchronization
#[derive(Debug)]
pub enum SyncStep {
    Finished(SyncOutcome),
    /// A sub-tree on the path must be fetched; pass the result to
    /// [`TreeStore::complete_expand`] and then call [`SyncController::continue_sync`]
    Fetch(PendingExpand),
    /// The next node is already being fetched elsewhere; call
    /// [`SyncController::continue_sync`] once that fetch lands
    Waiting(NodeId),
}

/// A path walk in progress
#[derive(Debug, Clone)]
struct ActiveSync {
    reference: String,
    path: NodePath,
    nodes: Vec<NodeId>,
}

/// Look `reference` up, optionally retrying without its `#anchor`
pub async fn resolve_reference(
    index: &dyn ReferenceIndex,
    reference: &str,
    anchor_fallback: bool,
) -> Result<NodePath, NavError> {
    match index.lookup(reference).await {
        Err(NavError::NotFound { .. }) if anchor_fallback => match reference.split_once('#') {
            Some((page, _)) if !page.is_empty() => {
                tracing::debug!("retrying {:?} without its anchor", reference);
                index
                    .lookup(page)
                    .await
                    .map_err(|err| match err {
                        NavError::NotFound { .. } => NavError::NotFound {
                            reference: reference.to_string(),
                        },
                        other => other,
                    })
            }
            _ => Err(NavError::NotFound {
                reference: reference.to_string(),
            }),
        },
        other => other,
    }
}

/// Synchronizes a [`TreeStore`] with the content pane
#[derive(Debug, Clone)]
pub struct SyncController {
    state: NavigationState,
    config: SyncConfig,
    active: Option<ActiveSync>,
}

impl SyncController {
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            state: NavigationState {
                sync_enabled: config.enabled_on_start,
                ..NavigationState::default()
            },
            config: config.clone(),
            active: None,
        }
    }

    pub fn state(&self) -> &NavigationState {
        &self.state
    }

    pub fn sync_enabled(&self) -> bool {
        self.state.sync_enabled
    }

    /// Label of the toggle affordance for the current state
    pub fn sync_label(&self) -> &str {
        if self.state.sync_enabled {
            &self.config.sync_on_label
        } else {
            &self.config.sync_off_label
        }
    }

    /// Flip synchronization; returns the new state
    pub fn toggle_sync(&mut self) -> bool {
        let enabled = !self.state.sync_enabled;
        self.set_sync_enabled(enabled);
        enabled
    }

    pub fn set_sync_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.active = None;
        }
        self.state.sync_enabled = enabled;
        tracing::debug!("panel synchronisation {}", if enabled { "on" } else { "off" });
    }

    /// Whether a step-wise synchronization is waiting on a fetch
    pub fn is_syncing(&self) -> bool {
        self.active.is_some()
    }

    /// The content pane now shows `reference`
    ///
    /// Resolves the reference and opens the tree along its path. With sync
    /// off only the reference is recorded (see [`Self::resync`]). A
    /// reference outside the index leaves the navigation state untouched.
    pub async fn on_content_navigated(
        &mut self,
        store: &mut TreeStore,
        index: &dyn ReferenceIndex,
        reference: &str,
    ) -> SyncOutcome {
        if !self.record_navigation(reference) {
            return SyncOutcome::SyncDisabled;
        }

        let lookup = resolve_reference(index, reference, self.config.anchor_fallback).await;
        let mut step = self.begin_sync(store, reference, lookup);
        loop {
            step = match step {
                SyncStep::Finished(outcome) => return outcome,
                SyncStep::Fetch(pending) => {
                    let fetched = pending.fetch().await;
                    let _ = store.complete_expand(fetched);
                    self.continue_sync(store)
                }
                SyncStep::Waiting(node) => {
                    // attaches to the outstanding fetch through the source manager
                    let _ = store.expand_lazy(node).await;
                    self.continue_sync(store)
                }
            };
        }
    }

    /// Re-resolve the current reference, typically after sync is turned
    /// back on
    pub async fn resync(
        &mut self,
        store: &mut TreeStore,
        index: &dyn ReferenceIndex,
    ) -> SyncOutcome {
        match self.state.current_reference.clone() {
            Some(reference) => self.on_content_navigated(store, index, &reference).await,
            None if self.state.sync_enabled => SyncOutcome::NotFound,
            None => SyncOutcome::SyncDisabled,
        }
    }

    /// First half of a navigation event for hosts that resolve on their own
    /// tasks. Returns false when sync is off, in which case the reference is
    /// only recorded.
    pub fn record_navigation(&mut self, reference: &str) -> bool {
        if self.state.sync_enabled {
            return true;
        }
        tracing::trace!("sync off, not following {:?}", reference);
        self.state.current_reference = Some(reference.to_string());
        false
    }

    /// Start walking the tree for a resolved reference
    pub fn begin_sync(
        &mut self,
        store: &mut TreeStore,
        reference: &str,
        lookup: Result<NodePath, NavError>,
    ) -> SyncStep {
        // a newer navigation supersedes any walk in progress
        self.active = None;

        if !self.state.sync_enabled {
            return SyncStep::Finished(SyncOutcome::SyncDisabled);
        }

        let path = match lookup {
            Ok(path) => path,
            Err(NavError::NotFound { .. }) => {
                tracing::debug!("{:?} is not in the index", reference);
                return SyncStep::Finished(SyncOutcome::NotFound);
            }
            Err(err) => {
                tracing::warn!("could not resolve {:?}: {}", reference, err);
                return SyncStep::Finished(SyncOutcome::Failed(err));
            }
        };
        tracing::debug!("resolved {:?} to {:?}", reference, path);

        self.active = Some(ActiveSync {
            reference: reference.to_string(),
            path,
            nodes: vec![store.root_id()],
        });
        self.walk(store, true)
    }

    /// Resume the walk after a sub-tree fetch completed
    pub fn continue_sync(&mut self, store: &mut TreeStore) -> SyncStep {
        if self.active.is_none() {
            return SyncStep::Finished(SyncOutcome::SyncDisabled);
        }
        self.walk(store, false)
    }

    /// Install a fetched sub-tree and resume the walk if it was waiting on it
    pub fn on_subtree_loaded(
        &mut self,
        store: &mut TreeStore,
        fetched: FetchedSubtree,
    ) -> Option<SyncStep> {
        let node = fetched.node();
        let _ = store.complete_expand(fetched);
        let waiting = self
            .active
            .as_ref()
            .and_then(|active| active.nodes.last())
            .is_some_and(|&frontier| frontier == node);
        waiting.then(|| self.continue_sync(store))
    }

    fn walk(&mut self, store: &mut TreeStore, retry_failed: bool) -> SyncStep {
        let Some(mut active) = self.active.take() else {
            return SyncStep::Finished(SyncOutcome::SyncDisabled);
        };

        // only the node whose fetch we were waiting on reports its failure;
        // failures left over from earlier attempts are retried
        let mut check_frontier = !retry_failed;
        while active.nodes.len() <= active.path.len() {
            let depth = active.nodes.len() - 1;
            let current = active.nodes[depth];

            if check_frontier {
                if let Some(err) = fetch_failure(store, current) {
                    return self.fail(&active, err);
                }
                check_frontier = false;
            }

            match store.begin_expand(current) {
                Ok(ExpandStep::Ready(children)) => match children.get(active.path[depth]) {
                    Some(&child) => active.nodes.push(child),
                    None => {
                        let err = NavError::InvalidPath {
                            path: active.path.clone(),
                            depth,
                        };
                        return self.fail(&active, err);
                    }
                },
                Ok(ExpandStep::Pending(pending)) => {
                    self.active = Some(active);
                    return SyncStep::Fetch(pending);
                }
                Ok(ExpandStep::Attached) => {
                    self.active = Some(active);
                    return SyncStep::Waiting(current);
                }
                Err(err) => return self.fail(&active, err),
            }
        }

        self.apply_path(store, &active.reference, active.nodes);
        SyncStep::Finished(SyncOutcome::Synced)
    }

    fn fail(&self, active: &ActiveSync, err: NavError) -> SyncStep {
        tracing::warn!("not syncing to {:?}: {}", active.reference, err);
        SyncStep::Finished(SyncOutcome::Failed(err))
    }

    /// Open the tree along `nodes` and make it the navigation state
    fn apply_path(&mut self, store: &mut TreeStore, reference: &str, nodes: Vec<NodeId>) {
        if self.config.collapse_on_navigate {
            for id in store.open_nodes() {
                if !nodes.contains(&id) && !self.is_pinned(store, id) {
                    store.collapse_node(id);
                }
            }
        }
        for &id in &nodes {
            store.mark_expanded(id);
        }

        self.state.current_reference = Some(reference.to_string());
        self.state.selected = nodes.last().copied();
        self.state.expanded_path = nodes;
    }

    fn is_pinned(&self, store: &TreeStore, id: NodeId) -> bool {
        store
            .get_node(id)
            .and_then(|node| node.target.as_deref())
            .is_some_and(|target| self.config.pinned_open.iter().any(|p| p == target))
    }

    /// A node was selected in the tree
    ///
    /// A node with a target sends the content pane there, whatever the sync
    /// setting and opens the branches above it. Grouping nodes are only
    /// selected; returns whether the content pane was navigated.
    pub fn select_node(
        &mut self,
        store: &mut TreeStore,
        id: NodeId,
        pane: &mut dyn ContentPane,
    ) -> Result<bool, NavError> {
        let node = store.get_node(id).ok_or(NavError::UnknownNode(id.0))?;
        self.state.selected = Some(id);

        let Some(target) = node.target.clone() else {
            return Ok(false);
        };
        tracing::debug!("navigating content to {:?}", target);
        pane.navigate_content_to(&target);
        let path = store.get_ancestors(id);
        for &ancestor in &path[..path.len().saturating_sub(1)] {
            store.mark_expanded(ancestor);
        }
        self.state.expanded_path = path;
        self.state.current_reference = Some(target);
        Ok(true)
    }

    /// User expand/collapse of a node
    pub async fn toggle_node(&mut self, store: &mut TreeStore, id: NodeId) -> Result<(), NavError> {
        store.toggle_node(id).await
    }
}

/// The failure recorded on `id` by its last fetch, if that fetch failed
fn fetch_failure(store: &TreeStore, id: NodeId) -> Option<NavError> {
    let node = store.get_node(id)?;
    match &node.state {
        super::node::NodeState::Error(message) => Some(NavError::ResourceUnavailable {
            resource: node
                .children
                .unresolved_resource()
                .unwrap_or_default()
                .to_string(),
            message: message.clone(),
        }),
        _ => None,
    }
}
