use super::node::NodeId;
use super::store::TreeStore;
use super::sync::SyncController;

/// View state of the navigation pane: the tree, its sync controller, the
/// keyboard cursor and scrolling
#[derive(Debug)]
pub struct NavTreeView {
    store: TreeStore,
    sync: SyncController,
    /// Node under the keyboard cursor
    cursor: Option<NodeId>,
    /// Scroll offset (index into visible nodes)
    scroll_offset: usize,
    /// Last known viewport height (for scrolling calculations)
    pub(crate) viewport_height: usize,
}

impl NavTreeView {
    pub fn new(store: TreeStore, sync: SyncController) -> Self {
        let root_id = store.root_id();
        Self {
            store,
            sync,
            cursor: Some(root_id),
            scroll_offset: 0,
            viewport_height: 10, // updated during rendering
        }
    }

    /// Set the viewport height (should be called during rendering)
    pub fn set_viewport_height(&mut self, height: usize) {
        self.viewport_height = height;
    }

    pub fn store(&self) -> &TreeStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut TreeStore {
        &mut self.store
    }

    pub fn sync(&self) -> &SyncController {
        &self.sync
    }

    /// Both halves at once, for controller calls that take the store
    pub fn parts_mut(&mut self) -> (&mut TreeStore, &mut SyncController) {
        (&mut self.store, &mut self.sync)
    }

    /// Visible nodes with their indent levels
    pub fn get_display_nodes(&self) -> Vec<(NodeId, usize)> {
        self.store
            .get_visible_nodes()
            .into_iter()
            .map(|id| (id, self.store.get_depth(id)))
            .collect()
    }

    pub fn get_cursor(&self) -> Option<NodeId> {
        self.cursor
    }

    pub fn set_cursor(&mut self, node_id: Option<NodeId>) {
        self.cursor = node_id;
    }

    /// Move the cursor to the controller's selected node, if it is visible
    pub fn reveal_selected(&mut self) {
        if let Some(selected) = self.sync.state().selected {
            if self.store.get_visible_nodes().contains(&selected) {
                self.cursor = Some(selected);
                self.update_scroll_for_cursor();
            }
        }
    }

    fn move_cursor(&mut self, step: impl FnOnce(usize, usize) -> usize) {
        let visible = self.store.get_visible_nodes();
        if visible.is_empty() {
            return;
        }

        let pos = self
            .cursor
            .and_then(|current| visible.iter().position(|&id| id == current));
        let new_pos = match pos {
            Some(pos) => step(pos, visible.len()).min(visible.len() - 1),
            // cursor lost (its branch was collapsed): restart at the top
            None => 0,
        };
        self.cursor = Some(visible[new_pos]);
    }

    pub fn cursor_next(&mut self) {
        self.move_cursor(|pos, _| pos + 1);
    }

    pub fn cursor_prev(&mut self) {
        self.move_cursor(|pos, _| pos.saturating_sub(1));
    }

    /// Move the cursor up by a page (viewport height)
    pub fn cursor_page_up(&mut self) {
        let page = self.viewport_height.max(1);
        self.move_cursor(|pos, _| pos.saturating_sub(page));
    }

    /// Move the cursor down by a page (viewport height)
    pub fn cursor_page_down(&mut self) {
        let page = self.viewport_height.max(1);
        self.move_cursor(|pos, _| pos + page);
    }

    pub fn cursor_first(&mut self) {
        self.move_cursor(|_, _| 0);
    }

    pub fn cursor_last(&mut self) {
        self.move_cursor(|_, len| len - 1);
    }

    /// Move the cursor to the parent of the current node
    pub fn cursor_parent(&mut self) {
        if let Some(parent) = self
            .cursor
            .and_then(|id| self.store.get_node(id))
            .and_then(|node| node.parent)
        {
            self.cursor = Some(parent);
        }
    }

    /// Update the scroll offset so the cursor stays inside the viewport
    ///
    /// Only scrolls when the cursor goes past an edge, so moving down puts
    /// the cursor at the bottom before scrolling and moving up at the top.
    pub fn update_scroll_for_cursor(&mut self) {
        if self.viewport_height == 0 {
            return;
        }

        if let Some(pos) = self.get_cursor_index() {
            if pos < self.scroll_offset {
                self.scroll_offset = pos;
            } else if pos >= self.scroll_offset + self.viewport_height {
                self.scroll_offset = pos - self.viewport_height + 1;
            }
        }
    }

    pub fn get_scroll_offset(&self) -> usize {
        self.scroll_offset
    }

    /// Index of the cursor in the visible list
    pub fn get_cursor_index(&self) -> Option<usize> {
        let cursor = self.cursor?;
        self.store
            .get_visible_nodes()
            .iter()
            .position(|&id| id == cursor)
    }

    pub fn visible_count(&self) -> usize {
        self.store.get_visible_nodes().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::model::NodeData;
    use crate::services::source::{MemoryDocSource, SourceManager};
    use std::sync::Arc;

    fn create_test_view() -> NavTreeView {
        let tree = NodeData::group(
            "Docs",
            vec![
                NodeData::group(
                    "Files",
                    vec![
                        NodeData::leaf("os.c", "os_8c.html"),
                        NodeData::leaf("os.h", "os_8h.html"),
                    ],
                ),
                NodeData::leaf("Globals", "globals.html"),
                NodeData::leaf("Todo", "todo.html"),
            ],
        );
        let manager = SourceManager::new(Arc::new(MemoryDocSource::new(vec![tree.clone()])));
        NavTreeView::new(
            TreeStore::new(tree, manager),
            SyncController::new(&SyncConfig::default()),
        )
    }

    fn cursor_label(view: &NavTreeView) -> String {
        let id = view.get_cursor().unwrap();
        view.store().get_node(id).unwrap().label.clone()
    }

    #[test]
    fn test_cursor_navigation() {
        let mut view = create_test_view();
        assert_eq!(cursor_label(&view), "Docs");

        view.cursor_next();
        assert_eq!(cursor_label(&view), "Files");
        view.cursor_last();
        assert_eq!(cursor_label(&view), "Todo");
        view.cursor_next();
        assert_eq!(cursor_label(&view), "Todo");
        view.cursor_prev();
        assert_eq!(cursor_label(&view), "Globals");
        view.cursor_first();
        assert_eq!(cursor_label(&view), "Docs");
    }

    #[tokio::test]
    async fn test_display_nodes_and_parent() {
        let mut view = create_test_view();
        let files = view.store().root().child_ids()[0];
        view.store_mut().expand_node(files).await.unwrap();

        let display = view.get_display_nodes();
        assert_eq!(display.len(), 6);
        assert_eq!(display[2].1, 2);

        view.set_cursor(Some(display[2].0));
        view.cursor_parent();
        assert_eq!(view.get_cursor(), Some(files));
    }

    #[tokio::test]
    async fn test_cursor_recovers_after_collapse() {
        let mut view = create_test_view();
        let files = view.store().root().child_ids()[0];
        view.store_mut().expand_node(files).await.unwrap();
        view.cursor_first();
        view.cursor_next();
        view.cursor_next();
        assert_eq!(cursor_label(&view), "os.c");

        view.store_mut().collapse_node(files);
        view.cursor_next();
        assert_eq!(cursor_label(&view), "Docs");
    }

    #[test]
    fn test_scroll_follows_cursor() {
        let mut view = create_test_view();
        view.set_viewport_height(2);

        view.cursor_last();
        view.update_scroll_for_cursor();
        assert_eq!(view.get_scroll_offset(), 2);

        view.cursor_first();
        view.update_scroll_for_cursor();
        assert_eq!(view.get_scroll_offset(), 0);

        view.cursor_page_down();
        assert_eq!(cursor_label(&view), "Globals");
    }

    #[tokio::test]
    async fn test_reveal_selected() {
        let mut view = create_test_view();
        let index = crate::model::NavIndex::from_tree(&NodeData::group(
            "Docs",
            vec![
                NodeData::group(
                    "Files",
                    vec![
                        NodeData::leaf("os.c", "os_8c.html"),
                        NodeData::leaf("os.h", "os_8h.html"),
                    ],
                ),
                NodeData::leaf("Globals", "globals.html"),
            ],
        ));

        let (store, sync) = view.parts_mut();
        let outcome = sync.on_content_navigated(store, &index, "os_8h.html").await;
        assert!(outcome.is_synced());

        view.reveal_selected();
        assert_eq!(cursor_label(&view), "os.h");
    }
}
