use crate::view::nav_tree::{NavTreeView, NodeId, TreeNode};
use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};

/// Renders the navigation pane: the visible part of the tree plus the sync
/// toggle label along the bottom border
pub struct NavPaneRenderer;

impl NavPaneRenderer {
    /// Render the navigation pane in the given frame area
    pub fn render(
        view: &mut NavTreeView,
        frame: &mut Frame,
        area: Rect,
        is_focused: bool,
        show_targets: bool,
    ) {
        // borders take two rows
        view.set_viewport_height(area.height.saturating_sub(2) as usize);
        view.update_scroll_for_cursor();

        let display_nodes = view.get_display_nodes();
        let scroll_offset = view.get_scroll_offset();
        let cursor_index = view.get_cursor_index();
        let selected = view.sync().state().selected;

        let items: Vec<ListItem> = display_nodes
            .iter()
            .skip(scroll_offset)
            .filter_map(|&(node_id, indent)| {
                let node = view.store().get_node(node_id)?;
                Some(Self::render_node(
                    node,
                    indent,
                    selected == Some(node_id),
                    show_targets,
                ))
            })
            .collect();

        let sync_label = format!(" {} ", view.sync().sync_label());
        let sync_style = if view.sync().sync_enabled() {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::DarkGray)
        };

        let list = List::new(items)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(" Navigation ")
                    .title_bottom(Line::from(Span::styled(sync_label, sync_style)))
                    .border_style(if is_focused {
                        Style::default().fg(Color::Cyan)
                    } else {
                        Style::default()
                    }),
            )
            .highlight_style(if is_focused {
                Style::default().bg(Color::DarkGray).fg(Color::White)
            } else {
                Style::default().bg(Color::DarkGray)
            });

        let mut list_state = ListState::default();
        if let Some(cursor) = cursor_index {
            list_state.select(cursor.checked_sub(scroll_offset));
        }

        frame.render_stateful_widget(list, area, &mut list_state);
    }

    /// Render a single tree node as a ListItem
    fn render_node(
        node: &TreeNode,
        indent: usize,
        is_selected: bool,
        show_targets: bool,
    ) -> ListItem<'static> {
        let mut spans = Vec::new();

        if indent > 0 {
            spans.push(Span::raw("  ".repeat(indent)));
        }

        spans.push(Span::styled(
            Self::indicator(node),
            Style::default().fg(Color::Yellow),
        ));

        let label_style = if is_selected {
            Style::default()
                .fg(Color::Green)
                .add_modifier(Modifier::BOLD)
        } else if node.is_grouping() {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::White)
        };
        spans.push(Span::styled(node.label.clone(), label_style));

        if show_targets {
            if let Some(target) = &node.target {
                spans.push(Span::styled(
                    format!(" ({target})"),
                    Style::default().fg(Color::DarkGray),
                ));
            }
        }

        if node.is_error() {
            spans.push(Span::styled(" [Error]", Style::default().fg(Color::Red)));
        }

        ListItem::new(Line::from(spans))
    }

    /// Expansion indicator for a node
    fn indicator(node: &TreeNode) -> &'static str {
        if node.is_leaf() {
            "  "
        } else if node.is_loading() {
            "⟳ "
        } else if node.is_error() {
            "! "
        } else if node.is_expanded() {
            "▼ "
        } else {
            "▶ "
        }
    }

    /// Map a row inside `area` (as from a mouse click) to the node shown there
    pub fn node_at_row(view: &NavTreeView, area: Rect, row: u16) -> Option<NodeId> {
        if row <= area.y || row >= area.y + area.height.saturating_sub(1) {
            return None;
        }
        let index = view.get_scroll_offset() + (row - area.y - 1) as usize;
        view.get_display_nodes().get(index).map(|&(id, _)| id)
    }
}
