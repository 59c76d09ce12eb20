use super::content::ContentHistory;
use crate::config::Config;
use crate::model::{NavError, NodePath, ReferenceIndex};
use crate::view::nav_tree::{
    resolve_reference, ExpandStep, FetchedSubtree, NavTreeView, NodeId, PendingExpand,
    SyncOutcome, SyncStep,
};
use crate::view::ui::NavPaneRenderer;
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    DefaultTerminal, Frame,
};
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Results of work spawned off the UI loop
#[derive(Debug)]
pub enum AsyncMessage {
    /// A lazy sub-tree fetch finished
    SubtreeLoaded(FetchedSubtree),
    /// An index lookup for a displayed reference finished
    ReferenceResolved {
        reference: String,
        result: Result<NodePath, NavError>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Tree,
    /// Typing a reference to open
    Prompt,
}

/// Interactive documentation browser: the navigation pane beside a content
/// pane that shows which page is open
pub struct App {
    view: NavTreeView,
    index: Arc<dyn ReferenceIndex>,
    content: ContentHistory,
    config: Config,
    sender: mpsc::UnboundedSender<AsyncMessage>,
    receiver: mpsc::UnboundedReceiver<AsyncMessage>,
    focus: Focus,
    prompt: String,
    status: String,
    /// Area of the tree pane at the last render (for mouse hit testing)
    tree_area: Rect,
    should_quit: bool,
}

impl App {
    pub fn new(view: NavTreeView, index: Arc<dyn ReferenceIndex>, config: Config) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            view,
            index,
            content: ContentHistory::new(),
            config,
            sender,
            receiver,
            focus: Focus::Tree,
            prompt: String::new(),
            status: String::new(),
            tree_area: Rect::default(),
            should_quit: false,
        }
    }

    pub fn view(&self) -> &NavTreeView {
        &self.view
    }

    pub fn content(&self) -> &ContentHistory {
        &self.content
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status = message.into();
    }

    /// Run the UI loop until the user quits
    pub async fn run(&mut self, terminal: &mut DefaultTerminal) -> io::Result<()> {
        while !self.should_quit {
            self.process_async_messages();
            terminal.draw(|frame| self.render(frame))?;

            if event::poll(Duration::ZERO)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
                    Event::Mouse(mouse) => self.handle_mouse(mouse),
                    _ => {}
                }
            } else {
                // yield so spawned fetches make progress
                tokio::time::sleep(Duration::from_millis(16)).await;
            }
        }

        self.view.store_mut().dispose();
        Ok(())
    }

    /// Show `reference` in the content pane and let the tree follow
    pub fn open_reference(&mut self, reference: &str) {
        self.content.open(reference);
        self.content_navigated(reference.to_string());
    }

    fn content_navigated(&mut self, reference: String) {
        let (_, sync) = self.view.parts_mut();
        if !sync.record_navigation(&reference) {
            return;
        }

        let index = Arc::clone(&self.index);
        let anchor_fallback = self.config.sync.anchor_fallback;
        let sender = self.sender.clone();
        tokio::spawn(async move {
            let result = resolve_reference(index.as_ref(), &reference, anchor_fallback).await;
            let _ = sender.send(AsyncMessage::ReferenceResolved { reference, result });
        });
    }

    fn spawn_fetch(&self, pending: PendingExpand) {
        tracing::trace!("spawning fetch of {:?}", pending.resource());
        let sender = self.sender.clone();
        tokio::spawn(async move {
            let fetched = pending.fetch().await;
            let _ = sender.send(AsyncMessage::SubtreeLoaded(fetched));
        });
    }

    /// Handle every message that has arrived since the last call
    pub fn process_async_messages(&mut self) {
        while let Ok(message) = self.receiver.try_recv() {
            self.handle_async_message(message);
        }
    }

    /// Wait for the next message and handle it
    pub async fn wait_for_message(&mut self) -> bool {
        match self.receiver.recv().await {
            Some(message) => {
                self.handle_async_message(message);
                true
            }
            None => false,
        }
    }

    fn handle_async_message(&mut self, message: AsyncMessage) {
        match message {
            AsyncMessage::SubtreeLoaded(fetched) => {
                let node = fetched.node();
                let (store, sync) = self.view.parts_mut();
                let step = sync.on_subtree_loaded(store, fetched);
                if let Some(failed) = self.view.store().get_node(node).filter(|n| n.is_error()) {
                    let message = format!("could not load {}", failed.label);
                    self.set_status_message(message);
                }
                if let Some(step) = step {
                    self.handle_sync_step(step);
                }
            }
            AsyncMessage::ReferenceResolved { reference, result } => {
                // a later navigation supersedes this one
                if self.content.current() != Some(reference.as_str()) {
                    return;
                }
                let (store, sync) = self.view.parts_mut();
                let step = sync.begin_sync(store, &reference, result);
                self.handle_sync_step(step);
            }
        }
    }

    fn handle_sync_step(&mut self, step: SyncStep) {
        match step {
            SyncStep::Fetch(pending) => self.spawn_fetch(pending),
            SyncStep::Waiting(_) => {}
            SyncStep::Finished(outcome) => {
                // only a retryable failure is worth telling the user about;
                // the controller has logged the rest
                let message = match &outcome {
                    SyncOutcome::SyncDisabled => return,
                    SyncOutcome::Failed(err) if err.is_retryable() => {
                        format!("tree not synced: {err}")
                    }
                    SyncOutcome::Synced | SyncOutcome::NotFound | SyncOutcome::Failed(_) => {
                        String::new()
                    }
                };
                if outcome.is_synced() {
                    self.view.reveal_selected();
                }
                self.set_status_message(message);
            }
        }
    }

    /// Expand or collapse a node, fetching lazy children off the UI loop
    fn toggle(&mut self, id: NodeId) {
        let Some(node) = self.view.store().get_node(id) else {
            return;
        };
        if node.is_leaf() {
            return;
        }
        if node.is_expanded() || node.is_loading() {
            self.view.store_mut().collapse_node(id);
            return;
        }

        match self.view.store_mut().request_open(id) {
            Ok(ExpandStep::Pending(pending)) => self.spawn_fetch(pending),
            Ok(ExpandStep::Ready(_) | ExpandStep::Attached) => {}
            Err(err) => self.set_status_message(err.to_string()),
        }
    }

    /// Enter on a node: open its page, or toggle it if it only groups others
    fn activate(&mut self, id: NodeId) {
        let (store, sync) = self.view.parts_mut();
        match sync.select_node(store, id, &mut self.content) {
            Ok(true) => {
                if let Some(reference) = self.content.current().map(str::to_string) {
                    self.content_navigated(reference);
                }
            }
            Ok(false) => self.toggle(id),
            Err(err) => self.set_status_message(err.to_string()),
        }
    }

    fn toggle_sync(&mut self) {
        let (_, sync) = self.view.parts_mut();
        let enabled = sync.toggle_sync();
        let label = sync.sync_label().to_string();
        self.set_status_message(label);
        if enabled {
            if let Some(reference) = self.view.sync().state().current_reference.clone() {
                self.content_navigated(reference);
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if self.focus == Focus::Prompt {
            self.handle_prompt_key(key);
            return;
        }

        let cursor = self.view.get_cursor();
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true
            }
            KeyCode::Up | KeyCode::Char('k') => self.view.cursor_prev(),
            KeyCode::Down | KeyCode::Char('j') => self.view.cursor_next(),
            KeyCode::PageUp => self.view.cursor_page_up(),
            KeyCode::PageDown => self.view.cursor_page_down(),
            KeyCode::Home => self.view.cursor_first(),
            KeyCode::End => self.view.cursor_last(),
            KeyCode::Right | KeyCode::Char('l') => {
                if let Some(id) = cursor.filter(|&id| {
                    self.view
                        .store()
                        .get_node(id)
                        .is_some_and(|n| !n.is_expanded())
                }) {
                    self.toggle(id);
                }
            }
            KeyCode::Left | KeyCode::Char('h') => match cursor {
                Some(id) if self.view.store().get_node(id).is_some_and(|n| n.is_expanded()) => {
                    self.view.store_mut().collapse_node(id)
                }
                _ => self.view.cursor_parent(),
            },
            KeyCode::Char(' ') => {
                if let Some(id) = cursor {
                    self.toggle(id);
                }
            }
            KeyCode::Enter => {
                if let Some(id) = cursor {
                    self.activate(id);
                }
            }
            KeyCode::Char('s') => self.toggle_sync(),
            KeyCode::Char('g') => {
                self.focus = Focus::Prompt;
                self.prompt.clear();
            }
            KeyCode::Char('b') => {
                if let Some(reference) = self.content.back().map(str::to_string) {
                    self.content_navigated(reference);
                }
            }
            KeyCode::Char('f') => {
                if let Some(reference) = self.content.forward().map(str::to_string) {
                    self.content_navigated(reference);
                }
            }
            _ => {}
        }
        self.view.update_scroll_for_cursor();
    }

    fn handle_prompt_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => self.focus = Focus::Tree,
            KeyCode::Enter => {
                self.focus = Focus::Tree;
                let reference = std::mem::take(&mut self.prompt);
                let reference = reference.trim();
                if !reference.is_empty() {
                    self.open_reference(reference);
                }
            }
            KeyCode::Backspace => {
                self.prompt.pop();
            }
            KeyCode::Char(c) => self.prompt.push(c),
            _ => {}
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if let Some(id) = NavPaneRenderer::node_at_row(&self.view, self.tree_area, mouse.row)
                {
                    self.view.set_cursor(Some(id));
                    self.activate(id);
                }
            }
            MouseEventKind::ScrollDown => self.view.cursor_next(),
            MouseEventKind::ScrollUp => self.view.cursor_prev(),
            _ => {}
        }
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(1)])
            .split(frame.area());

        let tree_percent = (self.config.pane.width_percent * 100.0).round() as u16;
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage(tree_percent),
                Constraint::Percentage(100 - tree_percent.min(100)),
            ])
            .split(rows[0]);

        self.tree_area = columns[0];
        NavPaneRenderer::render(
            &mut self.view,
            frame,
            columns[0],
            self.focus == Focus::Tree,
            self.config.pane.show_targets,
        );
        self.render_content(frame, columns[1]);
        self.render_status(frame, rows[1]);
    }

    fn render_content(&self, frame: &mut Frame, area: Rect) {
        let mut lines = Vec::new();
        match self.content.current() {
            Some(reference) => {
                lines.push(Line::from(vec![
                    Span::styled("Showing ", Style::default().fg(Color::DarkGray)),
                    Span::styled(reference.to_string(), Style::default().fg(Color::White)),
                ]));
                if let Some(position) = self.content.position() {
                    lines.push(Line::from(Span::styled(
                        format!("history {}/{}", position, self.content.len()),
                        Style::default().fg(Color::DarkGray),
                    )));
                }
            }
            None => lines.push(Line::from("No page open")),
        }
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            "enter: open  space: expand  g: go to page  b/f: back/forward  s: sync  q: quit",
            Style::default().fg(Color::DarkGray),
        )));

        let paragraph = Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title(" Content "));
        frame.render_widget(paragraph, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let line = if self.focus == Focus::Prompt {
            Line::from(vec![
                Span::styled("Go to: ", Style::default().fg(Color::Cyan)),
                Span::raw(self.prompt.clone()),
            ])
        } else {
            Line::from(Span::raw(self.status.clone()))
        };
        frame.render_widget(Paragraph::new(line), area);
    }
}
