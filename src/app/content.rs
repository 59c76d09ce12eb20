use crate::view::nav_tree::ContentPane;

/// Stand-in for the page viewer: remembers which reference is shown and
/// keeps a back/forward history
#[derive(Debug, Clone, Default)]
pub struct ContentHistory {
    entries: Vec<String>,
    /// Index of the shown entry
    position: Option<usize>,
}

impl ContentHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// The reference currently shown
    pub fn current(&self) -> Option<&str> {
        self.position
            .and_then(|pos| self.entries.get(pos))
            .map(String::as_str)
    }

    /// Show `reference`, dropping any forward history
    pub fn open(&mut self, reference: &str) {
        if self.current() == Some(reference) {
            return;
        }
        let keep = self.position.map_or(0, |pos| pos + 1);
        self.entries.truncate(keep);
        self.entries.push(reference.to_string());
        self.position = Some(self.entries.len() - 1);
    }

    /// Step back; returns the reference now shown
    pub fn back(&mut self) -> Option<&str> {
        match self.position {
            Some(pos) if pos > 0 => {
                self.position = Some(pos - 1);
                self.current()
            }
            _ => None,
        }
    }

    /// Step forward; returns the reference now shown
    pub fn forward(&mut self) -> Option<&str> {
        match self.position {
            Some(pos) if pos + 1 < self.entries.len() => {
                self.position = Some(pos + 1);
                self.current()
            }
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 1-based position of the shown entry
    pub fn position(&self) -> Option<usize> {
        self.position.map(|pos| pos + 1)
    }
}

impl ContentPane for ContentHistory {
    fn navigate_content_to(&mut self, reference: &str) {
        self.open(reference);
    }
}
