//! Back/forward history of the browser session

/// Linear history with a cursor, like a browser tab's
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<String>,
    index: Option<usize>,
}

impl History {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a fresh navigation. Forward entries are discarded; reloading
    /// the current URL does not add an entry.
    pub fn push(&mut self, url: impl Into<String>) {
        let url = url.into();
        if self.current() == Some(url.as_str()) {
            return;
        }
        if let Some(i) = self.index {
            self.entries.truncate(i + 1);
        }
        self.entries.push(url);
        self.index = Some(self.entries.len() - 1);
    }

    #[must_use]
    pub fn current(&self) -> Option<&str> {
        self.index.map(|i| self.entries[i].as_str())
    }

    #[must_use]
    pub fn back_target(&self) -> Option<&str> {
        match self.index {
            Some(i) if i > 0 => Some(self.entries[i - 1].as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn forward_target(&self) -> Option<&str> {
        self.index
            .and_then(|i| self.entries.get(i + 1))
            .map(String::as_str)
    }

    #[must_use]
    pub fn can_go_back(&self) -> bool {
        self.back_target().is_some()
    }

    #[must_use]
    pub fn can_go_forward(&self) -> bool {
        self.forward_target().is_some()
    }

    pub fn step_back(&mut self) {
        if let Some(i) = self.index
            && i > 0
        {
            self.index = Some(i - 1);
        }
    }

    pub fn step_forward(&mut self) {
        if self.can_go_forward()
            && let Some(i) = self.index
        {
            self.index = Some(i + 1);
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.index = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_truncates_forward_entries() {
        let mut h = History::new();
        h.push("a");
        h.push("b");
        h.push("c");
        h.step_back();
        h.step_back();
        assert_eq!(h.current(), Some("a"));
        assert!(h.can_go_forward());

        h.push("d");
        assert!(!h.can_go_forward());
        assert_eq!(h.back_target(), Some("a"));
    }

    #[test]
    fn test_boundaries() {
        let mut h = History::new();
        assert!(!h.can_go_back());
        h.push("a");
        h.step_back();
        assert_eq!(h.current(), Some("a"));
        h.step_forward();
        assert_eq!(h.current(), Some("a"));
    }

    #[test]
    fn test_reload_does_not_duplicate() {
        let mut h = History::new();
        h.push("a");
        h.push("a");
        assert!(!h.can_go_back());
    }
}
