//! Text box contents while typing and dictating.
//!
//! Whatever was typed before dictation starts is kept as a base; the live
//! transcript is appended after it on every sync until dictation stops.
//! With auto-submit on, the merged text is sent as soon as dictation ends.

/// The candidate's in-progress answer.
#[derive(Debug, Default, Clone)]
pub struct Composer {
    text: String,
    /// Text captured when dictation started.  `None` while not dictating.
    base: Option<String>,
    auto_submit: bool,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand the answer over when dictation stops instead of waiting for Send.
    pub fn with_auto_submit(mut self, auto_submit: bool) -> Self {
        self.auto_submit = auto_submit;
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Mutable access for the text widget.
    pub fn text_mut(&mut self) -> &mut String {
        &mut self.text
    }

    pub fn is_dictating(&self) -> bool {
        self.base.is_some()
    }

    /// Reconcile with the capture state.  Call once per frame.
    ///
    /// Returns the text to send when dictation has just stopped and
    /// auto-submit is on.
    pub fn sync(&mut self, listening: bool, transcript: &str) -> Option<String> {
        if listening {
            let base = self.base.get_or_insert_with(|| self.text.clone());
            self.text = merge(base, transcript);
            return None;
        }
        let base = self.base.take()?;
        // The last segments can arrive in the same frame as the end of the pass.
        self.text = merge(&base, transcript);
        if self.auto_submit {
            self.submit()
        } else {
            None
        }
    }

    /// Take the text for sending.  Returns `None` when it is blank; the box
    /// is cleared either way.
    pub fn submit(&mut self) -> Option<String> {
        let text = std::mem::take(&mut self.text);
        if self.base.is_some() {
            self.base = Some(String::new());
        }
        (!text.trim().is_empty()).then_some(text)
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.base = None;
    }
}

fn merge(base: &str, transcript: &str) -> String {
    let separator = if !base.trim().is_empty() && !transcript.trim().is_empty() {
        " "
    } else {
        ""
    };
    format!("{base}{separator}{transcript}")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dictation_appends_to_typed_text() {
        let mut c = Composer::new();
        c.text_mut().push_str("def solve(");
        c.sync(true, "");
        assert_eq!(c.text(), "def solve(");
        c.sync(true, "n): return n");
        assert_eq!(c.text(), "def solve( n): return n");
    }

    #[test]
    fn base_is_captured_once() {
        let mut c = Composer::new();
        c.text_mut().push_str("I would");
        c.sync(true, "use");
        c.sync(true, "use a hash map");
        assert_eq!(c.text(), "I would use a hash map");
    }

    #[test]
    fn stopping_keeps_text_and_allows_edits() {
        let mut c = Composer::new();
        c.sync(true, "binary search");
        c.sync(false, "binary search");
        assert_eq!(c.text(), "binary search");
        assert!(!c.is_dictating());

        c.text_mut().push_str(" on the answer");
        c.sync(false, "binary search");
        assert_eq!(c.text(), "binary search on the answer");

        // A new dictation builds on the edited text.
        c.sync(true, "");
        c.sync(true, "space");
        assert_eq!(c.text(), "binary search on the answer space");
    }

    #[test]
    fn no_separator_when_either_side_blank() {
        assert_eq!(merge("   ", "hello"), "   hello");
        assert_eq!(merge("hello", ""), "hello");
    }

    #[test]
    fn submit_clears_unconditionally() {
        let mut c = Composer::new();
        c.text_mut().push_str("  my answer  ");
        assert_eq!(c.submit().as_deref(), Some("  my answer  "));
        assert_eq!(c.text(), "");

        c.text_mut().push_str("   ");
        assert_eq!(c.submit(), None);
        assert_eq!(c.text(), "");
    }

    #[test]
    fn segment_landing_with_end_of_pass_is_kept() {
        let mut c = Composer::new();
        c.sync(true, "two");
        assert_eq!(c.sync(false, "two pointers"), None);
        assert_eq!(c.text(), "two pointers");
    }

    #[test]
    fn auto_submit_sends_when_dictation_stops() {
        let mut c = Composer::new().with_auto_submit(true);
        c.text_mut().push_str("def solve(");
        assert_eq!(c.sync(true, "n): return n"), None);
        assert_eq!(
            c.sync(false, "n): return n").as_deref(),
            Some("def solve( n): return n")
        );
        assert_eq!(c.text(), "");
        // Only once per dictation.
        assert_eq!(c.sync(false, "n): return n"), None);
    }

    #[test]
    fn auto_submit_skips_blank_dictation() {
        let mut c = Composer::new().with_auto_submit(true);
        c.sync(true, "");
        assert_eq!(c.sync(false, ""), None);
    }
}
