//! Pending-command buffer of the detection state machine.

/// Snapshot of detection progress.
///
/// `buffer` holds the trigger prefix plus everything typed after it. An
/// inactive state always has an empty buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DetectionState {
    active: bool,
    buffer: String,
}

impl DetectionState {
    pub fn inactive() -> Self {
        Self::default()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    /// Buffer length in characters
    pub fn len_chars(&self) -> usize {
        self.buffer.chars().count()
    }

    /// Start (or restart) detection at a prefix character
    pub(crate) fn start(&mut self, prefix: char) {
        self.active = true;
        self.buffer.clear();
        self.buffer.push(prefix);
    }

    /// Start detection from an already-typed command
    pub(crate) fn resume(&mut self, buffer: String) {
        self.active = !buffer.is_empty();
        self.buffer = buffer;
    }

    pub(crate) fn push(&mut self, c: char) {
        debug_assert!(self.active);
        self.buffer.push(c);
    }

    pub(crate) fn pop(&mut self) -> Option<char> {
        self.buffer.pop()
    }

    /// Reset to inactive. Returns whether anything was active.
    pub(crate) fn reset(&mut self) -> bool {
        let was_active = self.active;
        self.active = false;
        self.buffer.clear();
        was_active
    }
}
