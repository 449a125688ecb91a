//! Linear-buffer fields: single-line inputs and multi-line text areas.

use std::ops::Range;

use ropey::Rope;

use super::buffer::FieldBuffer;
use super::selection::Selection;
use super::{ChangeListener, ChangeNotifier, Surface, SurfaceKind};
use crate::error::ReplaceError;

/// A linear text field: a [`FieldBuffer`] plus caret and attachment state.
#[derive(Debug)]
pub struct TextField<B: FieldBuffer> {
    buffer: B,
    kind: SurfaceKind,
    selection: Selection,
    attached: bool,
    changes: ChangeNotifier,
}

impl TextField<String> {
    /// Single-line input with the caret at the end of `text`
    pub fn single_line(text: &str) -> Self {
        Self::with_buffer(text.to_string(), SurfaceKind::SingleLine)
    }
}

impl TextField<Rope> {
    /// Multi-line text area with the caret at the end of `text`
    pub fn multi_line(text: &str) -> Self {
        Self::with_buffer(Rope::from_str(text), SurfaceKind::MultiLine)
    }
}

impl<B: FieldBuffer> TextField<B> {
    pub fn with_buffer(buffer: B, kind: SurfaceKind) -> Self {
        let end = buffer.len_chars();
        Self {
            buffer,
            kind,
            selection: Selection::collapsed(end),
            attached: true,
            changes: ChangeNotifier::default(),
        }
    }

    /// Place the caret (builder pattern)
    pub fn with_cursor(mut self, offset: usize) -> Self {
        self.selection = Selection::collapsed(offset.min(self.buffer.len_chars()));
        self
    }

    /// Set the selection (builder pattern)
    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    pub fn buffer(&self) -> &B {
        &self.buffer
    }

    /// Remove the field from its document
    pub fn detach(&mut self) {
        self.attached = false;
    }

    pub fn on_change(&mut self, listener: ChangeListener) {
        self.changes.subscribe(listener);
    }
}

impl<B: FieldBuffer> Surface for TextField<B> {
    fn kind(&self) -> SurfaceKind {
        self.kind
    }

    fn is_attached(&self) -> bool {
        self.attached
    }

    fn text(&self) -> String {
        self.buffer.content()
    }

    fn len_chars(&self) -> usize {
        self.buffer.len_chars()
    }

    fn slice(&self, range: Range<usize>) -> String {
        self.buffer.slice(range)
    }

    fn selection(&self) -> Selection {
        self.selection
    }

    fn set_selection(&mut self, selection: Selection) {
        self.selection = selection.clamped(self.buffer.len_chars());
    }

    fn splice(&mut self, range: Range<usize>, text: &str) -> Result<(), ReplaceError> {
        if !self.attached {
            return Err(ReplaceError::DetachedSurface);
        }
        let range = Selection::from(range).clamped(self.buffer.len_chars()).range();
        self.buffer.splice(range, text);
        Ok(())
    }

    fn notify_changed(&mut self) {
        self.changes.notify();
    }

    fn revision(&self) -> u64 {
        self.changes.revision()
    }
}
