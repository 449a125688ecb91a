//! Tree-structured rich-text regions.

use std::ops::Range;

use super::selection::Selection;
use super::tree::{Node, RichDocument};
use super::{ChangeListener, ChangeNotifier, Surface, SurfaceKind};
use crate::error::ReplaceError;

/// A rich-text region: a [`RichDocument`] plus a caret/selection.
#[derive(Debug)]
pub struct RichRegion {
    document: RichDocument,
    selection: Selection,
    attached: bool,
    changes: ChangeNotifier,
}

impl RichRegion {
    pub fn new(document: RichDocument) -> Self {
        let end = document.len_chars();
        Self {
            document,
            selection: Selection::collapsed(end),
            attached: true,
            changes: ChangeNotifier::default(),
        }
    }

    /// Region parsed from inline markup, caret at the end
    pub fn from_markup(markup: &str) -> Self {
        Self::new(RichDocument::from_markup(markup))
    }

    /// Place the caret (builder pattern)
    pub fn with_cursor(mut self, offset: usize) -> Self {
        self.selection = Selection::collapsed(offset.min(self.document.len_chars()));
        self
    }

    pub fn document(&self) -> &RichDocument {
        &self.document
    }

    pub fn to_markup(&self) -> String {
        self.document.to_markup()
    }

    /// Remove the region from its document
    pub fn detach(&mut self) {
        self.attached = false;
    }

    pub fn on_change(&mut self, listener: ChangeListener) {
        self.changes.subscribe(listener);
    }
}

impl Surface for RichRegion {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::Rich
    }

    fn is_attached(&self) -> bool {
        self.attached
    }

    fn text(&self) -> String {
        self.document.text()
    }

    fn len_chars(&self) -> usize {
        self.document.len_chars()
    }

    fn selection(&self) -> Selection {
        self.selection
    }

    fn set_selection(&mut self, selection: Selection) {
        self.selection = selection.clamped(self.document.len_chars());
    }

    fn splice(&mut self, range: Range<usize>, text: &str) -> Result<(), ReplaceError> {
        if !self.attached {
            return Err(ReplaceError::DetachedSurface);
        }
        let range = Selection::from(range)
            .clamped(self.document.len_chars())
            .range();
        self.document
            .replace_range(range, Node::plain(text))
            .map(|_| ())
    }

    fn rich_document(&self) -> Option<&RichDocument> {
        Some(&self.document)
    }

    fn rich_document_mut(&mut self) -> Option<&mut RichDocument> {
        Some(&mut self.document)
    }

    fn notify_changed(&mut self) {
        self.changes.notify();
    }

    fn revision(&self) -> u64 {
        self.changes.revision()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splice_keeps_formatting() {
        let mut region = RichRegion::from_markup("<b>hello /x</b>");
        region.splice(6..8, "world").unwrap();
        assert_eq!(region.to_markup(), "<b>hello world</b>");
    }

    #[test]
    fn test_splice_delete_only() {
        let mut region = RichRegion::from_markup("ab<i>cd</i>");
        region.splice(1..3, "").unwrap();
        assert_eq!(region.text(), "ad");
        assert_eq!(region.to_markup(), "a<i>d</i>");
    }

    #[test]
    fn test_detached_region_rejects_splice() {
        let mut region = RichRegion::from_markup("abc");
        region.detach();
        assert_eq!(region.splice(0..1, "x"), Err(ReplaceError::DetachedSurface));
    }

    #[test]
    fn test_splice_newlines_become_breaks() {
        let mut region = RichRegion::from_markup("<p>To: /addr</p>");
        region.splice(4..9, "1 Main St\nSpringfield").unwrap();
        assert_eq!(region.to_markup(), "<p>To: 1 Main St<br>Springfield</p>");
        assert_eq!(region.text(), "To: 1 Main St\nSpringfield");
    }
}
