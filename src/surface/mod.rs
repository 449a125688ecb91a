//! Text surface adapters.
//!
//! A surface is any editable region the engine can read and write:
//! - Single-line fields (`TextField<String>`)
//! - Multi-line text areas (`TextField<ropey::Rope>`)
//! - Structured rich-text regions ([`RichRegion`] over a [`RichDocument`] tree)
//!
//! # Architecture
//!
//! The detector and replacers only ever see the [`Surface`] trait, which
//! exposes the logical text (character offsets), the selection, and a
//! `splice` primitive. Rich regions additionally expose their node tree so the
//! rich replacer and marker-based undo can work on structure.
//!
//! Surfaces are shared, externally owned resources. The engine holds them as
//! [`SurfaceRef`] and only keeps [`std::rc::Weak`] references between calls,
//! so closing a surface is always allowed.

mod buffer;
mod field;
mod markup;
mod rich;
mod selection;
mod tree;

use std::cell::RefCell;
use std::fmt;
use std::ops::Range;
use std::rc::Rc;

use crate::error::ReplaceError;

pub use buffer::FieldBuffer;
pub use field::TextField;
pub use markup::{escape_text, parse_markup};
pub use rich::RichRegion;
pub use selection::Selection;
pub use tree::{Bias, Element, Location, Marker, MarkerMetadata, Node, RichDocument};

/// Shared handle to a live surface.
pub type SurfaceRef = Rc<RefCell<dyn Surface>>;

/// Wrap a concrete surface in a shared handle.
///
/// Keep the typed `Rc` if you need concrete access later; it coerces to
/// [`SurfaceRef`] with a plain `.clone()`.
pub fn shared<S: Surface + 'static>(surface: S) -> Rc<RefCell<S>> {
    Rc::new(RefCell::new(surface))
}

/// Whether two handles point at the same surface instance
pub fn same_surface(a: &SurfaceRef, b: &SurfaceRef) -> bool {
    std::ptr::eq(Rc::as_ptr(a) as *const (), Rc::as_ptr(b) as *const ())
}

/// Which shape of surface this is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    /// Single-line input: cannot hold line breaks
    SingleLine,
    /// Multi-line plain text area
    MultiLine,
    /// Tree-structured rich text region
    Rich,
}

impl SurfaceKind {
    /// Check if the surface is backed by a linear character buffer
    pub fn is_linear(self) -> bool {
        !matches!(self, SurfaceKind::Rich)
    }

    pub fn is_single_line(self) -> bool {
        matches!(self, SurfaceKind::SingleLine)
    }
}

/// Uniform read/cursor/write interface over every surface kind.
pub trait Surface {
    fn kind(&self) -> SurfaceKind;

    /// Whether the surface is still part of its document
    fn is_attached(&self) -> bool;

    /// Logical text: what the user sees, flattened to characters
    fn text(&self) -> String;

    /// Total length in characters
    fn len_chars(&self) -> usize {
        self.text().chars().count()
    }

    /// Slice of the logical text by character range (clamped)
    fn slice(&self, range: Range<usize>) -> String {
        let len = self.len_chars();
        let start = range.start.min(len);
        let end = range.end.min(len);
        if start >= end {
            return String::new();
        }
        self.text().chars().skip(start).take(end - start).collect()
    }

    fn selection(&self) -> Selection;

    fn set_selection(&mut self, selection: Selection);

    /// Collapse the selection to a caret at `offset`
    fn set_cursor(&mut self, offset: usize) {
        self.set_selection(Selection::collapsed(offset));
    }

    /// Replace `range` of the logical text with plain `text`
    fn splice(&mut self, range: Range<usize>, text: &str) -> Result<(), ReplaceError>;

    /// Node tree, for tree-structured surfaces
    fn rich_document(&self) -> Option<&RichDocument> {
        None
    }

    fn rich_document_mut(&mut self) -> Option<&mut RichDocument> {
        None
    }

    /// Emit a synthetic "content changed" notification
    fn notify_changed(&mut self);

    /// Number of change notifications emitted so far
    fn revision(&self) -> u64;
}

/// Callback invoked with the new revision after every change notification.
pub type ChangeListener = Box<dyn FnMut(u64)>;

/// Revision counter plus subscribed listeners, shared by all surface types.
#[derive(Default)]
pub struct ChangeNotifier {
    revision: u64,
    listeners: Vec<ChangeListener>,
}

impl ChangeNotifier {
    pub fn subscribe(&mut self, listener: ChangeListener) {
        self.listeners.push(listener);
    }

    pub fn notify(&mut self) {
        self.revision += 1;
        let revision = self.revision;
        for listener in &mut self.listeners {
            listener(revision);
        }
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }
}

impl fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("revision", &self.revision)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notifier_counts_and_calls_listeners() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        let mut notifier = ChangeNotifier::default();
        notifier.subscribe(Box::new(move |rev| sink.borrow_mut().push(rev)));

        notifier.notify();
        notifier.notify();

        assert_eq!(notifier.revision(), 2);
        assert_eq!(*seen.borrow(), vec![1, 2]);
    }

    #[test]
    fn test_kind_helpers() {
        assert!(SurfaceKind::SingleLine.is_linear());
        assert!(SurfaceKind::MultiLine.is_linear());
        assert!(!SurfaceKind::Rich.is_linear());
        assert!(SurfaceKind::SingleLine.is_single_line());
    }

    #[test]
    fn test_same_surface_is_identity() {
        let a: SurfaceRef = shared(TextField::single_line("x"));
        let b: SurfaceRef = shared(TextField::single_line("x"));
        assert!(same_surface(&a, &a.clone()));
        assert!(!same_surface(&a, &b));
    }

    #[test]
    fn test_shared_coerces_to_surface_ref() {
        let field = shared(TextField::single_line("abc"));
        let dynamic: SurfaceRef = field.clone();
        assert_eq!(dynamic.borrow().text(), "abc");
        assert_eq!(Rc::strong_count(&field), 2);
    }
}
