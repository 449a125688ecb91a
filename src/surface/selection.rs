//! Selection ranges over a surface's logical text.

use std::ops::Range;

/// A selection as character offsets into a surface's logical text.
///
/// `start <= end` is the normal shape, but fast edits can hand us a reversed
/// or out-of-bounds pair. Use [`Selection::clamped`] before indexing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Selection {
    pub start: usize,
    pub end: usize,
}

impl Selection {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Create a collapsed selection (a caret with nothing selected)
    pub const fn collapsed(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    /// Check if the selection is a plain caret
    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }

    /// Caret offset; the end of the selection when it is not collapsed
    pub fn cursor(&self) -> usize {
        self.end
    }

    /// Swap the ends if they are reversed
    pub fn normalized(&self) -> Self {
        if self.start <= self.end {
            *self
        } else {
            Self::new(self.end, self.start)
        }
    }

    /// Normalize and clamp both ends to `0..=len`
    pub fn clamped(&self, len: usize) -> Self {
        let n = self.normalized();
        Self::new(n.start.min(len), n.end.min(len))
    }

    /// Number of characters covered
    pub fn len(&self) -> usize {
        let n = self.normalized();
        n.end - n.start
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn range(&self) -> Range<usize> {
        let n = self.normalized();
        n.start..n.end
    }
}

impl From<Range<usize>> for Selection {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end)
    }
}
