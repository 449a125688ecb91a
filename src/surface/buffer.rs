//! Storage behind linear fields.
//!
//! Single-line inputs keep their value in a `String`; multi-line text areas
//! use a `ropey::Rope` so edits deep inside long drafts stay cheap. Both are
//! addressed in characters and only need the few operations a [`TextField`]
//! performs.
//!
//! [`TextField`]: super::TextField

use ropey::Rope;
use std::ops::Range;

/// Character-addressed text storage for a field.
pub trait FieldBuffer {
    fn len_chars(&self) -> usize;

    /// Text in `range`, clamped to the buffer
    fn slice(&self, range: Range<usize>) -> String;

    fn content(&self) -> String;

    /// Replace `range` (already clamped and ordered) with `text`
    fn splice(&mut self, range: Range<usize>, text: &str);
}

/// Clamp both ends of `range` to `len`
fn clamp(range: Range<usize>, len: usize) -> Range<usize> {
    range.start.min(len)..range.end.min(len)
}

fn byte_offset(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(i, _)| i)
}

impl FieldBuffer for String {
    fn len_chars(&self) -> usize {
        self.chars().count()
    }

    fn slice(&self, range: Range<usize>) -> String {
        let range = clamp(range, FieldBuffer::len_chars(self));
        if range.is_empty() {
            return String::new();
        }
        self.chars().skip(range.start).take(range.len()).collect()
    }

    fn content(&self) -> String {
        self.clone()
    }

    fn splice(&mut self, range: Range<usize>, text: &str) {
        let start = byte_offset(self, range.start);
        let end = byte_offset(self, range.end.max(range.start));
        self.replace_range(start..end, text);
    }
}

impl FieldBuffer for Rope {
    fn len_chars(&self) -> usize {
        Rope::len_chars(self)
    }

    fn slice(&self, range: Range<usize>) -> String {
        let range = clamp(range, Rope::len_chars(self));
        if range.is_empty() {
            return String::new();
        }
        Rope::slice(self, range).to_string()
    }

    fn content(&self) -> String {
        self.to_string()
    }

    fn splice(&mut self, range: Range<usize>, text: &str) {
        let range = clamp(range, Rope::len_chars(self));
        if !range.is_empty() {
            self.remove(range.clone());
        }
        if !text.is_empty() {
            self.insert(range.start, text);
        }
    }
}
