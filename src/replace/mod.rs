//! Replacement engine: turns a matched command range into macro content.
//!
//! Every replacement goes through [`ReplacementEngine::replace`]:
//!
//! 1. Clamp the range and move its start past any leading whitespace, so the
//!    trigger prefix itself is what gets overwritten.
//! 2. Pick the rich path when the surface is tree-structured and the macro
//!    has structured content; otherwise splice plain text (flattened for
//!    single-line surfaces).
//! 3. Record the replacement in [`UndoHistory`] using the unadjusted range
//!    and the exact inserted text.
//! 4. Place the caret after the insertion, or keep the user's selection when
//!    the command was replaced away from the caret, and emit a change
//!    notification.
//!
//! Nothing is recorded when the mutation fails, and a failed mutation never
//! leaves partial edits behind.

pub mod plain;
pub mod rich;

use std::ops::Range;
use std::time::Instant;

use crate::catalog::Macro;
use crate::error::ReplaceError;
use crate::history::UndoHistory;
use crate::surface::{Selection, SurfaceRef};

pub use plain::normalize_single_line;

/// Outcome of a successful replacement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Replaced {
    /// Offset just past the inserted content
    pub cursor: usize,
    /// Whether the content went in as a rich marker
    pub rich: bool,
}

/// Where the selection goes once a replacement lands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CaretPlacement {
    AfterInsertion,
    Keep,
}

/// Range of `command` ending at `end`, verified against the surface text
fn command_range(
    surface: &SurfaceRef,
    command: &str,
    end: usize,
) -> Result<Range<usize>, ReplaceError> {
    let s = surface.borrow();
    if !s.is_attached() {
        return Err(ReplaceError::DetachedSurface);
    }
    let start = end
        .checked_sub(command.chars().count())
        .ok_or(ReplaceError::InvalidRange)?;
    if end > s.len_chars() || s.slice(start..end) != command {
        return Err(ReplaceError::InvalidRange);
    }
    Ok(start..end)
}

/// Map an offset from before the edit of `replaced` to after it, where the
/// new content ends at `inserted_end`. Offsets inside the replaced text land
/// after the insertion.
fn remap_offset(offset: usize, replaced: &Range<usize>, inserted_end: usize) -> usize {
    if offset <= replaced.start {
        offset
    } else if offset >= replaced.end {
        offset - replaced.end + inserted_end
    } else {
        inserted_end
    }
}

/// Performs replacements and owns the undo history they feed.
#[derive(Debug, Default)]
pub struct ReplacementEngine {
    history: UndoHistory,
}

impl ReplacementEngine {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            history: UndoHistory::with_capacity(history_capacity),
        }
    }

    pub fn history(&self) -> &UndoHistory {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut UndoHistory {
        &mut self.history
    }

    /// Replace the `command` that ends at the caret.
    ///
    /// Fails with `InvalidRange` when the text before the caret is no longer
    /// `command`, which happens when edits race the commit.
    pub fn replace_command(
        &mut self,
        surface: &SurfaceRef,
        command: &str,
        m: &Macro,
        now: Instant,
    ) -> Result<Replaced, ReplaceError> {
        let caret = {
            let s = surface.borrow();
            s.selection().clamped(s.len_chars()).cursor()
        };
        let range = command_range(surface, command, caret)?;
        self.apply(surface, range, m, now, CaretPlacement::AfterInsertion)
    }

    /// Replace the `command` that ends at offset `end`, away from the caret.
    ///
    /// The selection stays where the user left it, shifted by the change in
    /// length when it sits after the command.
    pub fn replace_command_at(
        &mut self,
        surface: &SurfaceRef,
        command: &str,
        end: usize,
        m: &Macro,
        now: Instant,
    ) -> Result<Replaced, ReplaceError> {
        let range = command_range(surface, command, end)?;
        self.apply(surface, range, m, now, CaretPlacement::Keep)
    }

    /// Insert at the caret without replacing anything
    pub fn insert_at_cursor(
        &mut self,
        surface: &SurfaceRef,
        m: &Macro,
        now: Instant,
    ) -> Result<Replaced, ReplaceError> {
        let cursor = {
            let s = surface.borrow();
            s.selection().clamped(s.len_chars()).cursor()
        };
        self.replace(surface, cursor..cursor, m, now)
    }

    /// Replace `range` of `surface` with the expansion of `m`
    pub fn replace(
        &mut self,
        surface: &SurfaceRef,
        range: Range<usize>,
        m: &Macro,
        now: Instant,
    ) -> Result<Replaced, ReplaceError> {
        self.apply(surface, range, m, now, CaretPlacement::AfterInsertion)
    }

    fn apply(
        &mut self,
        surface: &SurfaceRef,
        range: Range<usize>,
        m: &Macro,
        now: Instant,
        caret: CaretPlacement,
    ) -> Result<Replaced, ReplaceError> {
        let mut s = surface.borrow_mut();
        if !s.is_attached() {
            tracing::debug!("Skipping replacement for '{}': surface detached", m.id);
            return Err(ReplaceError::DetachedSurface);
        }

        let range = Selection::from(range).clamped(s.len_chars()).range();
        let original_text = s.slice(range.clone());
        let leading: String = original_text
            .chars()
            .take_while(|c| c.is_whitespace())
            .collect();
        let adjusted = range.start + leading.chars().count()..range.end;
        let selection_before = s.selection().clamped(s.len_chars());

        let use_rich = !s.kind().is_linear() && m.has_structured_content();
        let (cursor, inserted, marker) = match (use_rich, m.html.as_deref()) {
            (true, Some(html)) => {
                let command = s.slice(adjusted.clone());
                let stamp = self.history.next_stamp();
                let node = rich::marker_node(m, html, &command, stamp);
                let doc = s
                    .rich_document_mut()
                    .ok_or(ReplaceError::StructuralLookup)?;
                let inserted = rich::replace_rich(doc, adjusted.clone(), node).map_err(|e| {
                    tracing::debug!("Rich replacement for '{}' failed: {}", m.id, e);
                    e
                })?;
                (inserted.end, inserted.text, Some(stamp))
            }
            _ => {
                let text = plain::prepare_text(&*s, &m.text);
                let end = plain::replace_plain(&mut *s, adjusted.clone(), &text).map_err(|e| {
                    tracing::debug!("Plain replacement for '{}' failed: {}", m.id, e);
                    e
                })?;
                (end, text, None)
            }
        };

        match caret {
            CaretPlacement::AfterInsertion => s.set_cursor(cursor),
            CaretPlacement::Keep => {
                let shift = |p: usize| remap_offset(p, &adjusted, cursor);
                s.set_selection(Selection::new(
                    shift(selection_before.start),
                    shift(selection_before.end),
                ));
            }
        }
        drop(s);

        let rich = marker.is_some();
        self.history.record(
            surface,
            range,
            original_text,
            format!("{}{}", leading, inserted),
            marker,
            now,
        );
        surface.borrow_mut().notify_changed();

        tracing::info!("Replaced with macro '{}'", m.id);
        Ok(Replaced { cursor, rich })
    }
}
