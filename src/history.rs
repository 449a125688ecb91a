//! Bounded, per-surface undo history for committed replacements.
//!
//! Entries are keyed by a [`SurfaceId`] assigned lazily the first time a
//! surface is recorded. The registry behind those ids only holds weak
//! references, so history never keeps a closed surface alive; entries for a
//! dropped surface are pruned on the next access.
//!
//! Undo is hybrid. Rich replacements carry a marker stamp and are undone by
//! unwrapping their marker, which is exact no matter what else changed in
//! the tree. Plain replacements are undone by position, with an outward
//! search when surrounding text has shifted.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::ops::Range;
use std::rc::{Rc, Weak};
use std::time::Instant;

use crate::error::ReplaceError;
use crate::surface::{Surface, SurfaceRef};

/// Default number of entries kept across all surfaces
pub const DEFAULT_CAPACITY: usize = 50;

/// Stable identifier for one surface instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SurfaceId(u64);

impl SurfaceId {
    pub fn get(self) -> u64 {
        self.0
    }
}

struct RegistryEntry {
    id: SurfaceId,
    addr: usize,
    surface: Weak<RefCell<dyn Surface>>,
}

impl RegistryEntry {
    fn is_alive(&self) -> bool {
        self.surface.strong_count() > 0
    }
}

/// Identity-keyed side table from live surfaces to their ids.
///
/// Only weak references are kept. A dead entry's address can be reused by a
/// new allocation, so lookups skip entries whose surface is gone.
#[derive(Default)]
pub struct SurfaceRegistry {
    entries: Vec<RegistryEntry>,
    next_id: u64,
}

fn address_of(surface: &SurfaceRef) -> usize {
    Rc::as_ptr(surface) as *const () as usize
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `surface`, assigning one on first use
    pub fn id_for(&mut self, surface: &SurfaceRef) -> SurfaceId {
        if let Some(id) = self.lookup(surface) {
            return id;
        }
        let id = SurfaceId(self.next_id);
        self.next_id += 1;
        self.entries.push(RegistryEntry {
            id,
            addr: address_of(surface),
            surface: Rc::downgrade(surface),
        });
        id
    }

    /// Id for `surface` if it has one already
    pub fn lookup(&self, surface: &SurfaceRef) -> Option<SurfaceId> {
        let addr = address_of(surface);
        self.entries
            .iter()
            .find(|e| e.addr == addr && e.is_alive())
            .map(|e| e.id)
    }

    pub fn is_alive(&self, id: SurfaceId) -> bool {
        self.entries.iter().any(|e| e.id == id && e.is_alive())
    }

    /// Drop entries for released surfaces, returning their ids
    pub fn prune(&mut self) -> Vec<SurfaceId> {
        let mut dead = Vec::new();
        self.entries.retain(|e| {
            if e.is_alive() {
                true
            } else {
                dead.push(e.id);
                false
            }
        });
        dead
    }

    /// Number of tracked surfaces, dead or alive
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for SurfaceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceRegistry")
            .field("surfaces", &self.entries.len())
            .field("next_id", &self.next_id)
            .finish()
    }
}

/// One committed replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplacementHistoryEntry {
    pub surface: SurfaceId,
    /// Range that was replaced, before leading whitespace was trimmed off
    pub range: Range<usize>,
    /// Text that `range` held before the replacement
    pub original_text: String,
    /// Text that now starts at `range.start`, exactly as inserted
    pub replacement_text: String,
    pub recorded_at: Instant,
    /// Stamp of the marker wrapping a rich replacement
    pub marker: Option<u64>,
}

impl ReplacementHistoryEntry {
    /// Where the replacement text should be found if nothing moved
    pub fn expected_range(&self) -> Range<usize> {
        self.range.start..self.range.start + self.replacement_text.chars().count()
    }
}

/// How an undo was carried out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UndoKind {
    Marker,
    Position,
}

/// A successful undo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Undone {
    pub kind: UndoKind,
    /// Caret offset after the restored text
    pub cursor: usize,
}

/// Append-only log of replacements, oldest evicted first.
#[derive(Debug)]
pub struct UndoHistory {
    entries: VecDeque<ReplacementHistoryEntry>,
    capacity: usize,
    registry: SurfaceRegistry,
    next_stamp: u64,
}

impl Default for UndoHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl UndoHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
            registry: SurfaceRegistry::new(),
            next_stamp: 1,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the capacity, evicting the oldest entries if needed
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.evict();
    }

    /// Fresh marker stamp; strictly increasing
    pub fn next_stamp(&mut self) -> u64 {
        let stamp = self.next_stamp;
        self.next_stamp += 1;
        stamp
    }

    pub fn surface_id(&mut self, surface: &SurfaceRef) -> SurfaceId {
        self.registry.id_for(surface)
    }

    /// Append an entry for `surface`
    pub fn record(
        &mut self,
        surface: &SurfaceRef,
        range: Range<usize>,
        original_text: String,
        replacement_text: String,
        marker: Option<u64>,
        now: Instant,
    ) {
        self.prune();
        let id = self.registry.id_for(surface);
        tracing::debug!(
            "Recording replacement on surface {}: {:?} '{}' -> '{}'",
            id.get(),
            range,
            original_text,
            replacement_text
        );
        self.entries.push_back(ReplacementHistoryEntry {
            surface: id,
            range,
            original_text,
            replacement_text,
            recorded_at: now,
            marker,
        });
        self.evict();
    }

    fn evict(&mut self) {
        while self.entries.len() > self.capacity {
            if let Some(old) = self.entries.pop_front() {
                tracing::debug!("Evicted oldest history entry: '{}'", old.original_text);
            }
        }
    }

    /// Drop entries whose surface has been released
    pub fn prune(&mut self) {
        let dead = self.registry.prune();
        if !dead.is_empty() {
            let before = self.entries.len();
            self.entries.retain(|e| !dead.contains(&e.surface));
            tracing::trace!(
                "Pruned {} history entries for {} released surfaces",
                before - self.entries.len(),
                dead.len()
            );
        }
    }

    /// Number of entries whose surface is still alive
    pub fn len(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| self.registry.is_alive(e.surface))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entries(&self) -> impl Iterator<Item = &ReplacementHistoryEntry> {
        self.entries.iter()
    }

    pub fn has_history(&self, surface: &SurfaceRef) -> bool {
        self.registry
            .lookup(surface)
            .is_some_and(|id| self.entries.iter().any(|e| e.surface == id))
    }

    /// Clear one surface's entries, or everything with `None`
    pub fn clear(&mut self, surface: Option<&SurfaceRef>) {
        match surface {
            Some(surface) => {
                if let Some(id) = self.registry.lookup(surface) {
                    self.entries.retain(|e| e.surface != id);
                }
            }
            None => self.clear_all(),
        }
    }

    pub fn clear_all(&mut self) {
        self.entries.clear();
        self.registry.prune();
    }

    /// Undo the most recent replacement on `surface`.
    ///
    /// Returns `Ok(None)` when there is nothing to undo. A stale entry is
    /// discarded before `StaleHistoryEntry` is returned.
    pub fn undo(&mut self, surface: &SurfaceRef) -> Result<Option<Undone>, ReplaceError> {
        self.prune();
        if !surface.borrow().is_attached() {
            return Err(ReplaceError::DetachedSurface);
        }

        let latest = self
            .registry
            .lookup(surface)
            .and_then(|id| self.entries.iter().rposition(|e| e.surface == id));

        let Some(idx) = latest else {
            // Markers outlive evicted entries; they are still exact.
            return Ok(undo_marker(surface, None).map(|cursor| Undone {
                kind: UndoKind::Marker,
                cursor,
            }));
        };

        if let Some(stamp) = self.entries[idx].marker {
            if let Some(cursor) = undo_marker(surface, Some(stamp)) {
                self.entries.remove(idx);
                return Ok(Some(Undone {
                    kind: UndoKind::Marker,
                    cursor,
                }));
            }
            tracing::debug!("Marker {} gone, falling back to position undo", stamp);
        }

        let result = undo_position(surface, &self.entries[idx]);
        self.entries.remove(idx);
        result.map(|cursor| {
            Some(Undone {
                kind: UndoKind::Position,
                cursor,
            })
        })
    }
}

/// Unwrap the marker with `stamp` (or the newest one) back to its command
fn undo_marker(surface: &SurfaceRef, stamp: Option<u64>) -> Option<usize> {
    let mut surface = surface.borrow_mut();
    let doc = surface.rich_document_mut()?;
    let path = match stamp {
        Some(stamp) => doc.find_marker(stamp)?,
        None => doc.latest_marker()?.0,
    };
    let cursor = doc.unwrap_marker_to_text(&path)?;
    surface.set_cursor(cursor);
    surface.notify_changed();
    Some(cursor)
}

fn undo_position(
    surface: &SurfaceRef,
    entry: &ReplacementHistoryEntry,
) -> Result<usize, ReplaceError> {
    let mut surface = surface.borrow_mut();
    let text: Vec<char> = surface.text().chars().collect();
    let needle: Vec<char> = entry.replacement_text.chars().collect();

    let Some(found) = find_near(&text, &needle, entry.range.start) else {
        tracing::debug!(
            "Replacement text '{}' no longer present, discarding entry",
            entry.replacement_text
        );
        return Err(ReplaceError::StaleHistoryEntry);
    };

    surface.splice(found..found + needle.len(), &entry.original_text)?;
    let cursor = found + entry.original_text.chars().count();
    surface.set_cursor(cursor);
    surface.notify_changed();
    Ok(cursor)
}

/// Position of `needle` in `text`, checking `expected` first and then
/// alternating outward one character at a time.
fn find_near(text: &[char], needle: &[char], expected: usize) -> Option<usize> {
    if needle.len() > text.len() {
        return None;
    }
    let last = text.len() - needle.len();
    let matches_at = |pos: usize| text[pos..pos + needle.len()] == *needle;

    let expected = expected.min(last);
    for distance in 0..=last {
        let before = expected.checked_sub(distance);
        let after = expected + distance;
        if before.is_none() && after > last {
            break;
        }
        if let Some(pos) = before {
            if matches_at(pos) {
                return Some(pos);
            }
        }
        if distance > 0 && after <= last && matches_at(after) {
            return Some(after);
        }
    }
    None
}
