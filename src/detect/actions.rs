//! Callbacks from the detector to its collaborators.
//!
//! Suggestion overlays and similar UI implement [`DetectorActions`]. Every
//! method has a default, so an implementation only overrides what it cares
//! about. Request methods return `true` when the collaborator handled the key,
//! which suppresses the detector's default behavior for it.

use crate::keys::NavDirection;

pub trait DetectorActions {
    /// Detection began; `position` is the offset of the trigger prefix
    fn on_detection_started(&mut self, _buffer: &str, _position: usize) {}

    fn on_detection_updated(&mut self, _buffer: &str, _position: usize) {}

    fn on_detection_cancelled(&mut self) {}

    fn on_macro_committed(&mut self, _macro_id: &str) {}

    /// Commit key pressed without an exact match
    fn on_commit_requested(&mut self, _buffer: &str) -> bool {
        false
    }

    fn on_navigation_requested(&mut self, _direction: NavDirection) -> bool {
        false
    }

    /// Escape pressed while detecting. Detection is cancelled either way.
    fn on_cancel_requested(&mut self) -> bool {
        false
    }

    fn on_show_all_requested(&mut self, _buffer: &str, _position: usize) -> bool {
        false
    }
}

/// Collaborator that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopActions;

impl DetectorActions for NoopActions {}

/// Fans notifications out to every member. Requests go to members in order
/// and stop at the first one that handles them.
#[derive(Default)]
pub struct CompositeActions {
    members: Vec<Box<dyn DetectorActions>>,
}

impl CompositeActions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a member (builder pattern)
    pub fn with(mut self, member: Box<dyn DetectorActions>) -> Self {
        self.members.push(member);
        self
    }

    pub fn push(&mut self, member: Box<dyn DetectorActions>) {
        self.members.push(member);
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

impl std::fmt::Debug for CompositeActions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeActions")
            .field("members", &self.members.len())
            .finish()
    }
}

impl DetectorActions for CompositeActions {
    fn on_detection_started(&mut self, buffer: &str, position: usize) {
        for m in &mut self.members {
            m.on_detection_started(buffer, position);
        }
    }

    fn on_detection_updated(&mut self, buffer: &str, position: usize) {
        for m in &mut self.members {
            m.on_detection_updated(buffer, position);
        }
    }

    fn on_detection_cancelled(&mut self) {
        for m in &mut self.members {
            m.on_detection_cancelled();
        }
    }

    fn on_macro_committed(&mut self, macro_id: &str) {
        for m in &mut self.members {
            m.on_macro_committed(macro_id);
        }
    }

    fn on_commit_requested(&mut self, buffer: &str) -> bool {
        self.members.iter_mut().any(|m| m.on_commit_requested(buffer))
    }

    fn on_navigation_requested(&mut self, direction: NavDirection) -> bool {
        self.members
            .iter_mut()
            .any(|m| m.on_navigation_requested(direction))
    }

    fn on_cancel_requested(&mut self) -> bool {
        self.members.iter_mut().any(|m| m.on_cancel_requested())
    }

    fn on_show_all_requested(&mut self, buffer: &str, position: usize) -> bool {
        self.members
            .iter_mut()
            .any(|m| m.on_show_all_requested(buffer, position))
    }
}
