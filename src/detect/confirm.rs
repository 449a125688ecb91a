//! Ambiguity resolver for exact matches that are also prefixes.
//!
//! `/h` matching exactly while `/hello` exists must not commit on the spot.
//! The scheduler parks the match behind a confirm timer instead. When the
//! timer fires the detector re-checks its current buffer, not the parked one.

use std::time::{Duration, Instant};

use super::timer::{TimerPurpose, TimerToken, Timers};
use crate::catalog::MacroCatalog;
use crate::surface::Selection;

/// Default grace period before an ambiguous exact match commits
pub const DEFAULT_CONFIRM_DELAY: Duration = Duration::from_millis(400);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmDecision {
    /// No longer command shares the buffer as a prefix
    CommitNow,
    /// Wait for the confirm timer
    Deferred(TimerToken),
}

/// An exact match waiting on its confirm timer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingConfirm {
    pub buffer: String,
    /// Selection when the match was parked
    pub selection: Selection,
    pub token: TimerToken,
}

#[derive(Debug)]
pub struct ConfirmScheduler {
    delay: Duration,
    pending: Option<PendingConfirm>,
}

impl Default for ConfirmScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_CONFIRM_DELAY)
    }
}

impl ConfirmScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    pub fn pending(&self) -> Option<&PendingConfirm> {
        self.pending.as_ref()
    }

    /// Decide what to do with `buffer`, which matches a command exactly
    pub fn decide(
        &mut self,
        catalog: &MacroCatalog,
        buffer: &str,
        selection: Selection,
        timers: &mut Timers,
        now: Instant,
    ) -> ConfirmDecision {
        if !catalog.has_longer(buffer) {
            self.cancel(timers);
            return ConfirmDecision::CommitNow;
        }

        let token = timers.schedule(TimerPurpose::Confirm, now, self.delay);
        tracing::debug!("Deferring '{}' for {:?}: longer commands exist", buffer, self.delay);
        self.pending = Some(PendingConfirm {
            buffer: buffer.to_string(),
            selection,
            token,
        });
        ConfirmDecision::Deferred(token)
    }

    /// Take the pending confirm if `token` is the one that fired
    pub fn expire(&mut self, token: TimerToken) -> Option<PendingConfirm> {
        match &self.pending {
            Some(pending) if pending.token == token => self.pending.take(),
            _ => None,
        }
    }

    /// Drop the pending confirm and its timer
    pub fn cancel(&mut self, timers: &mut Timers) {
        if let Some(pending) = self.pending.take() {
            timers.cancel(pending.token);
            tracing::trace!("Cancelled pending confirm for '{}'", pending.buffer);
        }
    }
}
