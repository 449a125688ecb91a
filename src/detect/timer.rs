//! Deferred work as explicit, clock-injected timers.
//!
//! Nothing here sleeps or spawns. A timer is a deadline stored under its
//! purpose; the host calls `take_due(now)` (via `Detector::tick`) and acts on
//! whatever fired. Scheduling a purpose again replaces the previous timer, so
//! at most one timer per purpose is ever live.

use std::time::{Duration, Instant};

/// What a timer is for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerPurpose {
    /// Ambiguity grace period before committing an exact match
    Confirm,
    /// Grace period before a blur cancels detection
    BlurCancel,
}

/// Handle to one scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken {
    pub purpose: TimerPurpose,
    id: u64,
}

#[derive(Debug, Clone, Copy)]
struct Scheduled {
    token: TimerToken,
    deadline: Instant,
}

#[derive(Debug, Default)]
pub struct Timers {
    scheduled: Vec<Scheduled>,
    next_id: u64,
}

impl Timers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `purpose` to fire `delay` after `now`, replacing any live
    /// timer with the same purpose.
    pub fn schedule(&mut self, purpose: TimerPurpose, now: Instant, delay: Duration) -> TimerToken {
        self.cancel_purpose(purpose);
        self.next_id += 1;
        let token = TimerToken {
            purpose,
            id: self.next_id,
        };
        self.scheduled.push(Scheduled {
            token,
            deadline: now + delay,
        });
        tracing::trace!("Scheduled {:?} timer #{} in {:?}", purpose, token.id, delay);
        token
    }

    /// Cancel one timer. Returns false if it already fired or was replaced.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        let before = self.scheduled.len();
        self.scheduled.retain(|s| s.token != token);
        before != self.scheduled.len()
    }

    pub fn cancel_purpose(&mut self, purpose: TimerPurpose) -> bool {
        let before = self.scheduled.len();
        self.scheduled.retain(|s| s.token.purpose != purpose);
        before != self.scheduled.len()
    }

    pub fn cancel_all(&mut self) {
        self.scheduled.clear();
    }

    pub fn is_scheduled(&self, purpose: TimerPurpose) -> bool {
        self.scheduled.iter().any(|s| s.token.purpose == purpose)
    }

    pub fn is_live(&self, token: TimerToken) -> bool {
        self.scheduled.iter().any(|s| s.token == token)
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Instant> {
        self.scheduled.iter().map(|s| s.deadline).min()
    }

    /// Remove and return every timer due at `now`, earliest first
    pub fn take_due(&mut self, now: Instant) -> Vec<TimerToken> {
        let mut due: Vec<Scheduled> = Vec::new();
        self.scheduled.retain(|s| {
            if s.deadline <= now {
                due.push(*s);
                false
            } else {
                true
            }
        });
        due.sort_by_key(|s| (s.deadline, s.token.id));
        due.into_iter().map(|s| s.token).collect()
    }
}
