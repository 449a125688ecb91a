//! Detection building blocks: the pending-command state, the ambiguity
//! resolver, timers, and the collaborator callback interface.
//!
//! The state machine that drives them lives in [`crate::detector`].

pub mod actions;
pub mod confirm;
pub mod state;
pub mod timer;

pub use actions::{CompositeActions, DetectorActions, NoopActions};
pub use confirm::{ConfirmDecision, ConfirmScheduler, PendingConfirm};
pub use state::DetectionState;
pub use timer::{TimerPurpose, TimerToken, Timers};
