//! textmacro - trigger-based text expansion
//!
//! This crate detects short trigger commands (`/sig`, `/addr`) while the user
//! types into a text surface and replaces them with predefined plain or
//! formatted content, keeping a bounded per-surface undo history.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod config_paths;
pub mod detect;
pub mod detector;
pub mod error;
pub mod history;
pub mod keys;
pub mod replace;
pub mod session;
pub mod surface;
pub mod tracing;

// Re-export commonly used types
pub use catalog::{ContentType, Macro, MacroCatalog};
pub use config::{CommitKey, EngineConfig};
pub use detect::{CompositeActions, DetectionState, DetectorActions, NoopActions};
pub use detector::{Detector, KeyOutcome};
pub use error::ReplaceError;
pub use history::UndoHistory;
pub use keys::{KeyCode, Keystroke, Modifiers, NavDirection};
pub use session::TypingSession;
pub use surface::{RichRegion, Surface, SurfaceKind, SurfaceRef, TextField};
