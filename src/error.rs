//! Failure kinds for replacement and undo.
//!
//! None of these reach the user. The engine logs them at debug level and
//! reports a plain `false` to whoever asked for the commit or undo.

/// Why a replacement or undo could not be carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceError {
    /// A boundary node for the requested range was not found in a rich surface.
    StructuralLookup,
    /// The recorded replacement text is no longer present in the surface.
    StaleHistoryEntry,
    /// The surface was removed from its document.
    DetachedSurface,
    /// The range collapsed to nothing where text was expected.
    InvalidRange,
}

impl std::fmt::Display for ReplaceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReplaceError::StructuralLookup => write!(f, "structural boundary not found"),
            ReplaceError::StaleHistoryEntry => write!(f, "replacement text no longer present"),
            ReplaceError::DetachedSurface => write!(f, "surface is detached"),
            ReplaceError::InvalidRange => write!(f, "invalid range"),
        }
    }
}

impl std::error::Error for ReplaceError {}
