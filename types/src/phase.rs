//! Bootstrap lifecycle.
//!
//! ```text
//!            ┌──────► Ready
//! Pending ───┤
//!            └──────► Failed(error)
//! ```
//!
//! `Ready` and `Failed` are terminal. The acquisition error lives inside the
//! `Failed` variant, so an error without a failure (or a failure without an
//! error) cannot be represented.

use std::fmt;

use crate::error::{AcquisitionError, TransitionError};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Pending,
    Ready,
    Failed(AcquisitionError),
}

/// Payload-free discriminant of [`Phase`], for logging and comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    Pending,
    Ready,
    Failed,
}

impl PhaseKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Ready => "ready",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Phase {
    #[must_use]
    pub fn kind(&self) -> PhaseKind {
        match self {
            Self::Pending => PhaseKind::Pending,
            Self::Ready => PhaseKind::Ready,
            Self::Failed(_) => PhaseKind::Failed,
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// The acquisition error, present iff the phase is `Failed`.
    #[must_use]
    pub fn error(&self) -> Option<&AcquisitionError> {
        match self {
            Self::Failed(err) => Some(err),
            Self::Pending | Self::Ready => None,
        }
    }

    /// Validate a transition out of `self`.
    ///
    /// Only `Pending -> Ready` and `Pending -> Failed` are legal. Everything
    /// else (including `Pending -> Pending`) is rejected.
    pub fn check_transition(&self, next: &Phase) -> Result<(), TransitionError> {
        match (self, next) {
            (Self::Pending, Self::Ready | Self::Failed(_)) => Ok(()),
            _ => Err(TransitionError {
                from: self.kind(),
                to: next.kind(),
            }),
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(err) => write!(f, "failed: {err}"),
            other => f.write_str(other.kind().as_str()),
        }
    }
}
