//! Error taxonomy.
//!
//! Acquisition failures and entry-point failures are separate types and are
//! never converted into each other. All errors are `Clone` because a single
//! bootstrap outcome is delivered to every coalesced awaiter.

use std::path::PathBuf;

use thiserror::Error;

use crate::phase::PhaseKind;

/// The module could not be acquired. Terminal for the bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AcquisitionError {
    #[error("failed to read module {}: {message}", .path.display())]
    Read { path: PathBuf, message: String },

    #[error("not a binary module: {0}")]
    Invalid(String),

    #[error("failed to compile module: {0}")]
    Compile(String),

    #[error("failed to instantiate module: {0}")]
    Instantiate(String),

    /// Failure reported by a custom module source.
    #[error("{0}")]
    Custom(String),
}

impl AcquisitionError {
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}

/// The module loaded but invoking its entry point failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EntryPointError {
    #[error("entry point `{name}` is not exported by the module")]
    NotExported { name: String },

    #[error("entry point `{name}` takes {params} parameter(s); expected none")]
    Signature { name: String, params: usize },

    #[error("entry point `{name}` trapped: {message}")]
    Trapped { name: String, message: String },

    #[error("entry point `{name}` failed: {message}")]
    Failed { name: String, message: String },
}

impl EntryPointError {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::NotExported { name }
            | Self::Signature { name, .. }
            | Self::Trapped { name, .. }
            | Self::Failed { name, .. } => name,
        }
    }
}

/// Outcome of `start()` when it does not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error(transparent)]
    EntryPoint(#[from] EntryPointError),

    /// The bootstrap task ended without producing an outcome (it panicked).
    #[error("bootstrap aborted: {0}")]
    Aborted(String),
}

impl BootstrapError {
    #[must_use]
    pub fn is_acquisition(&self) -> bool {
        matches!(self, Self::Acquisition(_))
    }

    #[must_use]
    pub fn is_entry_point(&self) -> bool {
        matches!(self, Self::EntryPoint(_))
    }
}

/// An attempted phase change that would break monotonicity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("illegal phase transition {from} -> {to}")]
pub struct TransitionError {
    pub from: PhaseKind,
    pub to: PhaseKind,
}
