//! Core domain types for Bootgate.
//!
//! This crate contains the bootstrap lifecycle and error taxonomy with no IO,
//! no async, and minimal dependencies. Everything here can be used from any
//! layer of the application.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod error;
mod phase;

pub use error::{AcquisitionError, BootstrapError, EntryPointError, TransitionError};
pub use phase::{Phase, PhaseKind};

/// Diagnostic line emitted when a module reaches `Ready`, unless overridden.
pub const DEFAULT_LOADED_MESSAGE: &str = "module loaded";
