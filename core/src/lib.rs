//! Bootstrap gate for Bootgate.
//!
//! # Architecture
//!
//! ```text
//! start() ─┐
//! start() ─┼─► in-flight slot ─► bootstrap task ─► ModuleSource::acquire()
//! start() ─┘        (shared)            │
//!                                       ├─ Ok  ─► Ready ─► "module loaded" ─► entry point
//!                                       └─ Err ─► Failed(error)
//! ```
//!
//! The first `start()` spawns the bootstrap task; every other caller joins
//! the same shared outcome. The phase is published through
//! [`BootstrapState`], which readers hold as a cloneable handle.

mod gate;
mod sink;
mod source;
mod state;

pub use gate::{BootstrapGate, GateOptions};
pub use sink::{DiagnosticSink, MemorySink, TracingSink};
pub use source::{AcquireFut, LoadedModule, ModuleSource};
pub use state::{BootstrapState, ReadinessWatch};

pub use bootgate_types::{
    AcquisitionError, BootstrapError, EntryPointError, Phase, PhaseKind, TransitionError,
};
