//! Module-acquisition capability consumed by the gate.

use std::future::Future;
use std::pin::Pin;

use bootgate_types::{AcquisitionError, EntryPointError};

/// Boxed future returned by [`ModuleSource::acquire`].
pub type AcquireFut<'a, M> =
    Pin<Box<dyn Future<Output = Result<M, AcquisitionError>> + Send + 'a>>;

/// Produces a ready-to-use module handle, or fails.
///
/// The gate calls `acquire` at most once per gate. Implementations should
/// not start work until the returned future is polled.
pub trait ModuleSource: Send + Sync + 'static {
    type Module: LoadedModule;

    /// Short human-readable origin for logs (a path, a URL, a name).
    fn describe(&self) -> String;

    fn acquire(&self) -> AcquireFut<'_, Self::Module>;
}

/// An acquired module exposing zero or more named callables.
pub trait LoadedModule: Send + 'static {
    /// Names of the callables that take no arguments.
    fn exports(&self) -> Vec<String>;

    /// Invoke a zero-argument callable. Any return value is discarded.
    fn invoke(&mut self, name: &str) -> Result<(), EntryPointError>;
}
