//! The bootstrap gate.
//!
//! One gate guards one module. The first call to [`BootstrapGate::start`]
//! spawns the bootstrap task and stores a shared handle to its outcome;
//! later and concurrent callers await the same handle. The task is detached
//! from its callers: dropping a `start()` future neither cancels acquisition
//! nor lets a second acquisition begin.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};

use bootgate_types::{
    AcquisitionError, BootstrapError, DEFAULT_LOADED_MESSAGE, EntryPointError, Phase,
};

use crate::sink::{DiagnosticSink, TracingSink};
use crate::source::{LoadedModule, ModuleSource};
use crate::state::BootstrapState;

type Outcome = Result<(), BootstrapError>;
type Flight = Shared<BoxFuture<'static, Outcome>>;

/// What the gate does once the module is ready.
#[derive(Debug, Clone)]
pub struct GateOptions {
    /// Callable to invoke after `Ready`. `None` loads the module only.
    pub entry_point: Option<String>,
    /// Line sent to the diagnostic sink when the module reaches `Ready`.
    pub loaded_message: String,
}

impl Default for GateOptions {
    fn default() -> Self {
        Self {
            entry_point: None,
            loaded_message: DEFAULT_LOADED_MESSAGE.to_string(),
        }
    }
}

impl GateOptions {
    pub fn with_entry_point(mut self, name: impl Into<String>) -> Self {
        self.entry_point = Some(name.into());
        self
    }

    pub fn with_loaded_message(mut self, message: impl Into<String>) -> Self {
        self.loaded_message = message.into();
        self
    }
}

/// Guards one-time asynchronous acquisition of a module.
///
/// Cloning the gate yields another handle to the same bootstrap.
/// `start()` must be called from within a tokio runtime.
pub struct BootstrapGate<S: ModuleSource> {
    inner: Arc<Inner<S>>,
}

struct Inner<S: ModuleSource> {
    source: S,
    options: GateOptions,
    sink: Arc<dyn DiagnosticSink>,
    state: BootstrapState,
    module: Mutex<Option<S::Module>>,
    flight: Mutex<Option<Flight>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<S: ModuleSource> Clone for BootstrapGate<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: ModuleSource> fmt::Debug for BootstrapGate<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BootstrapGate")
            .field("source", &self.inner.source.describe())
            .field("options", &self.inner.options)
            .field("phase", &self.inner.state.phase())
            .finish_non_exhaustive()
    }
}

impl<S: ModuleSource> BootstrapGate<S> {
    /// Gate that reports the loaded line through `tracing`.
    pub fn new(source: S, options: GateOptions) -> Self {
        Self::with_sink(source, options, Arc::new(TracingSink))
    }

    pub fn with_sink(source: S, options: GateOptions, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            inner: Arc::new(Inner {
                source,
                options,
                sink,
                state: BootstrapState::new(),
                module: Mutex::new(None),
                flight: Mutex::new(None),
            }),
        }
    }

    /// Handle to the bootstrap state, for anything that needs readiness.
    #[must_use]
    pub fn state(&self) -> BootstrapState {
        self.inner.state.clone()
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        self.inner.state.phase()
    }

    #[must_use]
    pub fn options(&self) -> &GateOptions {
        &self.inner.options
    }

    /// Run the bootstrap, or join the one already running or finished.
    ///
    /// Every caller receives the same outcome. After the bootstrap has
    /// settled this returns immediately without side effects.
    pub async fn start(&self) -> Result<(), BootstrapError> {
        self.flight().await
    }

    /// Run `f` against the acquired module.
    ///
    /// Returns `None` unless the phase is `Ready`. While the entry point is
    /// running, callers on other threads block until it returns.
    pub fn with_module<R>(&self, f: impl FnOnce(&mut S::Module) -> R) -> Option<R> {
        if !self.inner.state.is_ready() {
            return None;
        }
        lock(&self.inner.module).as_mut().map(f)
    }

    fn flight(&self) -> Flight {
        let mut slot = lock(&self.inner.flight);
        if let Some(flight) = slot.as_ref() {
            tracing::debug!(
                phase = %self.inner.state.phase().kind(),
                "Bootstrap already triggered, joining"
            );
            return flight.clone();
        }

        let inner = Arc::clone(&self.inner);
        let task = tokio::spawn(Arc::clone(&inner).bootstrap());
        let flight = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(err) => {
                    tracing::error!(error = %err, "Bootstrap task aborted");
                    // No-op if the task had already reached Ready.
                    inner.settle(Phase::Failed(AcquisitionError::custom(format!(
                        "bootstrap aborted: {err}"
                    ))));
                    Err(BootstrapError::Aborted(err.to_string()))
                }
            }
        }
        .boxed()
        .shared();

        *slot = Some(flight.clone());
        flight
    }
}

impl<S: ModuleSource> Inner<S> {
    async fn bootstrap(self: Arc<Self>) -> Outcome {
        let origin = self.source.describe();
        tracing::info!(module = %origin, "Acquiring module");

        let module = match self.source.acquire().await {
            Ok(module) => module,
            Err(err) => {
                tracing::warn!(module = %origin, error = %err, "Module acquisition failed");
                self.settle(Phase::Failed(err.clone()));
                return Err(err.into());
            }
        };

        // The handle is in place before Ready is published.
        {
            let mut slot = lock(&self.module);
            let module = slot.insert(module);
            self.settle(Phase::Ready);
            tracing::debug!(module = %origin, exports = ?module.exports(), "Module ready");
        }
        self.sink.emit(&self.options.loaded_message);

        let Some(entry) = self.options.entry_point.clone() else {
            return Ok(());
        };

        tracing::info!(entry_point = %entry, "Invoking entry point");
        // Guest code runs on the blocking pool.
        let inner = Arc::clone(&self);
        let name = entry.clone();
        let invoked = tokio::task::spawn_blocking(move || match lock(&inner.module).as_mut() {
            Some(module) => module.invoke(&name),
            None => Err(EntryPointError::Failed {
                name,
                message: "module is not loaded".to_string(),
            }),
        })
        .await
        .unwrap_or_else(|err| {
            Err(EntryPointError::Failed {
                name: entry.clone(),
                message: format!("entry point task failed: {err}"),
            })
        });

        match invoked {
            Ok(()) => {
                tracing::info!(entry_point = %entry, "Entry point returned");
                Ok(())
            }
            Err(err) => {
                tracing::error!(entry_point = %entry, error = %err, "Entry point failed");
                Err(err.into())
            }
        }
    }

    fn settle(&self, next: Phase) {
        let kind = next.kind();
        match self.state.settle(next) {
            Ok(()) => tracing::info!(phase = %kind, "Bootstrap settled"),
            Err(err) => tracing::error!(error = %err, "Rejected bootstrap transition"),
        }
    }
}
