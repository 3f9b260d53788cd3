//! File-backed WebAssembly module source.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use wasmtime::{Config, Engine, ExternType, Module, Store, StoreLimits, StoreLimitsBuilder};

use bootgate_core::{AcquireFut, DiagnosticSink, ModuleSource, TracingSink};
use bootgate_types::AcquisitionError;

use crate::host::{self, HostState};
use crate::module::WasmModule;

const WASM_MAGIC: &[u8; 4] = b"\0asm";

const WASM_PAGE_BYTES: usize = 64 * 1024;

/// Resource limits applied to the module's store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WasmLimits {
    /// Instruction fuel shared by the start function and every later call.
    pub max_fuel: Option<u64>,
    /// Maximum linear memory size in 64 KiB pages.
    pub max_memory_pages: Option<u32>,
}

/// Loads a module from a `.wasm` binary or `.wat` text file.
#[derive(Clone)]
pub struct WasmSource {
    path: PathBuf,
    limits: WasmLimits,
    console: Arc<dyn DiagnosticSink>,
}

impl fmt::Debug for WasmSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WasmSource")
            .field("path", &self.path)
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}

impl WasmSource {
    /// Source for `path`. Module console output goes to `tracing`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            limits: WasmLimits::default(),
            console: Arc::new(TracingSink),
        }
    }

    pub fn with_limits(mut self, limits: WasmLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Where text passed to `env.console_log` is sent.
    pub fn with_console(mut self, console: Arc<dyn DiagnosticSink>) -> Self {
        self.console = console;
        self
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn limits(&self) -> WasmLimits {
        self.limits
    }

    async fn load(&self) -> Result<WasmModule, AcquisitionError> {
        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| AcquisitionError::Read {
                path: self.path.clone(),
                message: e.to_string(),
            })?;
        check_format(&self.path, &bytes)?;
        tracing::debug!(path = %self.path.display(), size = bytes.len(), "Read module");

        let engine = engine(self.limits)?;
        let module = compile(&engine, bytes).await?;
        let exports = callable_exports(&module);

        let mut store = Store::new(
            &engine,
            HostState {
                console: Arc::clone(&self.console),
                limits: store_limits(self.limits),
            },
        );
        store.limiter(|state| &mut state.limits);
        if let Some(fuel) = self.limits.max_fuel {
            store
                .set_fuel(fuel)
                .map_err(|e| AcquisitionError::Instantiate(format!("{e:#}")))?;
        }

        // Instantiation runs the start function, if the module declares one.
        let linker = host::linker(&engine)?;
        let instance = linker
            .instantiate(&mut store, &module)
            .map_err(|e| AcquisitionError::Instantiate(format!("{e:#}")))?;

        Ok(WasmModule::new(store, instance, exports))
    }
}

impl ModuleSource for WasmSource {
    type Module = WasmModule;

    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn acquire(&self) -> AcquireFut<'_, WasmModule> {
        Box::pin(self.load())
    }
}

fn check_format(path: &Path, bytes: &[u8]) -> Result<(), AcquisitionError> {
    if bytes.starts_with(WASM_MAGIC) {
        return Ok(());
    }
    let is_text = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wat"));
    if is_text {
        return Ok(());
    }
    if bytes.is_empty() {
        return Err(AcquisitionError::Invalid("file is empty".to_string()));
    }
    Err(AcquisitionError::Invalid(
        "missing `\\0asm` header".to_string(),
    ))
}

fn engine(limits: WasmLimits) -> Result<Engine, AcquisitionError> {
    let mut config = Config::new();
    config.consume_fuel(limits.max_fuel.is_some());
    Engine::new(&config).map_err(|e| AcquisitionError::Compile(format!("{e:#}")))
}

async fn compile(engine: &Engine, bytes: Vec<u8>) -> Result<Module, AcquisitionError> {
    let engine = engine.clone();
    let compiled = tokio::task::spawn_blocking(move || Module::new(&engine, &bytes))
        .await
        .map_err(|e| AcquisitionError::Compile(format!("compilation task failed: {e}")))?;
    compiled.map_err(|e| AcquisitionError::Compile(format!("{e:#}")))
}

fn store_limits(limits: WasmLimits) -> StoreLimits {
    let mut builder = StoreLimitsBuilder::new();
    if let Some(pages) = limits.max_memory_pages {
        builder = builder.memory_size(pages as usize * WASM_PAGE_BYTES);
    }
    builder.build()
}

/// Exported functions that can be called without arguments.
fn callable_exports(module: &Module) -> Vec<String> {
    module
        .exports()
        .filter_map(|export| match export.ty() {
            ExternType::Func(func) if func.params().len() == 0 => Some(export.name().to_string()),
            _ => None,
        })
        .collect()
}
