//! Host functions and per-store state.

use std::sync::Arc;

use wasmtime::{Caller, Engine, Extern, Linker, StoreLimits};

use bootgate_core::DiagnosticSink;
use bootgate_types::AcquisitionError;

/// Import module name for host functions.
pub const HOST_MODULE: &str = "env";

/// `console_log(ptr: i32, len: i32)`: UTF-8 text from the exported `memory`.
pub const CONSOLE_LOG_IMPORT: &str = "console_log";

pub(crate) struct HostState {
    pub(crate) console: Arc<dyn DiagnosticSink>,
    pub(crate) limits: StoreLimits,
}

pub(crate) fn linker(engine: &Engine) -> Result<Linker<HostState>, AcquisitionError> {
    let mut linker = Linker::new(engine);
    linker
        .func_wrap(HOST_MODULE, CONSOLE_LOG_IMPORT, console_log)
        .map_err(|e| AcquisitionError::Instantiate(format!("{e:#}")))?;
    Ok(linker)
}

fn console_log(mut caller: Caller<'_, HostState>, ptr: i32, len: i32) {
    let Some(memory) = caller.get_export("memory").and_then(Extern::into_memory) else {
        tracing::warn!("console_log called by a module without an exported memory");
        return;
    };
    let (Ok(start), Ok(len)) = (usize::try_from(ptr), usize::try_from(len)) else {
        tracing::warn!(ptr, len, "console_log called with a negative range");
        return;
    };

    let text = {
        let data = memory.data(&caller);
        match start.checked_add(len).and_then(|end| data.get(start..end)) {
            Some(bytes) => String::from_utf8_lossy(bytes).into_owned(),
            None => {
                tracing::warn!(ptr, len, size = data.len(), "console_log range out of bounds");
                return;
            }
        }
    };
    caller.data().console.emit(&text);
}
