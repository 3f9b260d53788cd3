//! WebAssembly module source.
//!
//! Implements [`bootgate_core::ModuleSource`] on top of wasmtime:
//!
//! 1. Read the module file (`tokio::fs`)
//! 2. Check the format (binary `\0asm` header, or `.wat` text)
//! 3. Compile on the blocking pool
//! 4. Instantiate, which runs the module's start function
//!
//! Steps 1-4 are the acquisition; any failure there is an
//! [`AcquisitionError`](bootgate_types::AcquisitionError). The resulting
//! [`WasmModule`] exposes its parameterless function exports as callables.

mod host;
mod module;
mod source;

pub use host::{CONSOLE_LOG_IMPORT, HOST_MODULE};
pub use module::WasmModule;
pub use source::{WasmLimits, WasmSource};
