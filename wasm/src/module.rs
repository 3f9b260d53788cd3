//! An instantiated WebAssembly module.

use std::fmt;

use wasmtime::{Instance, Store, Val};

use bootgate_core::LoadedModule;
use bootgate_types::EntryPointError;

use crate::host::HostState;

pub struct WasmModule {
    store: Store<HostState>,
    instance: Instance,
    exports: Vec<String>,
}

impl WasmModule {
    pub(crate) fn new(store: Store<HostState>, instance: Instance, exports: Vec<String>) -> Self {
        Self {
            store,
            instance,
            exports,
        }
    }

    /// Fuel left in the store, if fuel metering is enabled.
    #[must_use]
    pub fn remaining_fuel(&self) -> Option<u64> {
        self.store.get_fuel().ok()
    }
}

impl fmt::Debug for WasmModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WasmModule")
            .field("exports", &self.exports)
            .finish_non_exhaustive()
    }
}

impl LoadedModule for WasmModule {
    fn exports(&self) -> Vec<String> {
        self.exports.clone()
    }

    fn invoke(&mut self, name: &str) -> Result<(), EntryPointError> {
        let func = self
            .instance
            .get_func(&mut self.store, name)
            .ok_or_else(|| EntryPointError::NotExported {
                name: name.to_string(),
            })?;

        let ty = func.ty(&self.store);
        let params = ty.params().len();
        if params != 0 {
            return Err(EntryPointError::Signature {
                name: name.to_string(),
                params,
            });
        }

        // Results are discarded, but the buffer must match the arity.
        let mut results = vec![Val::I32(0); ty.results().len()];
        func.call(&mut self.store, &[], &mut results)
            .map_err(|e| EntryPointError::Trapped {
                name: name.to_string(),
                message: format!("{e:#}"),
            })
    }
}
