//! Config → gate wiring.

use bootgate_config::BootConfig;
use bootgate_core::{BootstrapGate, GateOptions};
use bootgate_wasm::{WasmLimits, WasmSource};

pub(crate) fn gate_from_config(config: &BootConfig) -> BootstrapGate<WasmSource> {
    let source = WasmSource::new(config.module_path()).with_limits(WasmLimits {
        max_fuel: config.module.max_fuel,
        max_memory_pages: config.module.max_memory_pages,
    });
    BootstrapGate::new(source, gate_options(config))
}

fn gate_options(config: &BootConfig) -> GateOptions {
    let options = GateOptions::default().with_loaded_message(config.loaded_message());
    match config.entry_point() {
        Some(entry) => options.with_entry_point(entry),
        None => options,
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use bootgate_core::{AcquisitionError, BootstrapError, Phase};
    use tempfile::TempDir;

    use super::*;

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        fs::write(&path, content).unwrap();
        path
    }

    fn load(dir: &TempDir, content: &str) -> BootConfig {
        BootConfig::load_from(&write_config(dir, content)).unwrap()
    }

    #[test]
    fn options_follow_config() {
        let dir = TempDir::new().unwrap();
        let config = load(
            &dir,
            "[module]\npath = \"app.wasm\"\nentry_point = \"mainJs\"\n\n[diagnostics]\nloaded_message = \"WASM Loaded\"\n",
        );

        let options = gate_options(&config);

        assert_eq!(options.entry_point.as_deref(), Some("mainJs"));
        assert_eq!(options.loaded_message, "WASM Loaded");
    }

    #[test]
    fn load_only_when_no_entry_point() {
        let dir = TempDir::new().unwrap();
        let config = load(&dir, "[module]\npath = \"app.wasm\"\n");

        let options = gate_options(&config);

        assert_eq!(options.entry_point, None);
        assert_eq!(options.loaded_message, "module loaded");
    }

    #[test]
    fn gate_is_pending_until_started() {
        let dir = TempDir::new().unwrap();
        let config = load(
            &dir,
            "[module]\npath = \"app.wasm\"\nmax_fuel = 1000\nmax_memory_pages = 8\n",
        );

        let gate = gate_from_config(&config);

        assert_eq!(
            gate.with_module(|_| ()),
            None,
            "nothing is acquired before start"
        );
        assert_eq!(gate.phase(), Phase::Pending);
    }

    #[tokio::test]
    async fn runs_module_named_by_config() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("pkg")).unwrap();
        fs::write(
            dir.path().join("pkg/app.wat"),
            r#"(module (func (export "mainJs")))"#,
        )
        .unwrap();
        let config = load(
            &dir,
            "[module]\npath = \"pkg/app.wat\"\nentry_point = \"mainJs\"\nmax_fuel = 100000\n",
        );

        let gate = gate_from_config(&config);
        gate.start().await.unwrap();

        assert_eq!(gate.phase(), Phase::Ready);
    }

    #[tokio::test]
    async fn missing_module_fails_bootstrap() {
        let dir = TempDir::new().unwrap();
        let config = load(&dir, "[module]\npath = \"pkg/absent.wasm\"\n");

        let gate = gate_from_config(&config);
        let err = gate.start().await.unwrap_err();

        assert!(matches!(
            err,
            BootstrapError::Acquisition(AcquisitionError::Read { .. })
        ));
    }
}
