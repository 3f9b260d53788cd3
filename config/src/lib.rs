//! Configuration loading for Bootgate.
//!
//! ```toml
//! [module]
//! path = "${HOME}/app/pkg/app.wasm"
//! entry_point = "main"
//! max_fuel = 1000000
//! max_memory_pages = 256
//!
//! [diagnostics]
//! loaded_message = "module loaded"
//!
//! [log]
//! filter = "info"
//! ```
//!
//! The file is read from `$BOOTGATE_CONFIG` when set, otherwise from
//! `~/.bootgate/config.toml`.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use bootgate_types::DEFAULT_LOADED_MESSAGE;

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV_VAR: &str = "BOOTGATE_CONFIG";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BootConfig {
    pub module: ModuleConfig,
    pub diagnostics: Option<DiagnosticsConfig>,
    pub log: Option<LogConfig>,
    /// File this config was loaded from; relative module paths resolve
    /// against its directory.
    #[serde(skip)]
    origin: Option<PathBuf>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleConfig {
    /// Module file. `${VAR}` references are expanded.
    pub path: String,
    /// Callable to invoke once the module is ready. Omit to load only.
    pub entry_point: Option<String>,
    pub max_fuel: Option<u64>,
    pub max_memory_pages: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DiagnosticsConfig {
    pub loaded_message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// `tracing-subscriber` filter directive, used when `RUST_LOG` is unset.
    pub filter: Option<String>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid config {}: {message}", .path.display())]
    Invalid { path: PathBuf, message: String },
}

impl ConfigError {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Parse { path, .. }
            | ConfigError::Invalid { path, .. } => path,
        }
    }
}

/// Replace `${VAR}` with the variable's value. Unset variables become empty;
/// an unclosed `${` is kept verbatim.
#[must_use]
pub fn expand_env_vars(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            out.push_str(&rest[start..]);
            return out;
        };
        let var = &after[..end];
        if !var.is_empty() {
            out.push_str(&env::var(var).unwrap_or_default());
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

/// Default config location: `$BOOTGATE_CONFIG`, else `~/.bootgate/config.toml`.
#[must_use]
pub fn config_path() -> Option<PathBuf> {
    env::var_os(CONFIG_ENV_VAR)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".bootgate").join("config.toml")))
}

impl BootConfig {
    /// Load from the default location. `Ok(None)` when no file exists.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = config_path() else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        // Loaded before logging is installed; failures are reported by the caller.
        let content = fs::read_to_string(path).map_err(|err| ConfigError::Read {
            path: path.to_path_buf(),
            source: err,
        })?;

        let mut config = Self::parse(&content).map_err(|err| ConfigError::Parse {
            path: path.to_path_buf(),
            source: err,
        })?;
        config.origin = Some(path.to_path_buf());
        config.validate(path)?;
        Ok(config)
    }

    fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    fn validate(&self, path: &Path) -> Result<(), ConfigError> {
        let invalid = |message: &str| ConfigError::Invalid {
            path: path.to_path_buf(),
            message: message.to_string(),
        };
        if self.module.path.trim().is_empty() {
            return Err(invalid("module.path must not be empty"));
        }
        if self
            .module
            .entry_point
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(invalid("module.entry_point must not be empty"));
        }
        if self.module.max_memory_pages == Some(0) {
            return Err(invalid("module.max_memory_pages must be at least 1"));
        }
        Ok(())
    }

    /// Module path with `${VAR}` expanded, relative to the config file.
    #[must_use]
    pub fn module_path(&self) -> PathBuf {
        let expanded = PathBuf::from(expand_env_vars(&self.module.path));
        if expanded.is_absolute() {
            return expanded;
        }
        match self.origin.as_deref().and_then(Path::parent) {
            Some(dir) => dir.join(expanded),
            None => expanded,
        }
    }

    #[must_use]
    pub fn entry_point(&self) -> Option<&str> {
        self.module.entry_point.as_deref()
    }

    #[must_use]
    pub fn loaded_message(&self) -> &str {
        self.diagnostics
            .as_ref()
            .and_then(|d| d.loaded_message.as_deref())
            .unwrap_or(DEFAULT_LOADED_MESSAGE)
    }

    #[must_use]
    pub fn log_filter(&self) -> Option<&str> {
        self.log.as_ref().and_then(|log| log.filter.as_deref())
    }

    #[must_use]
    pub fn origin(&self) -> Option<&Path> {
        self.origin.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, MutexGuard, PoisonError};
    use tempfile::TempDir;

    /// Serializes tests that change `BOOTGATE_CONFIG`.
    static CONFIG_ENV: Mutex<()> = Mutex::new(());

    fn config_env() -> MutexGuard<'static, ()> {
        CONFIG_ENV.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_config(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        fs::write(&path, content).unwrap();
        path
    }

    // expand_env_vars tests

    #[test]
    fn expand_env_vars_no_vars() {
        assert_eq!(expand_env_vars("pkg/app.wasm"), "pkg/app.wasm");
    }

    #[test]
    fn expand_env_vars_single_var() {
        unsafe {
            env::set_var("BOOTGATE_TEST_DIR", "/opt/app");
        }
        assert_eq!(
            expand_env_vars("${BOOTGATE_TEST_DIR}/app.wasm"),
            "/opt/app/app.wasm"
        );
        unsafe {
            env::remove_var("BOOTGATE_TEST_DIR");
        }
    }

    #[test]
    fn expand_env_vars_missing_var_becomes_empty() {
        unsafe {
            env::remove_var("BOOTGATE_MISSING_FOR_TEST");
        }
        assert_eq!(
            expand_env_vars("a${BOOTGATE_MISSING_FOR_TEST}b"),
            "ab"
        );
    }

    #[test]
    fn expand_env_vars_adjacent_vars() {
        unsafe {
            env::set_var("BOOTGATE_ADJ_A", "X");
            env::set_var("BOOTGATE_ADJ_B", "Y");
        }
        assert_eq!(expand_env_vars("${BOOTGATE_ADJ_A}${BOOTGATE_ADJ_B}"), "XY");
        unsafe {
            env::remove_var("BOOTGATE_ADJ_A");
            env::remove_var("BOOTGATE_ADJ_B");
        }
    }

    #[test]
    fn expand_env_vars_unclosed_brace_preserved() {
        assert_eq!(expand_env_vars("pkg/${UNCLOSED"), "pkg/${UNCLOSED");
    }

    #[test]
    fn expand_env_vars_empty_var_name_dropped() {
        assert_eq!(expand_env_vars("a${}b"), "ab");
    }

    // parsing

    #[test]
    fn minimal_config_uses_defaults() {
        let config = BootConfig::parse("[module]\npath = \"app.wasm\"\n").unwrap();
        assert_eq!(config.entry_point(), None);
        assert_eq!(config.loaded_message(), "module loaded");
        assert_eq!(config.log_filter(), None);
        assert_eq!(config.module.max_fuel, None);
    }

    #[test]
    fn full_config_parses() {
        let config = BootConfig::parse(
            r#"
            [module]
            path = "pkg/app.wasm"
            entry_point = "mainJs"
            max_fuel = 500000
            max_memory_pages = 16

            [diagnostics]
            loaded_message = "WASM Loaded"

            [log]
            filter = "bootgate=debug"
            "#,
        )
        .unwrap();
        assert_eq!(config.entry_point(), Some("mainJs"));
        assert_eq!(config.module.max_fuel, Some(500_000));
        assert_eq!(config.module.max_memory_pages, Some(16));
        assert_eq!(config.loaded_message(), "WASM Loaded");
        assert_eq!(config.log_filter(), Some("bootgate=debug"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(BootConfig::parse("[module]\npath = \"a.wasm\"\nentry = \"main\"\n").is_err());
    }

    #[test]
    fn module_section_is_required() {
        assert!(BootConfig::parse("[log]\nfilter = \"info\"\n").is_err());
    }

    // location

    #[test]
    fn config_path_prefers_env_var() {
        let _env = config_env();
        unsafe {
            env::set_var(CONFIG_ENV_VAR, "/etc/bootgate/custom.toml");
        }
        assert_eq!(
            config_path(),
            Some(PathBuf::from("/etc/bootgate/custom.toml"))
        );

        unsafe {
            env::set_var(CONFIG_ENV_VAR, "");
        }
        assert_eq!(
            config_path(),
            dirs::home_dir().map(|home| home.join(".bootgate").join("config.toml"))
        );

        unsafe {
            env::remove_var(CONFIG_ENV_VAR);
        }
        assert_eq!(
            config_path(),
            dirs::home_dir().map(|home| home.join(".bootgate").join("config.toml"))
        );
    }

    #[test]
    fn load_returns_none_when_file_absent() {
        let _env = config_env();
        let dir = TempDir::new().unwrap();
        unsafe {
            env::set_var(CONFIG_ENV_VAR, dir.path().join("absent.toml"));
        }

        let loaded = BootConfig::load();

        unsafe {
            env::remove_var(CONFIG_ENV_VAR);
        }
        assert!(loaded.unwrap().is_none());
    }

    #[test]
    fn load_reads_file_named_by_env_var() {
        let _env = config_env();
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[module]\npath = \"app.wasm\"\n");
        unsafe {
            env::set_var(CONFIG_ENV_VAR, &path);
        }

        let loaded = BootConfig::load();

        unsafe {
            env::remove_var(CONFIG_ENV_VAR);
        }
        let config = loaded.unwrap().unwrap();
        assert_eq!(config.origin(), Some(path.as_path()));
        assert_eq!(config.module_path(), dir.path().join("app.wasm"));
    }

    // loading

    #[test]
    fn relative_module_path_resolves_against_config_dir() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[module]\npath = \"pkg/app.wasm\"\n");

        let config = BootConfig::load_from(&path).unwrap();

        assert_eq!(config.origin(), Some(path.as_path()));
        assert_eq!(config.module_path(), dir.path().join("pkg/app.wasm"));
    }

    #[test]
    fn absolute_module_path_is_kept() {
        let dir = TempDir::new().unwrap();
        let module = dir.path().join("abs.wasm");
        let path = write_config(
            &dir,
            &format!("[module]\npath = {:?}\n", module.display().to_string()),
        );

        let config = BootConfig::load_from(&path).unwrap();

        assert_eq!(config.module_path(), module);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("absent.toml");

        let err = BootConfig::load_from(&path).unwrap_err();

        assert!(matches!(err, ConfigError::Read { .. }));
        assert_eq!(err.path(), path);
    }

    #[test]
    fn parse_error_carries_path() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[module\npath = 1");

        let err = BootConfig::load_from(&path).unwrap_err();

        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(err.path(), path);
    }

    #[test]
    fn empty_entry_point_is_invalid() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[module]\npath = \"a.wasm\"\nentry_point = \" \"\n");

        let err = BootConfig::load_from(&path).unwrap_err();

        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert!(err.to_string().contains("module.entry_point"));
    }

    #[test]
    fn zero_memory_pages_is_invalid() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[module]\npath = \"a.wasm\"\nmax_memory_pages = 0\n");

        assert!(matches!(
            BootConfig::load_from(&path).unwrap_err(),
            ConfigError::Invalid { .. }
        ));
    }
}
