//! Bootgate CLI - the process that embeds the bootstrap gate.
//!
//! ```text
//! main() -> BootConfig::load() -> init_tracing() -> gate_from_config()
//!                                                        |
//!                                                        v
//!                                          gate.start().await -> exit status
//! ```
//!
//! Runs on the current-thread runtime: the gate's one suspension point is
//! module acquisition, and module compilation is moved to the blocking pool.

mod bootstrap;

use anyhow::{Context, Result, bail};
use std::io::stderr;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use bootgate_config::{BootConfig, CONFIG_ENV_VAR, config_path};

const DEFAULT_LOG_FILTER: &str = "info";

fn init_tracing(config_filter: Option<&str>) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config_filter.unwrap_or(DEFAULT_LOG_FILTER)))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(stderr))
        .with(env_filter)
        .init();
}

fn load_config() -> Result<BootConfig> {
    if let Some(config) = BootConfig::load()? {
        return Ok(config);
    }
    let location = config_path().map_or_else(
        || "~/.bootgate/config.toml".to_string(),
        |p| p.display().to_string(),
    );
    bail!("no config file at {location} (set {CONFIG_ENV_VAR} to use another file)")
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = load_config()?;
    init_tracing(config.log_filter());
    if let Some(origin) = config.origin() {
        tracing::info!(path = %origin.display(), "Config loaded");
    }

    let module_path = config.module_path();
    let gate = bootstrap::gate_from_config(&config);
    gate.start()
        .await
        .with_context(|| format!("bootstrap of {} failed", module_path.display()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn config_failures_name_the_file() {
        let dir = TempDir::new().unwrap();
        let absent = dir.path().join("absent.toml");
        let broken = dir.path().join("broken.toml");
        fs::write(&broken, "[module\npath = 1").unwrap();

        unsafe {
            env::set_var(CONFIG_ENV_VAR, &absent);
        }
        let missing = load_config().unwrap_err().to_string();
        unsafe {
            env::set_var(CONFIG_ENV_VAR, &broken);
        }
        let unparsable = load_config().unwrap_err().to_string();
        unsafe {
            env::remove_var(CONFIG_ENV_VAR);
        }

        assert!(missing.contains("no config file at"));
        assert!(missing.contains(&absent.display().to_string()));
        assert!(unparsable.contains("failed to parse config"));
        assert!(unparsable.contains(&broken.display().to_string()));
    }
}
