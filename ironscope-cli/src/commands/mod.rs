//! Command handlers -- one module per subcommand

pub mod analyze;
pub mod config;
pub mod detect;
pub mod rules;

use std::path::{Path, PathBuf};

use tracing::debug;

use ironscope_core::config::IronscopeConfig;
use ironscope_core::error::{ConfigError, IronscopeError};

use crate::error::CliError;

/// Configuration file looked up when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "ironscope.toml";

/// Effective configuration together with where it came from.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    pub config: IronscopeConfig,
    /// Path of the loaded file, or `"(defaults)"`.
    pub source: String,
}

/// Load the configuration for a command.
///
/// An explicit path must exist. Without one, `ironscope.toml` in the working
/// directory is used when present and built-in defaults (plus environment
/// overrides) otherwise.
pub async fn load_config(explicit: Option<&Path>) -> Result<LoadedConfig, CliError> {
    let (path, required) = match explicit {
        Some(path) => (path.to_path_buf(), true),
        None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
    };

    match IronscopeConfig::load(&path).await {
        Ok(config) => Ok(LoadedConfig {
            config,
            source: path.display().to_string(),
        }),
        Err(IronscopeError::Config(ConfigError::FileNotFound { .. })) if !required => {
            debug!(path = %path.display(), "no config file, using defaults");
            let mut config = IronscopeConfig::default();
            config.apply_env_overrides();
            config.validate()?;
            Ok(LoadedConfig {
                config,
                source: "(defaults)".to_owned(),
            })
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_explicit_missing_config_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/ironscope.toml")))
            .await
            .expect_err("explicit missing file should fail");
        assert_eq!(err.exit_code(), 2);
    }

    #[tokio::test]
    async fn test_explicit_config_is_loaded() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let path = dir.path().join("custom.toml");
        std::fs::write(&path, "[engine]\nrow_budget = 42\n").expect("should write config");

        let loaded = load_config(Some(&path)).await.expect("config should load");
        assert_eq!(loaded.config.engine.row_budget, 42);
        assert_eq!(loaded.source, path.display().to_string());
    }

    #[tokio::test]
    async fn test_invalid_explicit_config_is_rejected() {
        let dir = tempfile::tempdir().expect("should create temp dir");
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[engine]\nmin_confidence = 150\n").expect("should write config");

        let err = load_config(Some(&path))
            .await
            .expect_err("out-of-range confidence should fail");
        assert!(err.to_string().contains("min_confidence"));
    }
}
