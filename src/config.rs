// src/config.rs

//! Configuration loading utilities.
//!
//! The TOML file lives in the storage directory; API keys never do. They are
//! read from the environment variables the configuration names.

use std::path::Path;

use secrecy::SecretString;

use crate::error::{AppError, Result};
use crate::models::Config;

/// API keys read from the environment.
#[derive(Default)]
pub struct Secrets {
    pub gemini: Option<SecretString>,
    pub places: Option<SecretString>,
    pub firebase: Option<SecretString>,
}

impl Secrets {
    /// Read every key named in the configuration. Unset or blank is `None`.
    pub fn from_env(config: &Config) -> Self {
        Self {
            gemini: read_secret(&config.ai.api_key_env),
            places: read_secret(&config.places.api_key_env),
            firebase: read_secret(&config.auth.api_key_env),
        }
    }
}

fn read_secret(var: &str) -> Option<SecretString> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Some(SecretString::from(value.trim().to_string())),
        _ => {
            log::debug!("{} is not set", var);
            None
        }
    }
}

/// Load configuration from a TOML file.
///
/// A missing file falls back to defaults; a file that exists but does not
/// parse or validate is an error.
pub fn load_config(path: &Path) -> Result<Config> {
    let config = if path.exists() {
        Config::load(path)
            .map_err(|e| AppError::config(format!("Failed to load {}: {e}", path.display())))?
    } else {
        log::warn!("No config at {}, using defaults", path.display());
        Config::default()
    };

    config
        .validate()
        .map_err(|e| AppError::config(format!("Invalid configuration: {e}")))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_uses_defaults() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(&tmp.path().join("config.toml")).unwrap();
        assert_eq!(config.server.port, Config::default().server.port);
    }

    #[test]
    fn broken_file_is_a_config_error() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[server]\nport = \"not a number\"\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "[http]\ntimeout_secs = 0\n").unwrap();
        assert!(load_config(&path).is_err());
    }

    #[test]
    fn unset_secret_is_none() {
        assert!(read_secret("UNIGUIDE_TEST_SURELY_UNSET_VARIABLE").is_none());
    }
}
