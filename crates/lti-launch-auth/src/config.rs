//! # Launch Authentication Configuration
//!
//! Loaded from TOML, then optionally overridden from the environment:
//!
//! | Variable | Field |
//! |---|---|
//! | `LTI_FRESHNESS_WINDOW_SECS` | `freshness_window_secs` |
//! | `LTI_BACKEND_TIMEOUT_MS` | `backend_timeout_ms` |
//! | `LTI_PURGE_INTERVAL_SECS` | `purge_interval_secs` |

use crate::domain::signature::{SignatureMethod, SignatureVerifier};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

pub const ENV_FRESHNESS_WINDOW_SECS: &str = "LTI_FRESHNESS_WINDOW_SECS";
pub const ENV_BACKEND_TIMEOUT_MS: &str = "LTI_BACKEND_TIMEOUT_MS";
pub const ENV_PURGE_INTERVAL_SECS: &str = "LTI_PURGE_INTERVAL_SECS";

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchAuthConfig {
    /// Maximum allowed distance between `oauth_timestamp` and now, either direction
    pub freshness_window_secs: u64,
    /// Signature methods the verifier accepts
    pub accepted_signature_methods: Vec<SignatureMethod>,
    /// Bound on each credential or nonce store call
    pub backend_timeout_ms: u64,
    /// Period of the background nonce purge
    pub purge_interval_secs: u64,
}

impl Default for LaunchAuthConfig {
    fn default() -> Self {
        Self {
            freshness_window_secs: 5400,
            accepted_signature_methods: vec![SignatureMethod::HmacSha1],
            backend_timeout_ms: 2000,
            purge_interval_secs: 86_400,
        }
    }
}

impl LaunchAuthConfig {
    /// Read, parse and validate a TOML file. Missing fields take defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!(path = %path.display(), "Loaded launch auth config");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|name| std::env::var(name).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    ///
    /// Unparseable values are logged and ignored.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let fields: [(&str, &mut u64); 3] = [
            (ENV_FRESHNESS_WINDOW_SECS, &mut self.freshness_window_secs),
            (ENV_BACKEND_TIMEOUT_MS, &mut self.backend_timeout_ms),
            (ENV_PURGE_INTERVAL_SECS, &mut self.purge_interval_secs),
        ];

        for (name, field) in fields {
            let Some(raw) = lookup(name) else {
                continue;
            };
            match raw.trim().parse() {
                Ok(value) => *field = value,
                Err(_) => warn!(variable = name, value = %raw, "Ignoring non-numeric override"),
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.freshness_window_secs == 0 {
            return Err(ConfigError::Invalid(
                "freshness_window_secs must be greater than zero".into(),
            ));
        }
        if i64::try_from(self.freshness_window_secs).is_err() {
            return Err(ConfigError::Invalid(
                "freshness_window_secs is out of range".into(),
            ));
        }
        if self.accepted_signature_methods.is_empty() {
            return Err(ConfigError::Invalid(
                "accepted_signature_methods must name at least one method".into(),
            ));
        }
        if self.backend_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "backend_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.purge_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "purge_interval_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.backend_timeout_ms)
    }

    pub fn purge_interval(&self) -> Duration {
        Duration::from_secs(self.purge_interval_secs)
    }

    pub fn verifier(&self) -> SignatureVerifier {
        SignatureVerifier::new(self.accepted_signature_methods.clone())
    }
}
