use std::env;
use std::time::Duration;

use crate::error::{LedgerError, Result};

pub const DEFAULT_BASE_URL: &str = "http://localhost:5000";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_TOKEN_VAR: &str = "FINANCE_API_TOKEN";

/// Where and how to reach the finance API
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Name of the environment variable holding the bearer token
    pub token_var: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            token_var: DEFAULT_TOKEN_VAR.to_string(),
        }
    }
}

impl ClientConfig {
    /// Read `FINANCE_API_URL`, `FINANCE_API_TIMEOUT_SECS` and `FINANCE_API_TOKEN_VAR`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key/value source; unset or blank keys fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        if let Some(url) = get("FINANCE_API_URL") {
            config = config.with_base_url(url)?;
        }

        if let Some(secs) = get("FINANCE_API_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                LedgerError::Config(format!(
                    "FINANCE_API_TIMEOUT_SECS must be a whole number of seconds, got '{}'",
                    secs
                ))
            })?;
            if secs == 0 {
                return Err(LedgerError::Config(
                    "FINANCE_API_TIMEOUT_SECS must be greater than zero".to_string(),
                ));
            }
            config.timeout = Duration::from_secs(secs);
        }

        if let Some(var) = get("FINANCE_API_TOKEN_VAR") {
            config.token_var = var.trim().to_string();
        }

        Ok(config)
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let url = url.trim().trim_end_matches('/');
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(LedgerError::Config(format!(
                "API URL must start with http:// or https://, got '{}'",
                url
            )));
        }
        self.base_url = url.to_string();
        Ok(self)
    }
}
