//! Process-environment configuration.
//!
//! Origin lists are validated as comma-separated absolute URLs at startup;
//! an invalid entry fails startup instead of silently serving a broken CORS
//! policy.

use std::collections::HashMap;

use reqwest::Url;
use thiserror::Error;

/// Default request deadline.
const DEFAULT_DEADLINE_MS: u64 = 15_000;
/// Default minimum normalized vector score kept before fusion.
const DEFAULT_SCORE_THRESHOLD: f64 = 0.5;
/// Default cache TTL.
const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Startup configuration failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An origin entry is not an absolute URL with a scheme.
    #[error("invalid URL `{value}` in {var}: {reason}")]
    InvalidOrigin {
        /// Environment variable name.
        var: String,
        /// Offending entry.
        value: String,
        /// Parser detail.
        reason: String,
    },

    /// A numeric or boolean variable failed to parse.
    #[error("invalid value `{value}` for {var}")]
    InvalidValue {
        /// Environment variable name.
        var: String,
        /// Offending value.
        value: String,
    },
}

/// Environment-derived pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Origins allowed to call the exposed search operation.
    pub allowed_origins: Vec<Url>,
    /// Origins allowed by the CORS layer of the (external) transport.
    pub cors_origins: Vec<Url>,
    /// Overall request deadline in milliseconds.
    pub deadline_ms: u64,
    /// Minimum normalized vector score kept before fusion.
    pub score_threshold: f64,
    /// Whether the in-process result cache is enabled.
    pub enable_cache: bool,
    /// Cache TTL in seconds.
    pub cache_ttl_seconds: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            allowed_origins: Vec::new(),
            cors_origins: Vec::new(),
            deadline_ms: DEFAULT_DEADLINE_MS,
            score_threshold: DEFAULT_SCORE_THRESHOLD,
            enable_cache: false,
            cache_ttl_seconds: DEFAULT_CACHE_TTL_SECS,
        }
    }
}

impl PipelineConfig {
    /// Read configuration from the process environment.
    ///
    /// # Errors
    ///
    /// [`ConfigError`] when an origin list contains an invalid URL or a
    /// numeric variable fails to parse; startup must not proceed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }

    /// Read configuration from an explicit variable map (testable seam).
    ///
    /// # Errors
    ///
    /// Same as [`Self::from_env`].
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Some(raw) = non_empty(vars, "ALLOWED_ORIGINS") {
            config.allowed_origins = parse_origins("ALLOWED_ORIGINS", raw)?;
        }
        if let Some(raw) = non_empty(vars, "CORS_ORIGINS") {
            config.cors_origins = parse_origins("CORS_ORIGINS", raw)?;
        }
        if let Some(raw) = non_empty(vars, "DEADLINE_MS") {
            config.deadline_ms = raw.parse().map_err(|_| ConfigError::InvalidValue {
                var: "DEADLINE_MS".to_string(),
                value: raw.to_string(),
            })?;
        }
        if let Some(raw) = non_empty(vars, "SCORE_THRESHOLD") {
            config.score_threshold = raw.parse().map_err(|_| ConfigError::InvalidValue {
                var: "SCORE_THRESHOLD".to_string(),
                value: raw.to_string(),
            })?;
        }
        if let Some(raw) = non_empty(vars, "ENABLE_CACHE") {
            config.enable_cache = matches!(raw, "1" | "true" | "yes");
        }
        if let Some(raw) = non_empty(vars, "CACHE_TTL_SECONDS") {
            config.cache_ttl_seconds = raw.parse().map_err(|_| ConfigError::InvalidValue {
                var: "CACHE_TTL_SECONDS".to_string(),
                value: raw.to_string(),
            })?;
        }
        Ok(config)
    }
}

fn non_empty<'a>(vars: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    vars.get(key).map(String::as_str).map(str::trim).filter(|v| !v.is_empty())
}

fn parse_origins(var: &str, raw: &str) -> Result<Vec<Url>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let url = Url::parse(entry).map_err(|e| ConfigError::InvalidOrigin {
                var: var.to_string(),
                value: entry.to_string(),
                reason: e.to_string(),
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidOrigin {
                    var: var.to_string(),
                    value: entry.to_string(),
                    reason: format!("unsupported scheme `{}`", url.scheme()),
                });
            }
            Ok(url)
        })
        .collect()
}
