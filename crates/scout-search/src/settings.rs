//! Runtime settings loader.
//!
//! Loads and merges two YAML files:
//! - System defaults: `conf/settings.yaml` under the deployment root
//! - User overrides:  `$SCOUT_CONFIG_HOME/tool-scout/settings.yaml`
//!
//! Merge precedence is user over system. Missing or unparsable files degrade
//! to defaults with a warning; they never fail startup (startup failures are
//! reserved for the env config in [`crate::config`]).

use std::path::{Path, PathBuf};

use serde::Deserialize;

const DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH: &str = "conf/settings.yaml";
const DEFAULT_USER_SETTINGS_RELATIVE_PATH: &str = "tool-scout/settings.yaml";

/// Merged runtime settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeSettings {
    /// Planning/extraction LLM endpoint.
    #[serde(default)]
    pub llm: LlmSettings,
    /// Embedding service endpoint.
    #[serde(default)]
    pub embedding: EmbeddingSettings,
    /// Vector store endpoint.
    #[serde(default)]
    pub vector_store: StoreSettings,
    /// Structured store endpoint.
    #[serde(default)]
    pub structured_store: StoreSettings,
    /// Executor budgets.
    #[serde(default)]
    pub executor: ExecutorSettings,
    /// Result cache.
    #[serde(default)]
    pub cache: CacheSettings,
}

/// LLM connection settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LlmSettings {
    /// Chat-completions URL.
    pub url: Option<String>,
    /// Model identifier.
    pub model: Option<String>,
    /// Name of the env var holding the API key.
    pub api_key_env: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

/// Embedding service settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmbeddingSettings {
    /// Service base URL.
    pub url: Option<String>,
    /// Embedding model hint.
    pub model: Option<String>,
    /// Expected vector dimension.
    pub dimension: Option<usize>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

/// Generic store endpoint settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreSettings {
    /// Store base URL.
    pub url: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
}

/// Executor budget settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExecutorSettings {
    /// Soft deadline per vector source, seconds.
    pub vector_timeout_secs: Option<u64>,
    /// Soft deadline for the structured source, seconds.
    pub structured_timeout_secs: Option<u64>,
    /// Fixed score assigned to structured results.
    pub structured_score: Option<f64>,
}

/// Result cache settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CacheSettings {
    /// Enable the in-process cache.
    pub enabled: Option<bool>,
    /// Entry TTL in seconds.
    pub ttl_secs: Option<u64>,
    /// Maximum entry count.
    pub max_size: Option<usize>,
}

impl RuntimeSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            llm: self.llm.merge(overlay.llm),
            embedding: self.embedding.merge(overlay.embedding),
            vector_store: self.vector_store.merge(overlay.vector_store),
            structured_store: self.structured_store.merge(overlay.structured_store),
            executor: self.executor.merge(overlay.executor),
            cache: self.cache.merge(overlay.cache),
        }
    }
}

impl LlmSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            url: overlay.url.or(self.url),
            model: overlay.model.or(self.model),
            api_key_env: overlay.api_key_env.or(self.api_key_env),
            timeout_secs: overlay.timeout_secs.or(self.timeout_secs),
        }
    }
}

impl EmbeddingSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            url: overlay.url.or(self.url),
            model: overlay.model.or(self.model),
            dimension: overlay.dimension.or(self.dimension),
            timeout_secs: overlay.timeout_secs.or(self.timeout_secs),
        }
    }
}

impl StoreSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            url: overlay.url.or(self.url),
            timeout_secs: overlay.timeout_secs.or(self.timeout_secs),
        }
    }
}

impl ExecutorSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            vector_timeout_secs: overlay.vector_timeout_secs.or(self.vector_timeout_secs),
            structured_timeout_secs: overlay
                .structured_timeout_secs
                .or(self.structured_timeout_secs),
            structured_score: overlay.structured_score.or(self.structured_score),
        }
    }
}

impl CacheSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            enabled: overlay.enabled.or(self.enabled),
            ttl_secs: overlay.ttl_secs.or(self.ttl_secs),
            max_size: overlay.max_size.or(self.max_size),
        }
    }
}

/// Load merged runtime settings from the default locations.
#[must_use]
pub fn load_runtime_settings() -> RuntimeSettings {
    let root = deployment_root();
    let system = root.join(DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH);
    let user = config_home(&root).join(DEFAULT_USER_SETTINGS_RELATIVE_PATH);
    load_runtime_settings_from_paths(&system, &user)
}

/// Load merged runtime settings from explicit paths (user overrides system).
#[must_use]
pub fn load_runtime_settings_from_paths(system: &Path, user: &Path) -> RuntimeSettings {
    load_one(system).merge(load_one(user))
}

fn load_one(path: &Path) -> RuntimeSettings {
    if !path.exists() {
        return RuntimeSettings::default();
    }
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "failed to read settings file; ignoring"
            );
            return RuntimeSettings::default();
        }
    };
    match serde_yaml::from_str::<RuntimeSettings>(&raw) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "failed to parse settings yaml; ignoring file"
            );
            RuntimeSettings::default()
        }
    }
}

fn deployment_root() -> PathBuf {
    std::env::var("SCOUT_ROOT")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

fn config_home(root: &Path) -> PathBuf {
    let configured = std::env::var("SCOUT_CONFIG_HOME")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| ".config".to_string());
    let path = PathBuf::from(configured);
    if path.is_absolute() { path } else { root.join(path) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn user_settings_override_system() {
        let dir = tempfile::tempdir().unwrap();
        let system = write_file(
            dir.path(),
            "system.yaml",
            "llm:\n  url: http://llm.internal/v1/chat/completions\n  model: base\nexecutor:\n  vector_timeout_secs: 5\n",
        );
        let user = write_file(dir.path(), "user.yaml", "llm:\n  model: tuned\n");
        let settings = load_runtime_settings_from_paths(&system, &user);
        assert_eq!(settings.llm.model.as_deref(), Some("tuned"));
        assert_eq!(
            settings.llm.url.as_deref(),
            Some("http://llm.internal/v1/chat/completions")
        );
        assert_eq!(settings.executor.vector_timeout_secs, Some(5));
    }

    #[test]
    fn missing_files_degrade_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_runtime_settings_from_paths(
            &dir.path().join("nope.yaml"),
            &dir.path().join("also-nope.yaml"),
        );
        assert!(settings.llm.url.is_none());
    }

    #[test]
    fn unparsable_yaml_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let system = write_file(dir.path(), "bad.yaml", "llm: [not: a: mapping\n");
        let user = write_file(dir.path(), "user.yaml", "cache:\n  enabled: true\n");
        let settings = load_runtime_settings_from_paths(&system, &user);
        assert_eq!(settings.cache.enabled, Some(true));
        assert!(settings.llm.model.is_none());
    }
}
