//! Runtime configuration: an optional TOML file, then CLI overrides.
//!
//! ```toml
//! models = ["GPT-4", "Claude-3", "Gemini-Pro"]
//! latency_min_ms = 1000
//! latency_max_ms = 3000
//! task_timeout_ms = 30000
//! backend = "sqlite"
//! data_dir = "/var/lib/multi-llm-chat"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ChatError, Result};
use crate::providers::{default_models, Latency};
use crate::store::StoreBackend;

pub const CONFIG_FILE_NAME: &str = "config.toml";
const APP_DIR_NAME: &str = "multi-llm-chat";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub models: Vec<String>,
    pub latency_min_ms: u64,
    pub latency_max_ms: u64,
    pub task_timeout_ms: u64,
    pub backend: StoreBackend,
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            models: default_models(),
            latency_min_ms: 1000,
            latency_max_ms: 3000,
            task_timeout_ms: 30_000,
            backend: StoreBackend::File,
            data_dir: None,
        }
    }
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path`; a missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(s) => Self::from_toml_str(&s),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.models.iter().any(|m| m.trim().is_empty()) {
            return Err(ChatError::Config("model names must not be blank".to_string()));
        }
        if self.latency_max_ms < self.latency_min_ms {
            return Err(ChatError::Config(format!(
                "latency_max_ms ({}) is below latency_min_ms ({})",
                self.latency_max_ms, self.latency_min_ms
            )));
        }
        if self.task_timeout_ms == 0 {
            return Err(ChatError::Config("task_timeout_ms must be positive".to_string()));
        }
        Ok(())
    }

    pub fn latency(&self) -> Latency {
        Latency::from_millis(self.latency_min_ms, self.latency_max_ms)
    }

    pub fn task_timeout(&self) -> Duration {
        Duration::from_millis(self.task_timeout_ms)
    }

    /// Configured data dir, else the per-user data dir, else `./.multi-llm-chat`.
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(default_data_dir)
    }
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(format!(".{APP_DIR_NAME}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = Config::default();
        assert_eq!(c.models, vec!["GPT-4", "Claude-3", "Gemini-Pro"]);
        assert_eq!(c.latency(), Latency::default());
        assert_eq!(c.task_timeout(), Duration::from_secs(30));
        assert_eq!(c.backend, StoreBackend::File);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let c = Config::from_toml_str("backend = \"sqlite\"\nlatency_max_ms = 1500").unwrap();
        assert_eq!(c.backend, StoreBackend::Sqlite);
        assert_eq!(c.latency_max_ms, 1500);
        assert_eq!(c.latency_min_ms, 1000);
        assert_eq!(c.models.len(), 3);
    }

    #[test]
    fn test_inverted_latency_rejected() {
        let err = Config::from_toml_str("latency_min_ms = 500\nlatency_max_ms = 100").unwrap_err();
        assert!(matches!(err, ChatError::Config(_)));
    }

    #[test]
    fn test_blank_model_rejected() {
        assert!(Config::from_toml_str("models = [\"GPT-4\", \" \"]").is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        assert!(Config::from_toml_str("task_timeout_ms = 0").is_err());
    }

    #[test]
    fn test_unknown_backend_is_config_error() {
        let err = Config::from_toml_str("backend = \"redis\"").unwrap_err();
        assert!(matches!(err, ChatError::Config(_)));
    }

    #[test]
    fn test_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let c = Config::load(&dir.path().join(CONFIG_FILE_NAME)).unwrap();
        assert_eq!(c, Config::default());
    }

    #[test]
    fn test_explicit_data_dir_wins() {
        let c = Config {
            data_dir: Some(PathBuf::from("/tmp/chat")),
            ..Config::default()
        };
        assert_eq!(c.resolved_data_dir(), PathBuf::from("/tmp/chat"));
    }
}
