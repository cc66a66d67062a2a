//! Engine configuration with JSON file persistence.
//!
//! Settings load from disk or fall back to defaults; every field has a
//! serde default so a partial config file stays valid across versions.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Configuration for the batch engine and its collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Master switch. When false the engine refuses all submissions.
    pub enabled: bool,

    /// When false the external service is never called; flagged fragments
    /// receive the deterministic local rewrite instead.
    pub auto_neutralize: bool,

    /// Items drained per batch; also the bound on in-flight parallelism.
    pub batch_size: usize,

    /// Delay between batches, in milliseconds.
    pub batch_delay_ms: u64,

    /// Timeout for one external service call, in seconds.
    pub request_timeout_secs: u64,

    /// Cache time-to-live, in hours.
    pub cache_ttl_hours: u64,

    /// Maximum live cache entries before oldest-inserted eviction.
    pub cache_capacity: usize,

    /// Model name passed to the external service.
    pub model: String,

    /// Sampling temperature for the external service.
    pub temperature: f32,

    /// Minimum accepted fragment length, in characters.
    pub min_fragment_chars: usize,

    /// Maximum accepted fragment length, in characters.
    pub max_fragment_chars: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_neutralize: true,
            batch_size: 3,
            batch_delay_ms: 600,
            request_timeout_secs: 30,
            cache_ttl_hours: 24,
            cache_capacity: 1000,
            model: "phi3:mini".into(),
            temperature: 0.3,
            min_fragment_chars: 10,
            max_fragment_chars: 5000,
        }
    }
}

impl EngineConfig {
    /// Default config file location (`<config dir>/unspin/config.json`).
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("unspin")
            .join("config.json")
    }

    /// Load from `path`, falling back to defaults when the file is missing
    /// or unparseable.
    pub fn load(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(_) => Self::default(),
            },
            Err(_) => Self::default(),
        }
    }

    /// Save as pretty-printed JSON, creating parent directories as needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(EngineError::ConfigInvalid {
                reason: "batch_size must be at least 1".into(),
            });
        }
        if self.cache_capacity == 0 {
            return Err(EngineError::ConfigInvalid {
                reason: "cache_capacity must be at least 1".into(),
            });
        }
        if self.min_fragment_chars >= self.max_fragment_chars {
            return Err(EngineError::ConfigInvalid {
                reason: "min_fragment_chars must be below max_fragment_chars".into(),
            });
        }
        Ok(())
    }

    /// Inter-batch delay as a [`Duration`].
    pub fn batch_delay(&self) -> Duration {
        Duration::from_millis(self.batch_delay_ms)
    }

    /// External request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Cache TTL as a [`Duration`].
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_hours * 3600)
    }
}
