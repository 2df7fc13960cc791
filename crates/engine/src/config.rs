// Engine configuration file.
//
// Global config: `~/.redraft/config.toml`
// Default snapshot location: `~/.redraft/data/` (or `~/.redraft/store.db`)

use chrono::Duration;
use redraft_common::patch::DEFAULT_SUGGESTION_THRESHOLD;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::lock::{LEASE_SECONDS, SWEEP_INTERVAL_MS};
use crate::security::{ensure_owner_only_dir, ensure_owner_only_file};
use crate::store::{StoreLimits, DEBOUNCE_MS, IDLE_TIMEOUT_MINUTES, MAX_DOCUMENTS, MAX_REVISIONS};

/// Root directory for redraft state: `~/.redraft/`.
pub fn global_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(".redraft"))
}

/// Path to the config file: `~/.redraft/config.toml`.
pub fn global_config_path() -> Option<PathBuf> {
    global_dir().map(|d| d.join("config.toml"))
}

/// Whole-engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub store: StoreConfig,
    pub locks: LockConfig,
    pub patch: PatchConfig,
    pub storage: StorageConfig,
}

impl EngineConfig {
    /// Load from `~/.redraft/config.toml`. Returns defaults if the file
    /// doesn't exist or can't be parsed.
    pub fn load() -> Self {
        global_config_path().and_then(|p| Self::load_from(&p).ok()).unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        toml::from_str(&contents).map_err(ConfigError::Parse)
    }

    /// Save to `~/.redraft/config.toml`.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = global_config_path().ok_or_else(|| {
            ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "could not determine home directory",
            ))
        })?;
        self.save_to(&path)
    }

    /// Save to a specific path (creates parent directories).
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigError::Io)?;
            ensure_owner_only_dir(parent)
                .map_err(|error| ConfigError::Io(std::io::Error::other(error.to_string())))?;
        }
        let contents = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        std::fs::write(path, contents).map_err(ConfigError::Io).and_then(|_| {
            ensure_owner_only_file(path)
                .map_err(|error| ConfigError::Io(std::io::Error::other(error.to_string())))
        })
    }

    /// Storage location: the configured path, else the backend's default
    /// under `~/.redraft/`.
    pub fn storage_path(&self) -> Option<PathBuf> {
        self.storage
            .path
            .clone()
            .or_else(|| global_dir().map(|dir| dir.join(self.storage.backend.default_location())))
    }
}

/// Registry limits and history timing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct StoreConfig {
    pub max_documents: usize,
    pub max_revisions: usize,
    /// Edits closer together than this merge into one revision.
    pub debounce_ms: u64,
    /// Non-active documents untouched this long may be evicted.
    pub idle_timeout_sec: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_documents: MAX_DOCUMENTS,
            max_revisions: MAX_REVISIONS,
            debounce_ms: DEBOUNCE_MS as u64,
            idle_timeout_sec: (IDLE_TIMEOUT_MINUTES * 60) as u64,
        }
    }
}

impl StoreConfig {
    pub fn limits(&self) -> StoreLimits {
        StoreLimits {
            max_documents: self.max_documents.max(1),
            max_revisions: self.max_revisions.max(1),
            debounce: duration_ms(self.debounce_ms),
            idle_timeout: duration_ms(self.idle_timeout_sec.saturating_mul(1_000)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LockConfig {
    pub lease_sec: u64,
    /// How often the background sweeper looks for expired locks.
    pub sweep_interval_ms: u64,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self { lease_sec: LEASE_SECONDS as u64, sweep_interval_ms: SWEEP_INTERVAL_MS }
    }
}

impl LockConfig {
    pub fn lease(&self) -> Duration {
        duration_ms(self.lease_sec.saturating_mul(1_000))
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.sweep_interval_ms.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PatchConfig {
    /// Minimum similarity for a not-found suggestion (0.0..=1.0).
    pub suggestion_threshold: f64,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self { suggestion_threshold: DEFAULT_SUGGESTION_THRESHOLD }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// A directory with one file per key, written atomically.
    #[default]
    File,
    /// A SQLite key-value table.
    Sqlite,
}

impl StorageBackend {
    pub fn default_location(self) -> &'static str {
        match self {
            Self::File => "data",
            Self::Sqlite => "store.db",
        }
    }
}

// Far above any sane setting and well inside chrono's range.
const MAX_DURATION_MS: u64 = (i64::MAX / 1_000_000) as u64;

fn duration_ms(ms: u64) -> Duration {
    Duration::milliseconds(ms.min(MAX_DURATION_MS) as i64)
}

// ── Errors ─────────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Serialize(toml::ser::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "config I/O error: {e}"),
            Self::Parse(e) => write!(f, "config parse error: {e}"),
            Self::Serialize(e) => write!(f, "config serialize error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
