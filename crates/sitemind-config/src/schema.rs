//! Configuration schema definitions.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Store path that selects an ephemeral in-memory database.
pub const MEMORY_STORE_PATH: &str = ":memory:";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Knowledge store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Database file, or `:memory:`.
    #[serde(default = "default_store_path")]
    pub path: String,

    /// Seconds a cached page model stays fresh after its last write.
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            cache_ttl_secs: default_cache_ttl_secs(),
        }
    }
}

impl StoreConfig {
    pub fn is_memory(&self) -> bool {
        self.path.trim() == MEMORY_STORE_PATH
    }

    /// Database path with `~` expanded; `None` for an in-memory store.
    pub fn resolved_path(&self) -> Option<PathBuf> {
        if self.is_memory() {
            return None;
        }
        Some(PathBuf::from(shellexpand::tilde(self.path.trim()).as_ref()))
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

fn default_store_path() -> String {
    "~/.sitemind/knowledge.db".to_string()
}

fn default_cache_ttl_secs() -> u64 {
    1800
}

/// Task executor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Wait after an action before re-reading the page.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    #[serde(default = "default_max_parallel_tasks")]
    pub max_parallel_tasks: usize,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            max_parallel_tasks: default_max_parallel_tasks(),
        }
    }
}

impl ExecutorConfig {
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

fn default_settle_delay_ms() -> u64 {
    1000
}

fn default_max_parallel_tasks() -> usize {
    5
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter level when `RUST_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily-rotated log files. Console only when unset.
    #[serde(default)]
    pub directory: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: None,
        }
    }
}

impl LoggingConfig {
    pub fn resolved_directory(&self) -> Option<PathBuf> {
        self.directory
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(|d| PathBuf::from(shellexpand::tilde(d).as_ref()))
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
