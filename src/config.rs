//! Configuration module for the symbol index server.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `SYMDB_` and use double underscores
//! to separate nested levels:
//! - `SYMDB_INDEX__THREADS=8` sets `index.threads`
//! - `SYMDB_INDEX__ON_CHANGE=true` sets `index.on_change`
//! - `SYMDB_DIAGNOSTICS__ON_CHANGE=-1` sets `diagnostics.on_change`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

const CONFIG_DIR: &str = ".symdb";
const CONFIG_FILE: &str = "settings.toml";
const ENV_PREFIX: &str = "SYMDB_";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Workspace root directory (where .symdb is located)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub workspace_root: Option<PathBuf>,

    /// Indexing pipeline settings
    #[serde(default)]
    pub index: IndexConfig,

    /// Diagnostics engine scheduling
    #[serde(default)]
    pub diagnostics: DiagnosticsConfig,

    /// Index cache settings
    #[serde(default)]
    pub cache: CacheConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct IndexConfig {
    /// Number of extraction workers (0 = number of CPUs)
    #[serde(default)]
    pub threads: usize,

    /// Re-index on every buffer change. Off by default: it is the most
    /// frequent and most wasteful trigger.
    #[serde(default = "default_false")]
    pub on_change: bool,

    /// Index headers on open even while other index work is pending
    #[serde(default = "default_false")]
    pub index_headers_on_open: bool,
}

/// Debounce delays (ms) passed to the diagnostics engine. Negative disables.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DiagnosticsConfig {
    #[serde(default = "default_diagnostics_on_change")]
    pub on_change: i64,

    #[serde(default)]
    pub on_open: i64,

    #[serde(default)]
    pub on_save: i64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    /// Directory for the on-disk cache. In-memory only when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub directory: Option<PathBuf>,

    /// Keep a copy of every cached entry in memory as well
    #[serde(default = "default_true")]
    pub retain_in_memory: bool,

    /// `from>to` rewrites applied to paths before they become cache keys
    #[serde(default)]
    pub path_mappings: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Default level for all targets
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides (e.g. `pipeline = "debug"`)
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 {
    1
}
fn default_true() -> bool {
    true
}
fn default_false() -> bool {
    false
}
fn default_diagnostics_on_change() -> i64 {
    1000
}
fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            workspace_root: None,
            index: IndexConfig::default(),
            diagnostics: DiagnosticsConfig::default(),
            cache: CacheConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            threads: 0,
            on_change: false,
            index_headers_on_open: false,
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            on_change: default_diagnostics_on_change(),
            on_open: 0,
            on_save: 0,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            directory: None,
            retain_in_memory: true,
            path_mappings: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl CacheConfig {
    /// Apply `from>to` path mappings in order.
    ///
    /// Every mapping whose `from` part occurs in the path rewrites its first
    /// occurrence. Entries without a `>` are ignored.
    pub fn apply_path_mappings(&self, path: &str) -> String {
        let mut mapped = path.to_string();
        for mapping in &self.path_mappings {
            let Some((from, to)) = mapping.split_once('>') else {
                continue;
            };
            if from.is_empty() {
                continue;
            }
            if let Some(pos) = mapped.find(from) {
                mapped.replace_range(pos..pos + from.len(), to);
            }
        }
        mapped
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        // Try to find the workspace root by looking for .symdb directory
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));

        Self::figment(&config_path)
            .extract()
            .map_err(Box::new)
            .map(|mut settings: Settings| {
                // If workspace_root is not set in config, detect it
                if settings.workspace_root.is_none() {
                    settings.workspace_root = Self::workspace_root();
                }
                settings
            })
    }

    /// Load configuration from a specific file
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(path.as_ref()).extract().map_err(Box::new)
    }

    fn figment(config_path: &Path) -> Figment {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(config_path))
            // Double underscore separates nested levels, single underscore
            // stays within field names
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str()
                    .to_lowercase()
                    .replace("__", ".")
                    .into()
            }))
    }

    /// Find the workspace config by looking for .symdb directory
    /// Searches from current directory up to root
    fn find_workspace_config() -> Option<PathBuf> {
        Self::workspace_root().map(|root| root.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Get the workspace root directory (where .symdb is located)
    pub fn workspace_root() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .find(|ancestor| ancestor.join(CONFIG_DIR).is_dir())
            .map(Path::to_path_buf)
    }

    /// Number of extraction workers to spawn.
    pub fn worker_threads(&self) -> usize {
        if self.index.threads == 0 {
            num_cpus::get().max(1)
        } else {
            self.index.threads
        }
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        std::fs::create_dir_all(parent)?;

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file in the current directory
    pub fn init_config_file(force: bool) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = PathBuf::from(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        let mut settings = Settings::default();
        if let Ok(current_dir) = std::env::current_dir() {
            settings.workspace_root = Some(current_dir);
        }

        settings.save(&config_path)?;
        Ok(config_path)
    }
}
