//! Configuration management with layered hierarchy

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Backend used when nothing else is configured
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CACHE_MAX_AGE_SECS: u64 = 300;
const CACHE_FILE: &str = "queries.db";

/// Fieldbook configuration with layered hierarchy
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// Base URL of the records backend
    pub api_url: Option<String>,

    /// Per-request timeout
    pub timeout_secs: Option<u64>,

    /// Query cache settings
    pub cache: CacheConfig,

    /// Default output format
    pub default_format: Option<String>,
}

/// Query cache settings
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: Option<bool>,

    /// Entries older than this are refetched
    pub max_age_secs: Option<u64>,
}

impl Config {
    /// Load configuration from all sources, merging in priority order
    pub fn load() -> Self {
        let mut config = Config::default();

        // 1. Built-in defaults (applied by the accessors)

        // 2. Global user config (~/.config/fieldbook/config.yaml)
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                match std::fs::read_to_string(&global_path) {
                    Ok(contents) => match Self::from_yaml(&contents) {
                        Ok(global) => config.merge(global),
                        Err(e) => log::warn!("Ignoring {}: {}", global_path.display(), e),
                    },
                    Err(e) => log::warn!("Cannot read {}: {}", global_path.display(), e),
                }
            }
        }

        // 3. Environment variables
        if let Ok(url) = std::env::var("FIELDBOOK_API_URL") {
            if !url.trim().is_empty() {
                config.api_url = Some(url);
            }
        }
        if let Ok(timeout) = std::env::var("FIELDBOOK_TIMEOUT") {
            match timeout.trim().parse::<u64>() {
                Ok(secs) => config.timeout_secs = Some(secs),
                Err(_) => log::warn!("Ignoring FIELDBOOK_TIMEOUT={}: not a number", timeout),
            }
        }

        config
    }

    /// Parse a config document
    pub fn from_yaml(contents: &str) -> Result<Self, serde_yml::Error> {
        serde_yml::from_str(contents)
    }

    /// Apply command-line overrides (highest precedence)
    pub fn apply_flags(&mut self, api_url: Option<&str>, no_cache: bool) {
        if let Some(url) = api_url {
            self.api_url = Some(url.to_string());
        }
        if no_cache {
            self.cache.enabled = Some(false);
        }
    }

    /// Get the path to the global config file
    ///
    /// `FIELDBOOK_CONFIG_DIR` replaces the platform config directory.
    pub fn global_config_path() -> Option<PathBuf> {
        if let Ok(dir) = std::env::var("FIELDBOOK_CONFIG_DIR") {
            return Some(PathBuf::from(dir).join("config.yaml"));
        }
        directories::ProjectDirs::from("", "", "fieldbook")
            .map(|dirs| dirs.config_dir().join("config.yaml"))
    }

    /// Get the path to the query cache database
    ///
    /// `FIELDBOOK_CACHE_DIR` replaces the platform cache directory.
    pub fn cache_path() -> Option<PathBuf> {
        if let Ok(dir) = std::env::var("FIELDBOOK_CACHE_DIR") {
            return Some(PathBuf::from(dir).join(CACHE_FILE));
        }
        directories::ProjectDirs::from("", "", "fieldbook")
            .map(|dirs| dirs.cache_dir().join(CACHE_FILE))
    }

    /// Merge another config into this one (other takes precedence)
    fn merge(&mut self, other: Config) {
        if other.api_url.is_some() {
            self.api_url = other.api_url;
        }
        if other.timeout_secs.is_some() {
            self.timeout_secs = other.timeout_secs;
        }
        if other.cache.enabled.is_some() {
            self.cache.enabled = other.cache.enabled;
        }
        if other.cache.max_age_secs.is_some() {
            self.cache.max_age_secs = other.cache.max_age_secs;
        }
        if other.default_format.is_some() {
            self.default_format = other.default_format;
        }
    }

    pub fn api_url(&self) -> &str {
        self.api_url
            .as_deref()
            .filter(|url| !url.trim().is_empty())
            .unwrap_or(DEFAULT_API_URL)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.enabled.unwrap_or(true)
    }

    pub fn cache_max_age(&self) -> Duration {
        Duration::from_secs(
            self.cache
                .max_age_secs
                .unwrap_or(DEFAULT_CACHE_MAX_AGE_SECS),
        )
    }

    /// The configuration with every default filled in, for display
    pub fn effective(&self) -> Config {
        Config {
            api_url: Some(self.api_url().to_string()),
            timeout_secs: Some(self.timeout().as_secs()),
            cache: CacheConfig {
                enabled: Some(self.cache_enabled()),
                max_age_secs: Some(self.cache_max_age().as_secs()),
            },
            default_format: Some(
                self.default_format
                    .clone()
                    .unwrap_or_else(|| "auto".to_string()),
            ),
        }
    }
}
