//! Runtime configuration
//!
//! Settings are layered: defaults, then `Settings.toml` in the working
//! directory, then environment variable overrides. A `.env` file in the
//! working directory is loaded into the environment first.

use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthgateSettings {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub ui: UiSettings,
    #[serde(default)]
    pub poll: PollSettings,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Backend mediating the handshake
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    pub base_url: String,
}

/// Host serving the embedded authorization surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiSettings {
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSettings {
    /// Tick interval between result queries, in milliseconds
    pub interval_ms: u64,
    /// Overall wait budget for one handshake, in milliseconds
    pub max_wait_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Lifetime of a cached identity record, in milliseconds
    pub ttl_ms: u64,
    /// Store key holding the single identity record
    pub store_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
        }
    }
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080/ui".to_string(),
        }
    }
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval_ms: 800,
            max_wait_ms: 600_000, // 10 minutes
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_ms: 60_000,
            store_key: crate::cache::DEFAULT_STORE_KEY.to_string(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AuthgateSettings {
    /// Load settings from configuration files and environment variables
    ///
    /// Priority, highest to lowest:
    /// 1. Environment variables
    /// 2. `Settings.toml` in the current directory
    /// 3. Default settings
    ///
    /// # Errors
    ///
    /// Returns an error if `Settings.toml` exists but cannot be read or
    /// parsed.
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        Self::load_env_file();

        let mut settings = Self::load_base_settings()?;
        Self::apply_env_overrides(&mut settings);

        Ok(settings)
    }

    /// Initialize the `env_logger` backend from the logging settings
    ///
    /// `RUST_LOG` takes precedence when set. Safe to call more than once;
    /// repeat initialization is ignored.
    pub fn init_logging(&self) {
        let mut builder = env_logger::Builder::new();
        builder.parse_filters(&self.logging.level);
        if let Ok(spec) = std::env::var("RUST_LOG") {
            builder.parse_filters(&spec);
        }
        let _ = builder.try_init();
    }

    /// Load base settings from `Settings.toml` or use defaults
    fn load_base_settings() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = std::path::PathBuf::from("Settings.toml");
        if config_path.exists() {
            let toml_content = fs::read_to_string(&config_path)?;
            let settings = basic_toml::from_str(&toml_content)?;
            log::debug!("loaded base settings from {}", config_path.display());
            return Ok(settings);
        }
        Ok(Self::default())
    }

    /// Apply environment variable overrides to settings
    fn apply_env_overrides(settings: &mut Self) {
        if let Ok(base_url) = std::env::var("API_BASE_URL") {
            settings.api.base_url = base_url;
        }
        if let Ok(base_url) = std::env::var("UI_BASE_URL") {
            settings.ui.base_url = base_url;
        }
        Self::apply_numeric_env_override("POLL_INTERVAL_MS", &mut settings.poll.interval_ms);
        Self::apply_numeric_env_override("POLL_MAX_WAIT_MS", &mut settings.poll.max_wait_ms);
        Self::apply_numeric_env_override("CACHE_TTL_MS", &mut settings.cache.ttl_ms);
        if let Ok(store_key) = std::env::var("CACHE_STORE_KEY") {
            settings.cache.store_key = store_key;
        }
        if let Ok(log_level) = std::env::var("RUST_LOG") {
            settings.logging.level = log_level;
        }
    }

    /// Helper function to apply numeric environment variable overrides
    fn apply_numeric_env_override(env_var: &str, target: &mut u64) {
        if let Ok(value_str) = std::env::var(env_var) {
            if let Ok(value) = value_str.parse::<u64>() {
                *target = value;
            }
        }
    }

    /// Load environment variables from a `.env` file
    fn load_env_file() {
        if let Ok(contents) = fs::read_to_string(".env") {
            for line in contents.lines() {
                if let Some((key, value)) = line.split_once('=') {
                    std::env::set_var(key.trim(), value.trim());
                }
            }
        }
    }
}
