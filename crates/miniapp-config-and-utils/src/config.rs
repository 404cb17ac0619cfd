//! Configuration management for the mini-app client.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Default API base URL (can be overridden at compile time via MINIAPP_API_URL env var).
pub const DEFAULT_API_URL: &str = match option_env!("MINIAPP_API_URL") {
    Some(url) => url,
    None => "http://localhost:8000",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Main client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Base URL of the notes backend.
    pub api_url: String,
    /// How long identity resolution waits for a cross-origin message.
    pub identity_wait_timeout_ms: u64,
    /// How often the host SDK and cached payload are re-checked while waiting.
    pub identity_poll_interval_ms: u64,
    /// Debounce window after a save attempt settles.
    pub save_cooldown_ms: u64,
    /// Upper bound for a single save handler invocation.
    pub save_handler_timeout_ms: u64,
    /// Period of the backend health probe.
    pub health_check_interval_ms: u64,
    /// Prefix for usernames synthesized from host identity data.
    pub username_prefix: String,
    /// Route that hosts the note edit surface.
    pub edit_surface_route: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            identity_wait_timeout_ms: 5_000,
            identity_poll_interval_ms: 100,
            save_cooldown_ms: 200,
            save_handler_timeout_ms: 5_000,
            health_check_interval_ms: 5_000,
            username_prefix: "max".to_string(),
            edit_surface_route: "/notes".to_string(),
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file (defaults when absent), then
    /// apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        debug!(path = %paths.config_file().display(), "Config saved");
        Ok(())
    }

    fn load_from_env(&mut self) {
        if let Ok(log_level) = std::env::var("MINIAPP_LOG_LEVEL") {
            self.log_level = log_level;
        }
        if let Ok(api_url) = std::env::var("MINIAPP_API_URL") {
            if !api_url.trim().is_empty() {
                self.api_url = api_url.trim().to_string();
            }
        }
    }

    /// Reject configurations that would make the protocols misbehave.
    pub fn validate(&self) -> CoreResult<()> {
        self.api_url()?;
        if self.identity_poll_interval_ms == 0 {
            return Err(CoreError::Config(
                "identity_poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.health_check_interval_ms == 0 {
            return Err(CoreError::Config(
                "health_check_interval_ms must be greater than zero".to_string(),
            ));
        }
        if !self.edit_surface_route.starts_with('/') {
            return Err(CoreError::Config(format!(
                "edit_surface_route must start with '/': {}",
                self.edit_surface_route
            )));
        }
        Ok(())
    }

    /// Get the API base URL as a parsed URL.
    pub fn api_url(&self) -> CoreResult<Url> {
        Url::parse(&self.api_url).map_err(CoreError::from)
    }

    pub fn identity_wait_timeout(&self) -> Duration {
        Duration::from_millis(self.identity_wait_timeout_ms)
    }

    pub fn identity_poll_interval(&self) -> Duration {
        Duration::from_millis(self.identity_poll_interval_ms)
    }

    pub fn save_cooldown(&self) -> Duration {
        Duration::from_millis(self.save_cooldown_ms)
    }

    pub fn save_handler_timeout(&self) -> Duration {
        Duration::from_millis(self.save_handler_timeout_ms)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }
}
