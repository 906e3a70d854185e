//! Client configuration.
//!
//! Read from `<config_dir>/comply/config.toml`. Every field has a default,
//! so a missing file or a partial file is fine.
//!
//! ```toml
//! [timeouts]
//! command_secs = 60
//!
//! [retry]
//! max_retries = 3
//!
//! [profile]
//! host = "localhost:8080"
//! auth = { type = "bearer", token = "..." }
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::AuthConfig;
use crate::error::{ConsoleError, Result};
use crate::retry::RetryPolicy;

const APP_DIR: &str = "comply";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub timeouts: TimeoutConfig,
    pub retry: RetryConfig,
    pub render: RenderConfig,
    pub history: HistoryConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<Profile>,
}

/// Per-endpoint request deadlines, in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub handshake_secs: u64,
    pub command_secs: u64,
    pub suggest_secs: u64,
    pub progress_secs: u64,
    pub cancel_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            handshake_secs: 15,
            command_secs: 30,
            suggest_secs: 5,
            progress_secs: 5,
            cancel_secs: 10,
        }
    }
}

impl TimeoutConfig {
    pub fn handshake(&self) -> Duration {
        Duration::from_secs(self.handshake_secs)
    }

    pub fn command(&self) -> Duration {
        Duration::from_secs(self.command_secs)
    }

    /// Suggestions must never block the user for long.
    pub fn suggest(&self) -> Duration {
        Duration::from_secs(self.suggest_secs.min(5))
    }

    pub fn progress(&self) -> Duration {
        Duration::from_secs(self.progress_secs)
    }

    pub fn cancel(&self) -> Duration {
        Duration::from_secs(self.cancel_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub network_base_delay_ms: u64,
    pub server_busy_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_retries: policy.max_retries,
            network_base_delay_ms: policy.network_base_delay.as_millis() as u64,
            server_busy_delay_ms: policy.server_busy_delay.as_millis() as u64,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            network_base_delay: Duration::from_millis(self.network_base_delay_ms),
            server_busy_delay: Duration::from_millis(self.server_busy_delay_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub max_table_rows: usize,
    pub line_numbers: bool,
    pub separator_width: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            max_table_rows: 20,
            line_numbers: true,
            separator_width: 60,
        }
    }
}

/// Undo history of the collapsible sections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    pub enabled: bool,
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: 50,
        }
    }
}

/// Where to connect and with which credentials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub host: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,
}

impl Profile {
    /// Builds a profile from `COMPLY_HOST` and (optionally) `COMPLY_TOKEN`.
    pub fn from_env() -> Option<Self> {
        let host = env::var("COMPLY_HOST").ok().filter(|h| !h.is_empty())?;
        let auth = env::var("COMPLY_TOKEN")
            .ok()
            .filter(|t| !t.is_empty())
            .map(AuthConfig::bearer);
        Some(Self { host, auth })
    }
}

impl ClientConfig {
    /// Returns the default config file path: `<config_dir>/comply/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        let dir = dirs::config_dir()
            .ok_or_else(|| ConsoleError::config("Could not determine config directory"))?;
        Ok(dir.join(APP_DIR).join(CONFIG_FILE))
    }

    /// Loads the config from the default location, falling back to defaults.
    pub fn load_default() -> Result<Self> {
        Self::load(&Self::default_path()?)
    }

    /// Loads the config from `path`. A missing or empty file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|e| {
            ConsoleError::config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        Self::from_toml(&content)
            .map_err(|e| ConsoleError::config(format!("{} ({})", e, path.display())))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ConsoleError::config(format!("Failed to parse config: {e}")))
    }

    /// The configured profile, or one built from the environment.
    pub fn resolve_profile(&self) -> Option<Profile> {
        self.profile.clone().or_else(Profile::from_env)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthType;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.timeouts.handshake(), Duration::from_secs(15));
        assert_eq!(config.timeouts.command(), Duration::from_secs(30));
        assert_eq!(config.timeouts.suggest(), Duration::from_secs(5));
        assert_eq!(config.retry.policy(), RetryPolicy::default());
        assert_eq!(config.history.capacity, 50);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = ClientConfig::from_toml(
            r#"
            [timeouts]
            command_secs = 60

            [render]
            max_table_rows = 5

            [profile]
            host = "localhost:9000"
            auth = { type = "bearer", token = "abc" }
            "#,
        )
        .unwrap();

        assert_eq!(config.timeouts.command_secs, 60);
        assert_eq!(config.timeouts.handshake_secs, 15);
        assert_eq!(config.render.max_table_rows, 5);
        assert!(config.render.line_numbers);

        let profile = config.profile.unwrap();
        assert_eq!(profile.host, "localhost:9000");
        assert_eq!(profile.auth.unwrap().auth_type, AuthType::Bearer);
    }

    #[test]
    fn test_suggest_timeout_is_capped() {
        let timeouts = TimeoutConfig {
            suggest_secs: 30,
            ..TimeoutConfig::default()
        };
        assert_eq!(timeouts.suggest(), Duration::from_secs(5));
    }

    #[test]
    fn test_load_missing_and_invalid_files() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        assert_eq!(ClientConfig::load(&path).unwrap(), ClientConfig::default());

        fs::write(&path, "[retry\nmax_retries = ").unwrap();
        let err = ClientConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConsoleError::Config(_)));

        fs::write(&path, "[retry]\nmax_retries = 4\n").unwrap();
        assert_eq!(ClientConfig::load(&path).unwrap().retry.max_retries, 4);
    }
}
