use std::path::{Path, PathBuf};

use chrono::FixedOffset;
use serde::Deserialize;

use crate::error::ConfigError;

/// Top-level configuration, loaded from a TOML file.
///
/// Every section has defaults so a partial file is valid; `validate()`
/// must pass before a cycle is constructed. The value is immutable once
/// built and handed to the orchestrator explicitly — there is no global
/// configuration state.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub alerts: AlertsConfig,
    pub remote: RemoteConfig,
    pub email: EmailConfig,
    pub database: DatabaseConfig,
    pub time: TimeConfig,
}

impl Config {
    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Pre-flight validation of everything except the policy switches,
    /// which `NewItemPolicy::resolve` owns.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.remote.endpoint.is_empty() {
            return Err(ConfigError::Invalid {
                field: "remote.endpoint",
                reason: "must be set".into(),
            });
        }
        self.display_offset()?;

        if self.alerts.alert_new || self.alerts.alert_reminder {
            for (field, value) in [
                ("email.address", &self.email.address),
                ("email.password", &self.email.password),
                ("email.host", &self.email.host),
            ] {
                if value.is_empty() {
                    return Err(ConfigError::Invalid {
                        field,
                        reason: "required when an alert kind is enabled".into(),
                    });
                }
            }
        }
        Ok(())
    }

    /// The display offset every remote timestamp is normalized to.
    pub fn display_offset(&self) -> Result<FixedOffset, ConfigError> {
        self.time
            .utc_offset
            .parse::<FixedOffset>()
            .map_err(|e| ConfigError::Invalid {
                field: "time.utc_offset",
                reason: e.to_string(),
            })
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AlertsConfig {
    /// Send an alert for items that are new this cycle.
    pub alert_new: bool,
    /// Trailing window, in minutes, for the time-window policy.
    pub new_time_window_minutes: u64,
    /// Policy switch: new = pinned within the trailing window.
    pub new_by_time_window: bool,
    /// Policy switch: new = pinned after the previous cycle's watermark.
    /// Mutually exclusive with `new_by_time_window`.
    pub new_by_last_update: bool,
    /// Send a periodic reminder alert with a random sample of the mirror.
    pub alert_reminder: bool,
    /// Maximum number of items in a reminder alert.
    pub reminder_limit: i64,
    /// Mention the channel name in alert intros.
    pub include_channel: bool,
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            alert_new: true,
            new_time_window_minutes: 60,
            new_by_time_window: true,
            new_by_last_update: false,
            alert_reminder: false,
            reminder_limit: 3,
            include_channel: false,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Snapshot endpoint returning the full pinned collection as JSON.
    pub endpoint: String,
    /// Optional bearer token for the endpoint.
    pub token: Option<String>,
    /// Channel display name, used when `alerts.include_channel` is set.
    pub channel: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// Used as both From and To.
    pub address: String,
    pub password: String,
    pub host: String,
    pub port: u16,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            address: String::new(),
            password: String::new(),
            host: String::new(),
            port: 465,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("pinwatch.db"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TimeConfig {
    /// Offset remote (UTC) timestamps are converted to, e.g. "+02:00".
    pub utc_offset: String,
    /// strftime format used for timestamps in alert bodies.
    pub time_format: String,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            utc_offset: "+00:00".to_string(),
            time_format: "%Y-%m-%d %H:%M".to_string(),
        }
    }
}
