use log::{error, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::notify::Permission;
use crate::utils;

/// Current configuration version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

/// Longest accepted reminder lead, one year
pub const MAX_LEAD_MINUTES: i64 = 366 * 24 * 60;

/// Upper bound for the sweep interval and the alert display window, one week
pub const MAX_INTERVAL_SECS: u64 = 7 * 24 * 60 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub reminders: ReminderSettings,
    #[serde(default)]
    pub notifications: NotificationSettings,
    #[serde(default = "default_config_version")]
    pub config_version: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderSettings {
    /// Alerts to raise ahead of each reminder instant
    #[serde(default = "default_offsets")]
    pub offsets: Vec<ReminderOffset>,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    /// How long an alert stays up before it is dismissed automatically
    #[serde(default = "default_display_secs")]
    pub display_secs: u64,
    #[serde(default = "default_icon", skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderOffset {
    /// Label carried by every trigger armed for this offset
    pub kind: String,
    pub lead_minutes: i64,
    /// Alert title reads "<title_prefix> lagi: <entity title>"
    pub title_prefix: String,
    /// Alert body reads "<body_prefix>: <entity title>" followed by the summary
    pub body_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSettings {
    #[serde(default = "default_permission")]
    pub permission: Permission,
    #[serde(default = "default_bell")]
    pub bell: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            reminders: ReminderSettings::default(),
            notifications: NotificationSettings::default(),
            config_version: Some(CURRENT_CONFIG_VERSION),
        }
    }
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            offsets: default_offsets(),
            sweep_interval_secs: default_sweep_interval_secs(),
            display_secs: default_display_secs(),
            icon: default_icon(),
        }
    }
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            permission: default_permission(),
            bell: default_bell(),
        }
    }
}

impl ReminderSettings {
    /// Never zero, so a periodic sweep always moves forward in time
    pub fn sweep_interval_ms(&self) -> i64 {
        (self.sweep_interval_secs.clamp(1, MAX_INTERVAL_SECS) as i64) * 1000
    }

    pub fn display_ms(&self) -> i64 {
        (self.display_secs.min(MAX_INTERVAL_SECS) as i64) * 1000
    }
}

impl ReminderOffset {
    pub fn new(kind: &str, lead_minutes: i64, title_prefix: &str, body_prefix: &str) -> Self {
        Self {
            kind: kind.to_string(),
            lead_minutes,
            title_prefix: title_prefix.to_string(),
            body_prefix: body_prefix.to_string(),
        }
    }

    pub fn lead_ms(&self) -> i64 {
        self.lead_minutes.clamp(0, MAX_LEAD_MINUTES) * 60_000
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_offsets() -> Vec<ReminderOffset> {
    vec![
        ReminderOffset::new("1-hour-before", 60, "1 jam", "Deadline"),
        ReminderOffset::new("5-min-before", 5, "5 menit", "Segera deadline"),
    ]
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_display_secs() -> u64 {
    30
}

fn default_icon() -> Option<String> {
    None
}

fn default_permission() -> Permission {
    Permission::Default
}

fn default_bell() -> bool {
    true
}

fn default_config_version() -> Option<u32> {
    Some(CURRENT_CONFIG_VERSION)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config directory: {0}")]
    ConfigDirError(String),
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
    #[error("Invalid reminder offset '{0}': lead must be between one minute and one year")]
    InvalidOffset(String),
    #[error("Duplicate reminder offset kind: {0}")]
    DuplicateOffset(String),
    #[error("Sweep interval must be between one second and one week")]
    InvalidSweepInterval,
    #[error("Display window must be at most one week")]
    InvalidDisplayWindow,
}

impl Config {
    /// Load configuration from file, or create default if missing
    /// Uses the provided profile to determine the config path
    pub fn load_with_profile(profile: utils::Profile) -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path(profile)?;
        Self::load_from_path(&config_path)
    }

    /// Load configuration from an explicit path, writing defaults there if missing
    pub fn load_from_path(config_path: &Path) -> Result<Self, ConfigError> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path)
                .map_err(|e| ConfigError::ReadError(e.to_string()))?;
            Self::from_toml(&contents)
        } else {
            let mut config = Config::default();
            if let Err(e) = config.save_to_path(config_path) {
                error!("Failed to save config file {:?}: {}", config_path, e);
                return Err(e);
            }
            info!("Created default config at {:?}", config_path);
            Ok(config)
        }
    }

    /// Parse and validate configuration text
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen: Vec<&str> = Vec::new();
        for offset in &self.reminders.offsets {
            if !(1..=MAX_LEAD_MINUTES).contains(&offset.lead_minutes) {
                return Err(ConfigError::InvalidOffset(offset.kind.clone()));
            }
            if seen.contains(&offset.kind.as_str()) {
                return Err(ConfigError::DuplicateOffset(offset.kind.clone()));
            }
            seen.push(&offset.kind);
        }
        if !(1..=MAX_INTERVAL_SECS).contains(&self.reminders.sweep_interval_secs) {
            return Err(ConfigError::InvalidSweepInterval);
        }
        if self.reminders.display_secs > MAX_INTERVAL_SECS {
            return Err(ConfigError::InvalidDisplayWindow);
        }
        Ok(())
    }

    pub fn save_to_path(&mut self, config_path: &Path) -> Result<(), ConfigError> {
        // Ensure config version is set before saving
        self.config_version = Some(CURRENT_CONFIG_VERSION);

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(format!("Failed to serialize config: {}", e)))?;

        fs::write(config_path, toml_string)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path(profile: utils::Profile) -> Result<PathBuf, ConfigError> {
        let config_dir = utils::get_config_dir(profile)
            .ok_or_else(|| ConfigError::ConfigDirError("Could not determine config directory".to_string()))?;
        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::from_toml("").expect("empty config is valid");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.reminders, ReminderSettings::default());
        assert_eq!(config.reminders.offsets.len(), 2);
        assert_eq!(config.reminders.sweep_interval_ms(), 60_000);
        assert_eq!(config.reminders.display_ms(), 30_000);
        assert_eq!(config.notifications.permission, Permission::Default);
    }

    #[test]
    fn test_custom_offsets() {
        let text = r#"
            log_level = "debug"

            [reminders]
            display_secs = 10

            [[reminders.offsets]]
            kind = "1-day-before"
            lead_minutes = 1440
            title_prefix = "1 hari"
            body_prefix = "Besok"

            [notifications]
            permission = "granted"
            bell = false
        "#;
        let config = Config::from_toml(text).expect("valid config");
        assert_eq!(config.reminders.offsets.len(), 1);
        assert_eq!(config.reminders.offsets[0].lead_ms(), 1440 * 60_000);
        assert_eq!(config.reminders.sweep_interval_secs, 60);
        assert_eq!(config.notifications.permission, Permission::Granted);
        assert!(!config.notifications.bell);
    }

    #[test]
    fn test_rejects_bad_offsets() {
        let text = r#"
            [[reminders.offsets]]
            kind = "now"
            lead_minutes = 0
            title_prefix = "0"
            body_prefix = "x"
        "#;
        assert!(matches!(Config::from_toml(text), Err(ConfigError::InvalidOffset(_))));

        let text = r#"
            [[reminders.offsets]]
            kind = "a"
            lead_minutes = 5
            title_prefix = "5"
            body_prefix = "x"

            [[reminders.offsets]]
            kind = "a"
            lead_minutes = 10
            title_prefix = "10"
            body_prefix = "x"
        "#;
        assert!(matches!(Config::from_toml(text), Err(ConfigError::DuplicateOffset(_))));

        let text = r#"
            [[reminders.offsets]]
            kind = "forever"
            lead_minutes = 200000000000000
            title_prefix = "lama"
            body_prefix = "x"
        "#;
        assert!(matches!(Config::from_toml(text), Err(ConfigError::InvalidOffset(_))));
    }

    #[test]
    fn test_rejects_out_of_range_intervals() {
        let text = r#"
            [reminders]
            sweep_interval_secs = 9223372036854775
        "#;
        assert!(matches!(Config::from_toml(text), Err(ConfigError::InvalidSweepInterval)));

        let text = r#"
            [reminders]
            display_secs = 9223372036854775
        "#;
        assert!(matches!(Config::from_toml(text), Err(ConfigError::InvalidDisplayWindow)));
    }

    #[test]
    fn test_unvalidated_settings_stay_in_range() {
        let mut settings = ReminderSettings::default();
        settings.sweep_interval_secs = u64::MAX;
        settings.display_secs = u64::MAX;
        assert_eq!(settings.sweep_interval_ms(), MAX_INTERVAL_SECS as i64 * 1000);
        assert_eq!(settings.display_ms(), MAX_INTERVAL_SECS as i64 * 1000);

        settings.sweep_interval_secs = 0;
        assert_eq!(settings.sweep_interval_ms(), 1000);

        let offset = ReminderOffset::new("far", i64::MAX, "x", "y");
        assert_eq!(offset.lead_ms(), MAX_LEAD_MINUTES * 60_000);
    }

    #[test]
    fn test_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).expect("serializes");
        let parsed = Config::from_toml(&text).expect("parses");
        assert_eq!(parsed.reminders, config.reminders);
    }
}
