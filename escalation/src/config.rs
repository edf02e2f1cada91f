//! Escalation configuration
//!
//! Read once at process start. `Default` pulls from the environment with
//! fallbacks for missing, unparseable or zero numeric values; a TOML file
//! can be loaded instead. Nothing here is reloaded while the process runs.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::Priority;
use crate::scheduler::MAX_CHECK_INTERVAL_MINUTES;

/// Errors from loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Positive integer under `key`. Zero counts as unset.
fn positive<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: std::str::FromStr + PartialEq + Default,
{
    lookup(key)
        .and_then(|s| s.trim().parse().ok())
        .filter(|v: &T| *v != T::default())
}

fn non_blank(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<String> {
    lookup(key).filter(|s| !s.trim().is_empty())
}

/// Days a complaint may stay active before it escalates, per priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationLimits {
    pub high: u32,
    pub medium: u32,
    pub low: u32,
}

impl EscalationLimits {
    pub const DEFAULT_HIGH: u32 = 3;
    pub const DEFAULT_MEDIUM: u32 = 7;
    pub const DEFAULT_LOW: u32 = 15;

    pub fn new(high: u32, medium: u32, low: u32) -> Self {
        Self { high, medium, low }
    }

    /// Limits from `ESCALATION_{HIGH,MEDIUM,LOW}_PRIORITY`.
    pub fn from_env() -> Self {
        Self::from_lookup(env_var)
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            high: positive(&lookup, "ESCALATION_HIGH_PRIORITY").unwrap_or(Self::DEFAULT_HIGH),
            medium: positive(&lookup, "ESCALATION_MEDIUM_PRIORITY")
                .unwrap_or(Self::DEFAULT_MEDIUM),
            low: positive(&lookup, "ESCALATION_LOW_PRIORITY").unwrap_or(Self::DEFAULT_LOW),
        }
    }

    /// Day limit for a priority. Unrecognized priorities get the low limit.
    pub fn limit_for(&self, priority: &Priority) -> u32 {
        match priority {
            Priority::High => self.high,
            Priority::Medium => self.medium,
            Priority::Low | Priority::Unrecognized(_) => self.low,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, days) in [("high", self.high), ("medium", self.medium), ("low", self.low)] {
            if days == 0 {
                return Err(ConfigError::Invalid(format!(
                    "{} priority escalation limit must be at least 1 day",
                    name
                )));
            }
        }
        Ok(())
    }
}

impl Default for EscalationLimits {
    fn default() -> Self {
        Self::new(Self::DEFAULT_HIGH, Self::DEFAULT_MEDIUM, Self::DEFAULT_LOW)
    }
}

/// Settings for the form-submission notification transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// Form-submission endpoint
    pub endpoint: String,
    /// Provider access key; messages without a `to` go to the key's owner
    pub access_key: String,
    /// Display name on outgoing messages
    pub from_name: String,
    /// Reply-to address on outgoing messages
    pub reply_to: String,
    /// Whole-request HTTP timeout in seconds
    pub http_timeout_secs: u64,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self::from_lookup(env_var)
    }
}

impl NotifierConfig {
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            endpoint: non_blank(&lookup, "WEB3FORMS_ENDPOINT")
                .unwrap_or_else(|| "https://api.web3forms.com/submit".to_string()),
            access_key: non_blank(&lookup, "WEB3FORMS_ACCESS_KEY").unwrap_or_default(),
            from_name: "Government Complaint System".to_string(),
            reply_to: non_blank(&lookup, "EMAIL_USER")
                .unwrap_or_else(|| "noreply@government.gov".to_string()),
            http_timeout_secs: 20,
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

/// Top-level escalation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationConfig {
    /// Per-priority day limits
    pub limits: EscalationLimits,
    /// Minutes between scheduled sweeps
    pub check_interval_minutes: u64,
    /// Identity recorded as `escalatedTo` and addressed by escalation alerts
    pub admin_recipient: String,
    /// Upper bound on a single notification send, in seconds
    pub notify_timeout_secs: u64,
    /// Notification transport settings
    pub notifier: NotifierConfig,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self::from_lookup(env_var)
    }
}

impl EscalationConfig {
    /// Build from named values, falling back to defaults per key.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            limits: EscalationLimits::from_lookup(&lookup),
            check_interval_minutes: positive(&lookup, "ESCALATION_CHECK_INTERVAL_MINUTES")
                .unwrap_or(60),
            admin_recipient: non_blank(&lookup, "ESCALATION_ADMIN_RECIPIENT")
                .unwrap_or_else(|| "Higher Official".to_string()),
            notify_timeout_secs: positive(&lookup, "ESCALATION_NOTIFY_TIMEOUT_SECS").unwrap_or(30),
            notifier: NotifierConfig::from_lookup(&lookup),
        }
    }

    /// Load from a TOML file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.limits.validate()?;
        if !(1..=MAX_CHECK_INTERVAL_MINUTES).contains(&self.check_interval_minutes) {
            return Err(ConfigError::Invalid(format!(
                "check_interval_minutes must be between 1 and {}",
                MAX_CHECK_INTERVAL_MINUTES
            )));
        }
        if self.notify_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "notify_timeout_secs must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify_timeout_secs)
    }
}
