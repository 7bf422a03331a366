//! Domain types and validators for Flotilla configuration.
//!
//! Pure functions only — no I/O, no async, no filesystem access.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::error::ConfigError;
use crate::domain::ssh::DEFAULT_SSH_USER;

// ── Constants ────────────────────────────────────────────────────────────────

pub const VALID_CONFIG_KEYS: &[&str] = &[
    "provider",
    "timeout_secs",
    "poll_interval_secs",
    "ssh.user",
    "ssh.max_attempts",
    "ssh.retry_delay_secs",
];

pub const DEFAULT_PROVIDER: &str = "multipass";
pub const DEFAULT_TIMEOUT_SECS: u64 = 600;
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 1;
pub const DEFAULT_SSH_MAX_ATTEMPTS: u32 = 10;
pub const DEFAULT_SSH_RETRY_DELAY_SECS: u64 = 5;
/// Upper bound for every `*_secs` setting (one week).
pub const MAX_WAIT_SECS: u64 = 7 * 86_400;

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.flotilla/config.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlotillaConfig {
    /// Provider adapter tag.
    pub provider: String,
    /// Readiness deadline for a whole batch.
    pub timeout_secs: u64,
    /// Pause between readiness refresh rounds.
    pub poll_interval_secs: u64,
    pub ssh: SshConfig,
    /// Provider options passed verbatim to the adapter.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,
}

impl Default for FlotillaConfig {
    fn default() -> Self {
        Self {
            provider: DEFAULT_PROVIDER.to_owned(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            poll_interval_secs: DEFAULT_POLL_INTERVAL_SECS,
            ssh: SshConfig::default(),
            options: BTreeMap::new(),
        }
    }
}

/// Remote shell settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SshConfig {
    pub user: String,
    /// Connection attempts per instance before giving up.
    pub max_attempts: u32,
    pub retry_delay_secs: u64,
}

impl Default for SshConfig {
    fn default() -> Self {
        Self {
            user: DEFAULT_SSH_USER.to_owned(),
            max_attempts: DEFAULT_SSH_MAX_ATTEMPTS,
            retry_delay_secs: DEFAULT_SSH_RETRY_DELAY_SECS,
        }
    }
}

impl FlotillaConfig {
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    /// Apply a validated `key = value` pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown or the value invalid.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        validate_config_key(key)?;
        validate_config_value(key, value)?;
        match key {
            "provider" => value.clone_into(&mut self.provider),
            "timeout_secs" => self.timeout_secs = parse_positive(key, value)?,
            "poll_interval_secs" => self.poll_interval_secs = parse_positive(key, value)?,
            "ssh.user" => value.clone_into(&mut self.ssh.user),
            "ssh.max_attempts" => {
                self.ssh.max_attempts = u32::try_from(parse_positive(key, value)?)
                    .map_err(|_| invalid(key, value))?;
            }
            "ssh.retry_delay_secs" => self.ssh.retry_delay_secs = parse_positive(key, value)?,
            _ => {}
        }
        Ok(())
    }
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a configuration key against the whitelist.
///
/// # Errors
///
/// Returns an error if the key is not in the allowed list.
pub fn validate_config_key(key: &str) -> Result<()> {
    if !VALID_CONFIG_KEYS.contains(&key) {
        return Err(ConfigError::UnknownKey {
            key: key.to_string(),
            valid: VALID_CONFIG_KEYS.join(", "),
        }
        .into());
    }
    Ok(())
}

/// Validates a configuration value for the given key.
///
/// # Errors
///
/// Returns an error if the value is not valid for the key.
pub fn validate_config_value(key: &str, value: &str) -> Result<()> {
    match key {
        "provider" | "ssh.user" if value.trim().is_empty() => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            expected: "Expected a non-empty string".to_string(),
        }
        .into()),
        "timeout_secs" | "poll_interval_secs" | "ssh.max_attempts" | "ssh.retry_delay_secs" => {
            parse_positive(key, value).map(|_| ())
        }
        _ => Ok(()),
    }
}

fn parse_positive(key: &str, value: &str) -> Result<u64> {
    let max = upper_bound(key);
    match value.parse::<u64>() {
        Ok(n) if n > 0 && n <= max => Ok(n),
        _ => Err(invalid(key, value).into()),
    }
}

fn upper_bound(key: &str) -> u64 {
    if key.ends_with("_secs") {
        MAX_WAIT_SECS
    } else {
        u64::from(u32::MAX)
    }
}

fn invalid(key: &str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        expected: format!("Expected a positive integer up to {}", upper_bound(key)),
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
