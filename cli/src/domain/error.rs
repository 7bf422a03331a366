//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator.

use thiserror::Error;

// ── Provisioning errors ───────────────────────────────────────────────────────

/// Run-level provisioning failures. Per-instance failures never surface here;
/// they are folded into the batch verdict.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("Not a valid fieldset, {}", .0.join("\n"))]
    InvalidFieldset(Vec<String>),

    #[error("private_key, private_key_path or ssh_password are required for SSH")]
    MissingSshCredential,

    #[error("private_key_path does not exist: {0}")]
    PrivateKeyPathNotFound(String),

    #[error("Unable to connect to {provider}: {cause}")]
    Connect { provider: String, cause: String },

    #[error("All servers failed to start")]
    AllFailedToStart,

    #[error("All servers failed to provision")]
    AllFailedToProvision,

    #[error("Provider {0} does not support finding servers by name")]
    FindUnsupported(String),

    #[error("Invalid name pattern '{pattern}': {cause}")]
    InvalidPattern { pattern: String, cause: String },
}

// ── Remote shell errors ───────────────────────────────────────────────────────

/// Failures reported by a remote shell channel.
///
/// Everything except `Other` is connection-level and retried by the remote
/// command executor. Authentication failures are included: keys are often
/// still propagating right after an instance boots.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShellError {
    #[error("connection refused")]
    Refused,

    #[error("connection timed out")]
    TimedOut,

    #[error("connection closed by remote host")]
    Disconnected,

    #[error("authentication failed: {0}")]
    AuthFailed(String),

    #[error("{0}")]
    Other(String),
}

impl ShellError {
    /// Whether the failure happened while establishing or holding the channel.
    #[must_use]
    pub fn is_connection_level(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

// ── Config errors ─────────────────────────────────────────────────────────────

/// Errors related to configuration key/value validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown setting: {key}\n\nValid settings: {valid}")]
    UnknownKey { key: String, valid: String },

    #[error("Invalid value for {key}: {value}\n\n{expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: String,
    },
}
