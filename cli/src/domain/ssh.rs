//! SSH credential material, remote targets and command results.

use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::Serialize;

use crate::domain::error::ProvisionError;

/// Default remote user when none is requested.
pub const DEFAULT_SSH_USER: &str = "root";

/// Default SSH port.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// Credential material as supplied by the caller. Any one field is enough.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SshCredential {
    /// Inline private key material.
    pub private_key: Option<String>,
    /// Path to a private key file; `~/` is expanded.
    pub private_key_path: Option<String>,
    pub password: Option<String>,
}

/// Validated authentication method.
#[derive(Clone, PartialEq, Eq)]
pub enum SshAuth {
    Key(String),
    KeyFile(PathBuf),
    Password(String),
}

impl std::fmt::Debug for SshAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Key(_) => f.write_str("Key(<redacted>)"),
            Self::KeyFile(p) => f.debug_tuple("KeyFile").field(p).finish(),
            Self::Password(_) => f.write_str("Password(<redacted>)"),
        }
    }
}

impl SshCredential {
    /// Pick the authentication method, failing fast on missing material.
    ///
    /// Inline key wins over key path, key path over password. `exists` is
    /// injected so this stays free of filesystem access.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::MissingSshCredential`] when nothing is
    /// supplied and [`ProvisionError::PrivateKeyPathNotFound`] when the key
    /// path does not exist.
    pub fn resolve(&self, home: Option<&Path>, exists: impl Fn(&Path) -> bool) -> Result<SshAuth> {
        if let Some(key) = self.private_key.as_deref().filter(|k| !k.trim().is_empty()) {
            return Ok(SshAuth::Key(key.to_owned()));
        }
        if let Some(raw) = self.private_key_path.as_deref().filter(|p| !p.is_empty()) {
            let path = expand_home(raw, home);
            if !exists(&path) {
                return Err(ProvisionError::PrivateKeyPathNotFound(path.display().to_string()).into());
            }
            return Ok(SshAuth::KeyFile(path));
        }
        if let Some(password) = self.password.as_deref().filter(|p| !p.is_empty()) {
            return Ok(SshAuth::Password(password.to_owned()));
        }
        Err(ProvisionError::MissingSshCredential.into())
    }
}

/// Expand a leading `~/` against `home`.
#[must_use]
pub fn expand_home(raw: &str, home: Option<&Path>) -> PathBuf {
    match (raw.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => home.join(rest),
        _ if raw == "~" => home.map_or_else(|| PathBuf::from(raw), Path::to_path_buf),
        _ => PathBuf::from(raw),
    }
}

/// Where and how to open a remote shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshTarget {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub auth: SshAuth,
}

/// Outcome of one remote command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandResult {
    pub command: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_status: i32,
}

impl CommandResult {
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_status == 0
    }
}
