//! Provisioning and deprovisioning inputs.

use std::collections::BTreeMap;

use anyhow::Result;

use crate::domain::error::ProvisionError;
use crate::domain::ssh::{DEFAULT_SSH_USER, SshCredential};

/// Provider-specific options, passed verbatim to the adapter.
pub type ProviderOptions = BTreeMap<String, String>;

/// Input to one provisioning run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionRequest {
    /// Number of instances to create (≥ 1).
    pub count: u32,
    /// Explicit name or basename; `None` uses the default basename.
    pub name: Option<String>,
    /// Bootstrap commands run over SSH on every ready instance.
    pub commands: Vec<String>,
    pub ssh_user: String,
    pub ssh_port: u16,
    pub credential: SshCredential,
    /// When false an instance is accepted without a public address.
    pub wait_for_public_ip: bool,
    pub options: ProviderOptions,
}

impl Default for ProvisionRequest {
    fn default() -> Self {
        Self {
            count: 1,
            name: None,
            commands: Vec::new(),
            ssh_user: DEFAULT_SSH_USER.to_owned(),
            ssh_port: crate::domain::ssh::DEFAULT_SSH_PORT,
            credential: SshCredential::default(),
            wait_for_public_ip: true,
            options: ProviderOptions::new(),
        }
    }
}

impl ProvisionRequest {
    /// Whether any bootstrap command was requested.
    #[must_use]
    pub fn has_commands(&self) -> bool {
        self.commands.iter().any(|c| !c.trim().is_empty())
    }

    /// Check the count and the adapter's required options.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::InvalidFieldset`] listing every problem.
    pub fn validate_fields(&self, required: &[&str]) -> Result<()> {
        let mut errors = Vec::new();
        if self.count == 0 {
            errors.push("count must be at least 1".to_owned());
        }
        for field in required {
            if self.options.get(*field).is_none_or(|v| v.is_empty()) {
                errors.push(format!("missing {field}"));
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProvisionError::InvalidFieldset(errors).into())
        }
    }
}

/// Input to one deprovisioning run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeprovisionRequest {
    /// Explicit ids or names; empty means "everything recorded for this provider".
    pub instances: Vec<String>,
    pub options: ProviderOptions,
}
