//! Instance handle and per-instance provisioning state.
//!
//! Provider adapters normalize whatever their API returns into an
//! [`InstanceHandle`]; the orchestration core never sees provider types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Provider-reported boot state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    #[default]
    NotReady,
    Ready,
    Errored,
}

/// Normalized reference to one provider instance.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InstanceHandle {
    /// Provider-assigned, stable identifier.
    pub id: String,
    /// Human label. Empty when the provider does not report one.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub readiness: Readiness,
    /// Raw provider state string, kept for log messages.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_address: Option<String>,
    /// Network attachments keyed by network name (e.g. `"private"`).
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub networks: BTreeMap<String, Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flavor_ref: Option<String>,
}

impl InstanceHandle {
    /// Create a not-yet-ready handle.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// The human label, falling back to the id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// `" with state: <state>"` when the provider reported one.
    #[must_use]
    pub fn state_suffix(&self) -> String {
        self.state
            .as_deref()
            .map(|s| format!(" with state: {s}"))
            .unwrap_or_default()
    }
}

/// Where one instance is in the provisioning state machine.
///
/// ```text
/// Created → Polling → {Ready, Errored}
/// Ready → AddressWait → {Addressed, AddressTimeout}
/// Addressed → Bootstrapping → {Provisioned, BootstrapFailed}
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstanceState {
    Created,
    Polling,
    Ready,
    Errored,
    AddressWait,
    Addressed,
    AddressTimeout,
    Bootstrapping,
    Provisioned,
    BootstrapFailed,
}

impl InstanceState {
    /// Whether the instance reached `Ready` at some point.
    ///
    /// Address timeouts and bootstrap failures still count as started.
    #[must_use]
    pub fn is_started(self) -> bool {
        !matches!(self, Self::Created | Self::Polling | Self::Errored)
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Errored | Self::AddressTimeout | Self::Provisioned | Self::BootstrapFailed
        )
    }

    /// Check a transition against the state machine.
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        use InstanceState::{
            AddressTimeout, AddressWait, Addressed, BootstrapFailed, Bootstrapping, Created,
            Errored, Polling, Provisioned, Ready,
        };
        matches!(
            (self, next),
            (Created, Polling)
                | (Polling, Ready | Errored)
                | (Ready, AddressWait)
                | (AddressWait, Addressed | AddressTimeout)
                | (Addressed, Bootstrapping)
                | (Bootstrapping, Provisioned | BootstrapFailed)
        )
    }
}
