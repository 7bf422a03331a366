//! Address normalization.
//!
//! Pure functions only — no I/O, no async.

use crate::domain::instance::InstanceHandle;

/// Network name whose first attachment is used as the private address.
pub const PRIVATE_NETWORK: &str = "private";

/// Public/private address pair of a ready instance.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AddressPair {
    pub public: Option<String>,
    pub private: Option<String>,
}

impl AddressPair {
    /// Private address, or `""` when the provider reports none.
    #[must_use]
    pub fn private_or_empty(&self) -> &str {
        self.private.as_deref().unwrap_or("")
    }

    /// Host to open a remote shell against: public first, then private.
    #[must_use]
    pub fn ssh_host(&self) -> Option<&str> {
        self.public.as_deref().or(self.private.as_deref())
    }
}

/// Extract the (public, private) pair from a handle.
///
/// Empty strings count as absent. The private address prefers the explicit
/// field and falls back to the first `private` network attachment.
#[must_use]
pub fn resolve(handle: &InstanceHandle) -> AddressPair {
    let public = non_empty(handle.public_address.as_deref());
    let private = non_empty(handle.private_address.as_deref()).or_else(|| {
        handle
            .networks
            .get(PRIVATE_NETWORK)
            .and_then(|addrs| non_empty(addrs.first().map(String::as_str)))
    });
    AddressPair { public, private }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}
