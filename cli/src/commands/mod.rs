//! Command implementations

pub mod config;
pub mod deprovision;
pub mod find;
pub mod provision;
pub mod status;
pub mod version;

use anyhow::Result;

use crate::domain::ProviderOptions;
use crate::infra::command_runner::TokioCommandRunner;
use crate::infra::multipass::{MULTIPASS_TAG, MultipassAdapter};

/// Build the adapter for a provider tag.
///
/// # Errors
///
/// Returns an error for tags without an adapter.
pub fn provider_for(tag: &str) -> Result<MultipassAdapter<TokioCommandRunner>> {
    match tag {
        MULTIPASS_TAG => Ok(MultipassAdapter::local()),
        other => anyhow::bail!("Unknown provider: {other} (available: {MULTIPASS_TAG})"),
    }
}

/// Parse a `KEY=VALUE` option flag.
///
/// # Errors
///
/// Returns a message when the `=` is missing or the key is empty.
pub fn parse_option(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_owned(), value.to_owned()))
        }
        _ => Err(format!("expected KEY=VALUE, got '{raw}'")),
    }
}

/// Config file options overlaid with command-line options.
#[must_use]
pub fn merge_options(base: &ProviderOptions, flags: &[(String, String)]) -> ProviderOptions {
    let mut merged = base.clone();
    merged.extend(flags.iter().cloned());
    merged
}
