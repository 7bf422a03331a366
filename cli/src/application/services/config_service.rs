//! Application service — configuration use-cases.

use anyhow::Result;

use crate::application::ports::ConfigStore;
use crate::domain::config::FlotillaConfig;

/// Load configuration.
pub fn load_config(store: &impl ConfigStore) -> Result<FlotillaConfig> {
    store.load()
}

/// Validate and persist a single `key = value` pair.
///
/// # Errors
///
/// Returns an error on an unknown key, an invalid value or a store failure.
/// Nothing is written when validation fails.
pub fn set_value(store: &impl ConfigStore, key: &str, value: &str) -> Result<FlotillaConfig> {
    let mut config = store.load()?;
    config.set(key, value)?;
    store.save(&config)?;
    Ok(config)
}
