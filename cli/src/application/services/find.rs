//! Application service — look up existing instances by name pattern and
//! record them as if they had been provisioned.

use anyhow::Result;
use chrono::Utc;
use regex::Regex;
use tracing::info;

use crate::application::ports::{ContextStore, OutputSink, ProviderAdapter};
use crate::domain::address::resolve;
use crate::domain::context::{append_addresses, append_ids, append_names, upsert_metadata};
use crate::domain::{InstanceHandle, MachineRecord, ProviderOptions, ProvisionError};

/// Record every instance whose name matches `pattern`.
///
/// # Errors
///
/// Fails on an invalid pattern, a failed connection, a provider that cannot
/// list instances, or a context store error.
pub async fn find_by_pattern<P: ProviderAdapter>(
    provider: &P,
    store: &impl ContextStore,
    out: &impl OutputSink,
    pattern: &str,
    options: &ProviderOptions,
) -> Result<Vec<InstanceHandle>> {
    let re = Regex::new(pattern).map_err(|e| ProvisionError::InvalidPattern {
        pattern: pattern.to_owned(),
        cause: e.to_string(),
    })?;
    let tag = provider.tag().to_owned();

    let conn = provider
        .connect(options)
        .await
        .map_err(|e| ProvisionError::Connect {
            provider: tag.clone(),
            cause: format!("{e:#}"),
        })?;
    let matches: Vec<InstanceHandle> = provider
        .list(&conn)
        .await?
        .into_iter()
        .filter(|h| re.is_match(h.display_name()))
        .collect();
    info!(provider = %tag, pattern, count = matches.len(), "found servers");

    let mut ctx = store.load_async().await?.unwrap_or_default();
    let ids: Vec<String> = matches.iter().map(|h| h.id.clone()).collect();
    let names: Vec<String> = matches.iter().map(|h| h.display_name().to_owned()).collect();
    append_ids(&mut ctx, &tag, &ids);
    append_names(&mut ctx, &tag, &names);
    for handle in &matches {
        let addresses = resolve(handle);
        append_addresses(&mut ctx, &tag, &addresses);
        upsert_metadata(&mut ctx, MachineRecord::from_handle(handle, &addresses, &tag));
        out.write_output(&format!(
            "Found server '{}' {} with public ip '{}'\n",
            handle.display_name(),
            handle.id,
            addresses.public.as_deref().unwrap_or("")
        ));
    }
    ctx.updated_at = Some(Utc::now());
    store.save_async(&ctx).await?;
    out.write_output(&format!(
        "Found {} server(s) matching '{pattern}'\n",
        matches.len()
    ));
    Ok(matches)
}
