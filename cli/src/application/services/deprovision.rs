//! Application service — best-effort teardown of recorded or named instances.

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::application::ports::{ContextStore, OutputSink, ProviderAdapter};
use crate::domain::context::{recorded_ids, remove_metadata};
use crate::domain::{DeprovisionRequest, ProvisionError};

/// What happened to each target.
#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct DeprovisionReport {
    pub destroyed: Vec<String>,
    pub missing: Vec<String>,
    pub failed: Vec<(String, String)>,
}

/// Destroy every target, continuing past individual failures.
///
/// Targets are the request's explicit instances or, when none are given,
/// every id recorded in the context for this provider. Metadata is removed
/// for destroyed and already-missing instances; recorded id lists are left
/// as they are.
///
/// # Errors
///
/// Fails only when the provider connection cannot be established or the
/// context store fails. Per-instance errors end up in the report.
pub async fn deprovision<P: ProviderAdapter>(
    provider: &P,
    store: &impl ContextStore,
    out: &impl OutputSink,
    request: &DeprovisionRequest,
) -> Result<DeprovisionReport> {
    let tag = provider.tag().to_owned();
    out.write_output(&format!("Starting {tag} deprovision\n"));

    let mut ctx = store.load_async().await?.unwrap_or_default();
    let targets = if request.instances.is_empty() {
        recorded_ids(&ctx, &tag)
    } else {
        request.instances.clone()
    };
    let mut report = DeprovisionReport::default();
    if targets.is_empty() {
        warn!(provider = %tag, "nothing to deprovision");
        out.write_output("No servers found to be deprovisioned\n");
        return Ok(report);
    }

    let conn = provider
        .connect(&request.options)
        .await
        .map_err(|e| ProvisionError::Connect {
            provider: tag.clone(),
            cause: format!("{e:#}"),
        })?;

    for target in targets {
        out.write_output(&format!("Deprovisioning VM with id '{target}'\n"));
        let found = match provider.lookup(&conn, &target).await {
            Ok(found) => found,
            Err(e) => {
                error!(target = %target, error = %e, "lookup failed");
                out.write_output(&format!("Error destroying instance with id '{target}': {e:#}\n"));
                report.failed.push((target, format!("{e:#}")));
                continue;
            }
        };
        let Some(handle) = found else {
            info!(target = %target, "instance not found, dropping metadata");
            out.write_output(&format!("VM with id '{target}' not found, ignoring\n"));
            remove_metadata(&mut ctx, &target, &tag);
            report.missing.push(target);
            continue;
        };
        match provider.destroy(&conn, &handle).await {
            Ok(()) => {
                info!(id = %handle.id, "instance destroyed");
                out.write_output(&format!("Destroyed VM with id '{}'\n", handle.id));
                remove_metadata(&mut ctx, &handle.id, &tag);
                report.destroyed.push(handle.id);
            }
            Err(e) => {
                error!(id = %handle.id, error = %e, "destroy failed");
                out.write_output(&format!(
                    "Error destroying instance with id '{}': {e:#}\n",
                    handle.id
                ));
                report.failed.push((handle.id, format!("{e:#}")));
            }
        }
    }

    ctx.updated_at = Some(Utc::now());
    store.save_async(&ctx).await?;
    out.write_output(&format!("{tag} deprovision complete!\n"));
    Ok(report)
}
