//! Application service — wait for a ready instance to report a public
//! address.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::application::ports::{OutputSink, ProviderAdapter};
use crate::application::services::readiness::deadline_after;
use crate::domain::AddressPair;
use crate::domain::address::resolve;
use crate::domain::InstanceHandle;

/// Resolve the address pair of a ready instance.
///
/// When `wait_for_public` is false the current addresses are returned as-is.
/// Otherwise the handle is refreshed every `interval` until a public address
/// shows up or `budget` runs out; `None` means the wait timed out.
pub async fn wait_for_address<P: ProviderAdapter>(
    provider: &P,
    conn: &P::Connection,
    handle: &mut InstanceHandle,
    wait_for_public: bool,
    budget: Duration,
    interval: Duration,
    out: &impl OutputSink,
) -> Option<AddressPair> {
    let addresses = resolve(handle);
    if !wait_for_public || addresses.public.is_some() {
        return Some(addresses);
    }

    out.write_output(&format!(
        "Waiting for server '{}' {} to get a public ip... ",
        handle.display_name(),
        handle.id
    ));
    let deadline = deadline_after(Instant::now(), budget);
    loop {
        if Instant::now() >= deadline {
            out.write_output("failed\n");
            warn!(id = %handle.id, budget_secs = budget.as_secs(), "no public address before deadline");
            return None;
        }
        tokio::time::sleep(interval.min(deadline.saturating_duration_since(Instant::now()))).await;
        if let Err(e) = provider.refresh(conn, handle).await {
            debug!(id = %handle.id, error = %e, "refresh failed while waiting for address");
            continue;
        }
        let addresses = resolve(handle);
        if addresses.public.is_some() {
            out.write_output("done\n");
            return Some(addresses);
        }
    }
}
