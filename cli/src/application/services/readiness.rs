//! Application service — readiness poller.
//!
//! Polls a batch of freshly created instances against one shared deadline.
//! Post-ready work for an instance runs inline as soon as it is seen ready;
//! the time spent there is added back to the deadline ("deadline debt") so
//! slow bootstraps never starve the instances still pending.

use std::time::Duration;

use anyhow::Result;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::application::ports::{OutputSink, ProviderAdapter};
use crate::domain::InstanceHandle;

/// Shared timing for a polling run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub timeout: Duration,
    pub interval: Duration,
}

/// Work done on an instance once it is first seen ready.
#[allow(async_fn_in_trait)]
pub trait ReadyHandler {
    /// `budget` is what remained of the readiness deadline at the moment the
    /// instance was seen ready.
    ///
    /// # Errors
    ///
    /// An error aborts the whole polling run.
    async fn on_ready(&mut self, handle: InstanceHandle, budget: Duration) -> Result<()>;
}

/// Upper bound for any single deadline. Larger spans are clamped so the
/// `Instant` arithmetic cannot overflow.
pub const MAX_DEADLINE_SPAN: Duration = Duration::from_secs(86_400 * 365 * 30);

/// `start + span`, clamped to [`MAX_DEADLINE_SPAN`].
pub(crate) fn deadline_after(start: Instant, span: Duration) -> Instant {
    start
        .checked_add(span.min(MAX_DEADLINE_SPAN))
        .unwrap_or(start)
}

/// Instances that never made it to ready.
#[derive(Debug, Default)]
pub struct PollSummary {
    pub ready: usize,
    pub errored: Vec<InstanceHandle>,
    pub timed_out: Vec<InstanceHandle>,
}

/// Poll `pending` until each is ready, errored, or the deadline passes.
///
/// Instances are refreshed in order once per round with `interval` between
/// rounds. A refresh error is logged and the instance stays pending.
///
/// # Errors
///
/// Only errors returned by `handler` are propagated.
pub async fn poll_until_ready<P: ProviderAdapter>(
    provider: &P,
    conn: &P::Connection,
    pending: Vec<InstanceHandle>,
    settings: PollSettings,
    handler: &mut impl ReadyHandler,
    out: &impl OutputSink,
) -> Result<PollSummary> {
    let mut summary = PollSummary::default();
    let mut deadline = deadline_after(Instant::now(), settings.timeout);
    let mut active = pending;

    for handle in &active {
        out.write_output(&format!(
            "Waiting for server '{}' {} to be ready\n",
            handle.display_name(),
            handle.id
        ));
    }

    loop {
        let mut still_pending = Vec::with_capacity(active.len());
        for mut handle in active {
            if let Err(e) = provider.refresh(conn, &mut handle).await {
                warn!(id = %handle.id, error = %e, "refresh failed, still pending");
                still_pending.push(handle);
                continue;
            }
            if provider.is_ready(&handle) {
                info!(id = %handle.id, name = handle.display_name(), "server ready");
                let seen = Instant::now();
                let budget = deadline.saturating_duration_since(seen);
                handler.on_ready(handle, budget).await?;
                let debt = seen.elapsed();
                deadline = deadline_after(deadline, debt);
                debug!(debt_ms = debt.as_millis(), "extended readiness deadline");
                summary.ready += 1;
            } else if provider.is_errored(&handle) {
                warn!(id = %handle.id, state = ?handle.state, "server errored");
                out.write_output(&format!(
                    "Server '{}' {} failed to start{}\n",
                    handle.display_name(),
                    handle.id,
                    handle.state_suffix()
                ));
                summary.errored.push(handle);
            } else {
                still_pending.push(handle);
            }
        }
        active = still_pending;

        if active.is_empty() {
            break;
        }
        if Instant::now() >= deadline {
            for handle in &active {
                warn!(id = %handle.id, "timed out waiting for server");
                out.write_output(&format!(
                    "Timed out after {}s waiting for server '{}' {} to be ready\n",
                    settings.timeout.as_secs(),
                    handle.display_name(),
                    handle.id
                ));
            }
            summary.timed_out = active;
            break;
        }
        tokio::time::sleep(settings.interval).await;
    }
    Ok(summary)
}
