//! Application service — provision a batch of instances.
//!
//! Imports only from `crate::domain` and `crate::application`.
//! All I/O is routed through injected port traits.

use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::application::ports::{ContextStore, OutputSink, ProviderAdapter, RemoteShell};
use crate::application::retry::RetryPolicy;
use crate::application::services::address_wait::wait_for_address;
use crate::application::services::readiness::{PollSettings, ReadyHandler, poll_until_ready};
use crate::application::services::remote_exec;
use crate::domain::context::{append_addresses, append_ids, append_names, upsert_metadata};
use crate::domain::naming::NamePolicy;
use crate::domain::{
    InstanceHandle, InstanceState, MachineRecord, PipelineContext, ProvisionError,
    ProvisionRequest, SshAuth, SshTarget,
};

/// Timing knobs for one run.
#[derive(Debug, Clone, Copy)]
pub struct ProvisionSettings {
    pub poll: PollSettings,
    pub retry: RetryPolicy,
}

/// Final state of one created instance.
#[derive(Debug, Clone, Serialize)]
pub struct InstanceReport {
    pub id: String,
    pub name: String,
    pub state: InstanceState,
    pub public_address: Option<String>,
    pub private_address: Option<String>,
    pub errors: Vec<String>,
}

impl InstanceReport {
    fn new(handle: &InstanceHandle) -> Self {
        Self {
            id: handle.id.clone(),
            name: handle.display_name().to_owned(),
            state: InstanceState::Created,
            public_address: None,
            private_address: None,
            errors: Vec::new(),
        }
    }

    fn advance(&mut self, next: InstanceState) {
        if !self.state.can_advance_to(next) {
            warn!(id = %self.id, from = ?self.state, to = ?next, "ignoring illegal transition");
            return;
        }
        debug!(id = %self.id, from = ?self.state, to = ?next, "instance state");
        self.state = next;
    }
}

/// Outcome of a run where at least one instance was provisioned.
#[derive(Debug, Serialize)]
pub struct ProvisionOutcome {
    pub provider: String,
    pub instances: Vec<InstanceReport>,
}

impl ProvisionOutcome {
    #[must_use]
    pub fn started(&self) -> usize {
        self.instances.iter().filter(|i| i.state.is_started()).count()
    }

    #[must_use]
    pub fn provisioned(&self) -> usize {
        self.instances
            .iter()
            .filter(|i| i.state == InstanceState::Provisioned)
            .count()
    }
}

/// Pick the SSH authentication method for a request, checking key paths on
/// the local filesystem.
///
/// # Errors
///
/// Fails when no credential is supplied or a key path does not exist.
pub fn resolve_ssh_auth(request: &ProvisionRequest) -> Result<SshAuth> {
    let home = dirs::home_dir();
    request
        .credential
        .resolve(home.as_deref(), |p| p.exists())
}

/// Create, wait for, address, and bootstrap `request.count` instances.
///
/// Per-instance failures are folded into the verdict; the run fails only
/// when no instance started or none was provisioned. Ids are recorded in the
/// context right after creation, addresses and metadata once an instance
/// has its address.
///
/// # Errors
///
/// Returns a [`ProvisionError`] for invalid requests, a failed provider
/// connection, or a failing verdict, and any context store error.
pub async fn provision<P: ProviderAdapter>(
    provider: &P,
    shell: &impl RemoteShell,
    store: &impl ContextStore,
    out: &impl OutputSink,
    request: &ProvisionRequest,
    settings: ProvisionSettings,
) -> Result<ProvisionOutcome> {
    let tag = provider.tag().to_owned();
    out.write_output(&format!("Starting {tag} provision\n"));
    info!(provider = %tag, count = request.count, "starting provision");

    request.validate_fields(provider.required_options())?;
    let auth = if request.has_commands() {
        Some(resolve_ssh_auth(request)?)
    } else {
        None
    };

    let mut ctx = store.load_async().await?.unwrap_or_default();

    let conn = provider
        .connect(&request.options)
        .await
        .map_err(|e| ProvisionError::Connect {
            provider: tag.clone(),
            cause: format!("{e:#}"),
        })?;

    let policy = name_policy(provider, &conn, request).await;
    let created = create_instances(provider, &conn, request, &policy, out).await;

    let ids: Vec<String> = created.iter().map(|h| h.id.clone()).collect();
    append_ids(&mut ctx, &tag, &ids);
    ctx.updated_at = Some(Utc::now());
    store.save_async(&ctx).await?;

    let mut reports: Vec<InstanceReport> = created.iter().map(InstanceReport::new).collect();
    for report in &mut reports {
        report.advance(InstanceState::Polling);
    }

    let mut post_ready = PostReady {
        provider,
        conn: &conn,
        shell,
        store,
        out,
        ctx: &mut ctx,
        request,
        auth: auth.as_ref(),
        settings,
        reports: &mut reports,
    };
    let summary =
        poll_until_ready(provider, &conn, created, settings.poll, &mut post_ready, out).await?;
    for handle in summary.errored.iter().chain(&summary.timed_out) {
        if let Some(report) = reports.iter_mut().find(|r| r.id == handle.id) {
            report.advance(InstanceState::Errored);
        }
    }

    verdict(&tag, reports, out)
}

async fn name_policy<P: ProviderAdapter>(
    provider: &P,
    conn: &P::Connection,
    request: &ProvisionRequest,
) -> NamePolicy {
    let requested = request.name.as_deref().filter(|n| !n.is_empty());
    let taken = match requested {
        Some(name) if request.count == 1 => match provider.lookup(conn, name).await {
            Ok(found) => found.is_some(),
            Err(e) => {
                warn!(name, error = %e, "could not check whether name is taken");
                false
            }
        },
        _ => false,
    };
    if taken {
        info!(name = requested, "name already taken, randomizing");
    }
    NamePolicy::for_request(requested, request.count, taken)
}

/// Issue every create call in sequence; failures are logged and skipped.
async fn create_instances<P: ProviderAdapter>(
    provider: &P,
    conn: &P::Connection,
    request: &ProvisionRequest,
    policy: &NamePolicy,
    out: &impl OutputSink,
) -> Vec<InstanceHandle> {
    let mut created: Vec<InstanceHandle> = Vec::new();
    for _ in 0..request.count {
        let name = policy.next_name();
        out.write_output(&format!("Creating server '{name}'\n"));
        match provider.create(conn, &name, &request.options).await {
            Ok(handle) if created.iter().any(|h| h.id == handle.id) => {
                warn!(id = %handle.id, name = %name, "provider returned a duplicate id");
                out.write_output(&format!(
                    "Server '{name}' reused id '{}', tracking it once\n",
                    handle.id
                ));
            }
            Ok(handle) => {
                info!(id = %handle.id, name = %name, "server created");
                out.write_output(&format!(
                    "Created server '{name}' with id '{}'\n",
                    handle.id
                ));
                created.push(handle);
            }
            Err(e) => {
                error!(name = %name, error = %e, "create failed");
                out.write_output(&format!("Failed to create server '{name}': {e:#}\n"));
            }
        }
    }
    created
}

fn verdict(
    tag: &str,
    reports: Vec<InstanceReport>,
    out: &impl OutputSink,
) -> Result<ProvisionOutcome> {
    let outcome = ProvisionOutcome {
        provider: tag.to_owned(),
        instances: reports,
    };
    if outcome.started() == 0 {
        error!(provider = %tag, "no server started");
        return Err(ProvisionError::AllFailedToStart.into());
    }
    if outcome.provisioned() == 0 {
        error!(provider = %tag, "no server provisioned");
        return Err(ProvisionError::AllFailedToProvision.into());
    }
    info!(
        provider = %tag,
        started = outcome.started(),
        provisioned = outcome.provisioned(),
        "provision complete"
    );
    out.write_output(&format!("{tag} provision complete!\n"));
    Ok(outcome)
}

/// Address wait, aggregation, setup hook, and bootstrap for one instance.
struct PostReady<'a, P: ProviderAdapter, S, C, O> {
    provider: &'a P,
    conn: &'a P::Connection,
    shell: &'a S,
    store: &'a C,
    out: &'a O,
    ctx: &'a mut PipelineContext,
    request: &'a ProvisionRequest,
    auth: Option<&'a SshAuth>,
    settings: ProvisionSettings,
    reports: &'a mut Vec<InstanceReport>,
}

impl<P, S, C, O> ReadyHandler for PostReady<'_, P, S, C, O>
where
    P: ProviderAdapter,
    S: RemoteShell,
    C: ContextStore,
    O: OutputSink,
{
    async fn on_ready(&mut self, mut handle: InstanceHandle, budget: Duration) -> Result<()> {
        let Some(index) = self.reports.iter().position(|r| r.id == handle.id) else {
            return Ok(());
        };
        self.reports[index].advance(InstanceState::Ready);
        self.reports[index].advance(InstanceState::AddressWait);

        let addresses = wait_for_address(
            self.provider,
            self.conn,
            &mut handle,
            self.request.wait_for_public_ip,
            budget,
            self.settings.poll.interval,
            self.out,
        )
        .await;
        let Some(addresses) = addresses else {
            self.out.write_output(&format!(
                "Server '{}' {} failed to get a public ip\n",
                handle.display_name(),
                handle.id
            ));
            self.reports[index].advance(InstanceState::AddressTimeout);
            return Ok(());
        };

        self.out.write_output(&format!(
            "Server '{}' {} started with public ip '{}' and private ip '{}'\n",
            handle.display_name(),
            handle.id,
            addresses.public.as_deref().unwrap_or(""),
            addresses.private_or_empty()
        ));
        let tag = self.provider.tag();
        append_addresses(self.ctx, tag, &addresses);
        append_names(self.ctx, tag, &[handle.display_name().to_owned()]);
        upsert_metadata(self.ctx, MachineRecord::from_handle(&handle, &addresses, tag));
        self.ctx.updated_at = Some(Utc::now());
        self.store.save_async(self.ctx).await?;

        let report = &mut self.reports[index];
        report.public_address.clone_from(&addresses.public);
        report.private_address.clone_from(&addresses.private);
        report.advance(InstanceState::Addressed);
        report.advance(InstanceState::Bootstrapping);

        if let Err(e) = self.provider.setup(self.conn, &handle).await {
            warn!(id = %handle.id, error = %e, "provider setup failed");
            report.errors.push(format!("setup failed: {e:#}"));
            report.advance(InstanceState::BootstrapFailed);
            return Ok(());
        }

        if !self.request.has_commands() {
            report.advance(InstanceState::Provisioned);
            return Ok(());
        }

        let (Some(host), Some(auth)) = (addresses.ssh_host(), self.auth) else {
            report.errors.push("no address to run commands against".to_owned());
            report.advance(InstanceState::BootstrapFailed);
            return Ok(());
        };
        let target = SshTarget {
            host: host.to_owned(),
            port: self.request.ssh_port,
            user: self.request.ssh_user.clone(),
            auth: auth.clone(),
        };
        let exec = remote_exec::execute(
            self.shell,
            &target,
            &self.request.commands,
            self.settings.retry,
            self.out,
        )
        .await;

        if exec.is_success() {
            report.advance(InstanceState::Provisioned);
        } else {
            self.out.write_output(&format!(
                "Server '{}' {} failed to provision\n",
                handle.display_name(),
                handle.id
            ));
            report.errors.extend(exec.errors);
            report.advance(InstanceState::BootstrapFailed);
        }
        Ok(())
    }
}
