//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` — never from `crate::infra`,
//! `crate::commands`, or `crate::output`.

use std::process::Output;
use std::time::Duration;

use anyhow::Result;

use crate::domain::config::FlotillaConfig;
use crate::domain::error::ProvisionError;
use crate::domain::{
    CommandResult, InstanceHandle, PipelineContext, ProviderOptions, Readiness, ShellError,
    SshTarget,
};

// ── Provider Port ─────────────────────────────────────────────────────────────

/// Capability interface implemented once per cloud provider.
///
/// The orchestration core depends only on this trait. Adapters translate
/// provider objects into [`InstanceHandle`]s and classify provider errors:
/// a fatal instance error is reported by setting `Readiness::Errored`.
#[allow(async_fn_in_trait)]
pub trait ProviderAdapter {
    /// Provider session returned by `connect`.
    type Connection;

    /// Stable tag recorded on metadata and used to namespace aggregates.
    fn tag(&self) -> &str;

    /// Options that must be present in the request for `create` to work.
    fn required_options(&self) -> &[&str] {
        &[]
    }

    /// Open a session with the provider control plane.
    async fn connect(&self, options: &ProviderOptions) -> Result<Self::Connection>;

    /// Create one instance. Must not wait for it to become ready.
    async fn create(
        &self,
        conn: &Self::Connection,
        name: &str,
        options: &ProviderOptions,
    ) -> Result<InstanceHandle>;

    /// Reload readiness and address fields in place.
    async fn refresh(&self, conn: &Self::Connection, handle: &mut InstanceHandle) -> Result<()>;

    /// Destroy the instance.
    async fn destroy(&self, conn: &Self::Connection, handle: &InstanceHandle) -> Result<()>;

    async fn find_by_id(&self, conn: &Self::Connection, id: &str)
    -> Result<Option<InstanceHandle>>;

    async fn find_by_name(
        &self,
        conn: &Self::Connection,
        name: &str,
    ) -> Result<Option<InstanceHandle>>;

    /// Look an instance up by id first, then by name.
    async fn lookup(
        &self,
        conn: &Self::Connection,
        id_or_name: &str,
    ) -> Result<Option<InstanceHandle>> {
        if let Some(found) = self.find_by_id(conn, id_or_name).await? {
            return Ok(Some(found));
        }
        self.find_by_name(conn, id_or_name).await
    }

    /// List every instance visible to the connection.
    async fn list(&self, _conn: &Self::Connection) -> Result<Vec<InstanceHandle>> {
        Err(ProvisionError::FindUnsupported(self.tag().to_owned()).into())
    }

    /// Provider-specific setup once the instance has an address
    /// (e.g. pushing a public key). No-op by default.
    async fn setup(&self, _conn: &Self::Connection, _handle: &InstanceHandle) -> Result<()> {
        Ok(())
    }

    fn is_ready(&self, handle: &InstanceHandle) -> bool {
        handle.readiness == Readiness::Ready
    }

    fn is_errored(&self, handle: &InstanceHandle) -> bool {
        handle.readiness == Readiness::Errored
    }
}

// ── Remote Shell Ports ────────────────────────────────────────────────────────

/// Opens remote shell sessions against an instance.
#[allow(async_fn_in_trait)]
pub trait RemoteShell {
    type Session: ShellSession;

    /// Establish a session. Connection-level failures are reported as the
    /// matching [`ShellError`] variant so callers can retry them.
    async fn open(&self, target: &SshTarget) -> Result<Self::Session, ShellError>;
}

/// One open remote shell session.
#[allow(async_fn_in_trait)]
pub trait ShellSession {
    /// Run every command in order. A non-zero exit status is a result, not an
    /// error; an `Err` means the channel itself failed mid-batch.
    async fn run(&mut self, commands: &[String]) -> Result<Vec<CommandResult>, ShellError>;
}

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    ///
    /// Implementations should delegate to `run_with_timeout` using the
    /// instance's configured default timeout.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output>;
    /// Run a program with extra environment variables for the child only.
    async fn run_with_env(
        &self,
        program: &str,
        args: &[&str],
        envs: &[(&str, &str)],
    ) -> Result<Output>;
}

// ── Output Port ───────────────────────────────────────────────────────────────

/// Append-only operation transcript. Nothing written here feeds back into
/// control flow. Sync trait — no async needed.
#[cfg_attr(test, mockall::automock)]
pub trait OutputSink {
    fn write_output(&self, text: &str);
}

// ── State and Config Ports ────────────────────────────────────────────────────

/// Persistence of the pipeline context between steps.
#[allow(async_fn_in_trait)]
pub trait ContextStore {
    /// Load the context left by earlier steps, `None` if there is none yet.
    async fn load_async(&self) -> Result<Option<PipelineContext>>;
    /// Persist the given context.
    async fn save_async(&self, ctx: &PipelineContext) -> Result<()>;
}

/// Abstracts loading and saving the configuration file.
pub trait ConfigStore {
    fn load(&self) -> Result<FlotillaConfig>;
    fn save(&self, config: &FlotillaConfig) -> Result<()>;
    fn path(&self) -> Result<std::path::PathBuf>;
}
