//! Reference `ProviderAdapter` driving the local `multipass` CLI.
//!
//! Multipass identifies instances by name, so an instance's id and name are
//! the same string. `launch` returns once the instance has booted; readiness
//! and addresses then come from `multipass info`.

use std::collections::BTreeMap;
use std::process::Output;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

use crate::application::ports::{CommandRunner, ProviderAdapter};
use crate::domain::{InstanceHandle, ProviderOptions, Readiness};
use crate::infra::command_runner::{DEFAULT_CMD_TIMEOUT, LAUNCH_TIMEOUT, TokioCommandRunner};

/// Tag recorded on metadata and aggregates.
pub const MULTIPASS_TAG: &str = "multipass";

/// Options passed straight through to `multipass launch`.
pub const LAUNCH_OPTIONS: &[(&str, &str)] = &[
    ("cpus", "--cpus"),
    ("memory", "--memory"),
    ("disk", "--disk"),
    ("cloud_init", "--cloud-init"),
];

#[derive(Debug, Deserialize)]
struct InfoReply {
    #[serde(default)]
    info: BTreeMap<String, InstanceInfo>,
}

#[derive(Debug, Deserialize)]
struct ListReply {
    #[serde(default)]
    list: Vec<ListEntry>,
}

#[derive(Debug, Deserialize)]
struct InstanceInfo {
    state: String,
    #[serde(default)]
    ipv4: Vec<String>,
    #[serde(default)]
    image_release: Option<String>,
    #[serde(default)]
    release: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListEntry {
    name: String,
    #[serde(flatten)]
    info: InstanceInfo,
}

/// Map a multipass state string to readiness.
fn readiness(state: &str) -> Readiness {
    match state {
        "Running" => Readiness::Ready,
        "Unknown" | "Deleted" | "Suspended" => Readiness::Errored,
        _ => Readiness::NotReady,
    }
}

fn apply(handle: &mut InstanceHandle, info: InstanceInfo) {
    handle.readiness = readiness(&info.state);
    handle.state = Some(info.state);
    handle.public_address = info.ipv4.first().cloned();
    handle.private_address = info.ipv4.get(1).cloned();
    handle.image_ref = info.image_release.or(info.release);
}

fn stderr_text(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).trim().to_owned()
}

/// `ProviderAdapter` for multipass, generic over `R: CommandRunner` so tests
/// can replay canned CLI output.
pub struct MultipassAdapter<R: CommandRunner> {
    runner: R,
}

impl MultipassAdapter<TokioCommandRunner> {
    /// Adapter driving the local `multipass` binary.
    #[must_use]
    pub fn local() -> Self {
        Self::new(TokioCommandRunner::new(DEFAULT_CMD_TIMEOUT))
    }
}

impl<R: CommandRunner> MultipassAdapter<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    async fn info(&self, name: &str) -> Result<Option<InstanceInfo>> {
        let output = self
            .runner
            .run("multipass", &["info", name, "--format", "json"])
            .await
            .context("multipass info")?;
        if !output.status.success() {
            let stderr = stderr_text(&output);
            if stderr.contains("does not exist") {
                return Ok(None);
            }
            anyhow::bail!("multipass info {name} failed: {stderr}");
        }
        let mut reply: InfoReply =
            serde_json::from_slice(&output.stdout).context("parsing multipass info output")?;
        Ok(reply.info.remove(name))
    }
}

impl<R: CommandRunner> ProviderAdapter for MultipassAdapter<R> {
    type Connection = ();

    fn tag(&self) -> &str {
        MULTIPASS_TAG
    }

    async fn connect(&self, _options: &ProviderOptions) -> Result<()> {
        let output = self
            .runner
            .run("multipass", &["version"])
            .await
            .context("multipass is not installed or not on PATH")?;
        if !output.status.success() {
            anyhow::bail!("multipass daemon unavailable: {}", stderr_text(&output));
        }
        Ok(())
    }

    async fn create(&self, _: &(), name: &str, options: &ProviderOptions) -> Result<InstanceHandle> {
        let mut args = vec!["launch"];
        if let Some(image) = options.get("image").filter(|v| !v.is_empty()) {
            args.push(image.as_str());
        }
        args.extend(["--name", name]);
        for (key, flag) in LAUNCH_OPTIONS {
            if let Some(value) = options.get(*key).filter(|v| !v.is_empty()) {
                args.extend([*flag, value.as_str()]);
            }
        }
        debug!(?args, "multipass launch");
        let output = self
            .runner
            .run_with_timeout("multipass", &args, LAUNCH_TIMEOUT)
            .await
            .context("multipass launch")?;
        if !output.status.success() {
            anyhow::bail!("multipass launch {name} failed: {}", stderr_text(&output));
        }
        Ok(InstanceHandle::new(name, name))
    }

    async fn refresh(&self, _: &(), handle: &mut InstanceHandle) -> Result<()> {
        match self.info(&handle.id).await? {
            Some(info) => apply(handle, info),
            None => {
                handle.readiness = Readiness::Errored;
                handle.state = Some("Deleted".into());
            }
        }
        Ok(())
    }

    async fn destroy(&self, _: &(), handle: &InstanceHandle) -> Result<()> {
        let output = self
            .runner
            .run("multipass", &["delete", "--purge", &handle.id])
            .await
            .context("multipass delete")?;
        if !output.status.success() {
            anyhow::bail!("multipass delete {} failed: {}", handle.id, stderr_text(&output));
        }
        Ok(())
    }

    async fn find_by_id(&self, _: &(), id: &str) -> Result<Option<InstanceHandle>> {
        Ok(self.info(id).await?.map(|info| {
            let mut handle = InstanceHandle::new(id, id);
            apply(&mut handle, info);
            handle
        }))
    }

    async fn find_by_name(&self, conn: &(), name: &str) -> Result<Option<InstanceHandle>> {
        self.find_by_id(conn, name).await
    }

    async fn list(&self, _: &()) -> Result<Vec<InstanceHandle>> {
        let output = self
            .runner
            .run("multipass", &["list", "--format", "json"])
            .await
            .context("multipass list")?;
        if !output.status.success() {
            anyhow::bail!("multipass list failed: {}", stderr_text(&output));
        }
        let reply: ListReply =
            serde_json::from_slice(&output.stdout).context("parsing multipass list output")?;
        Ok(reply
            .list
            .into_iter()
            .map(|entry| {
                let mut handle = InstanceHandle::new(entry.name.clone(), entry.name);
                apply(&mut handle, entry.info);
                handle
            })
            .collect())
    }
}
