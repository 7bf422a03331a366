//! `flotilla provision` — create, wait for and bootstrap a batch of instances.

use std::time::Duration;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::ConfigStore;
use crate::application::retry::RetryPolicy;
use crate::application::services::provision::{ProvisionSettings, provision};
use crate::application::services::readiness::PollSettings;
use crate::commands::{merge_options, parse_option, provider_for};
use crate::domain::config::MAX_WAIT_SECS;
use crate::domain::{FlotillaConfig, ProvisionRequest, SshCredential};
use crate::infra::ssh::OpenSshShell;
use crate::output::json;

/// Arguments for the provision command.
#[derive(Args, Debug)]
pub struct ProvisionArgs {
    /// Provider adapter [default: from config]
    #[arg(long)]
    pub provider: Option<String>,

    /// Number of instances to create
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub count: u32,

    /// Instance name, or basename when it is taken or count > 1
    #[arg(long)]
    pub name: Option<String>,

    /// Command to run on every ready instance (repeatable, runs in order)
    #[arg(long = "ssh-command", value_name = "CMD")]
    pub ssh_commands: Vec<String>,

    /// Remote user [default: from config]
    #[arg(long)]
    pub ssh_user: Option<String>,

    #[arg(long, default_value_t = 22)]
    pub ssh_port: u16,

    /// Private key file for SSH
    #[arg(long)]
    pub private_key_path: Option<String>,

    /// Inline private key material
    #[arg(long, env = "FLOTILLA_SSH_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,

    /// Password for SSH
    #[arg(long, env = "FLOTILLA_SSH_PASSWORD", hide_env_values = true)]
    pub ssh_password: Option<String>,

    /// Accept instances without waiting for a public address
    #[arg(long)]
    pub no_wait_public_ip: bool,

    /// Readiness deadline in seconds [default: from config]
    #[arg(
        long,
        value_name = "SECS",
        value_parser = clap::value_parser!(u64).range(1..=MAX_WAIT_SECS)
    )]
    pub timeout: Option<u64>,

    /// Provider option (repeatable)
    #[arg(long = "option", value_name = "KEY=VALUE", value_parser = parse_option)]
    pub options: Vec<(String, String)>,
}

impl ProvisionArgs {
    fn request(&self, config: &FlotillaConfig) -> ProvisionRequest {
        ProvisionRequest {
            count: self.count,
            name: self.name.clone(),
            commands: self.ssh_commands.clone(),
            ssh_user: self.ssh_user.clone().unwrap_or_else(|| config.ssh.user.clone()),
            ssh_port: self.ssh_port,
            credential: SshCredential {
                private_key: self.private_key.clone(),
                private_key_path: self.private_key_path.clone(),
                password: self.ssh_password.clone(),
            },
            wait_for_public_ip: !self.no_wait_public_ip,
            options: merge_options(&config.options, &self.options),
        }
    }

    fn settings(&self, config: &FlotillaConfig) -> ProvisionSettings {
        ProvisionSettings {
            poll: PollSettings {
                timeout: self.timeout.map_or_else(|| config.timeout(), Duration::from_secs),
                interval: config.poll_interval(),
            },
            retry: RetryPolicy::new(
                config.ssh.max_attempts,
                Duration::from_secs(config.ssh.retry_delay_secs),
            ),
        }
    }
}

/// Run the provision command.
///
/// # Errors
///
/// Returns an error if configuration cannot be loaded or the run fails.
pub async fn run(app: &AppContext, args: ProvisionArgs) -> Result<()> {
    let config = app.config_store.load()?;
    let tag = args.provider.clone().unwrap_or_else(|| config.provider.clone());
    let adapter = provider_for(&tag)?;
    let shell = OpenSshShell::local();

    let outcome = provision(
        &adapter,
        &shell,
        &app.context_store,
        &app.sink(),
        &args.request(&config),
        args.settings(&config),
    )
    .await?;

    if app.is_json() {
        json::print(&outcome)
    } else {
        app.human().render_provision(&outcome);
        Ok(())
    }
}
