//! Human-readable terminal renderer.

use owo_colors::OwoColorize as _;

use crate::application::services::deprovision::DeprovisionReport;
use crate::application::services::provision::ProvisionOutcome;
use crate::domain::{FlotillaConfig, InstanceHandle, InstanceState, PipelineContext, ResultSet};
use crate::output::OutputContext;

/// Renders command results as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    /// Create a new `HumanRenderer` wrapping the given output context.
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    /// Render the CLI version information.
    pub fn render_version(&self, version: &str) {
        if self.ctx.quiet {
            return;
        }
        self.ctx.info(&format!("flotilla v{version}"));
    }

    /// Summarize a provisioning run, one line per instance.
    pub fn render_provision(&self, outcome: &ProvisionOutcome) {
        if self.ctx.quiet {
            return;
        }
        println!();
        self.ctx.header(&format!(
            "{}: {} of {} provisioned",
            outcome.provider,
            outcome.provisioned(),
            outcome.instances.len()
        ));
        for instance in &outcome.instances {
            let label = format!(
                "{} ({}) {}",
                instance.name,
                instance.id,
                instance.public_address.as_deref().unwrap_or("-")
            );
            match instance.state {
                InstanceState::Provisioned => self.ctx.success(&label),
                InstanceState::AddressTimeout => self.ctx.warn(&format!("{label}: no public ip")),
                InstanceState::BootstrapFailed => {
                    self.ctx.warn(&format!("{label}: bootstrap failed"));
                    for err in &instance.errors {
                        self.ctx.kv("   ", err);
                    }
                }
                _ => self.ctx.error(&format!("{label}: failed to start")),
            }
        }
    }

    pub fn render_deprovision(&self, report: &DeprovisionReport) {
        for id in &report.destroyed {
            self.ctx.success(&format!("destroyed {id}"));
        }
        for id in &report.missing {
            self.ctx.info(&format!("{id} not found"));
        }
        for (id, err) in &report.failed {
            self.ctx.error(&format!("{id}: {err}"));
        }
    }

    pub fn render_found(&self, handles: &[InstanceHandle]) {
        if handles.is_empty() {
            self.ctx.warn("No matching servers");
            return;
        }
        for h in handles {
            self.ctx.kv(
                &h.id,
                &format!(
                    "{}  {}",
                    h.display_name(),
                    h.public_address.as_deref().unwrap_or("-")
                ),
            );
        }
    }

    /// Render the recorded pipeline context.
    pub fn render_status(&self, ctx: &PipelineContext) {
        if self.ctx.quiet {
            return;
        }
        if ctx.cloud.ids.is_empty() && ctx.machines.is_empty() {
            self.ctx.info("Nothing recorded yet");
            return;
        }
        self.ctx.header("Cloud:");
        self.render_set(&ctx.cloud);
        for (tag, set) in &ctx.providers {
            println!();
            self.ctx.header(&format!("{tag}:"));
            self.render_set(set);
        }
        if !ctx.machines.is_empty() {
            println!();
            self.ctx.header("Machines:");
            for m in &ctx.machines {
                println!(
                    "  {}  {}  {}  {}",
                    m.id.style(self.ctx.styles.bold),
                    m.name,
                    if m.address.is_empty() { "-" } else { &m.address },
                    m.provider.style(self.ctx.styles.dim)
                );
            }
        }
        if let Some(at) = ctx.updated_at {
            println!();
            self.ctx.kv("Updated:", &at.to_rfc3339());
        }
    }

    fn render_set(&self, set: &ResultSet) {
        self.ctx.kv("ids:", &set.ids.join(", "));
        self.ctx.kv("ips:", &set.ips.join(", "));
        if !set.private_ips.is_empty() {
            self.ctx.kv("private ips:", &set.private_ips.join(", "));
        }
        self.ctx.kv("names:", &set.names.join(", "));
    }

    pub fn render_config(&self, config: &FlotillaConfig, path: &std::path::Path) {
        self.ctx.header(&format!("Configuration ({}):", path.display()));
        self.ctx.kv("provider:", &config.provider);
        self.ctx.kv("timeout_secs:", &config.timeout_secs.to_string());
        self.ctx
            .kv("poll_interval_secs:", &config.poll_interval_secs.to_string());
        self.ctx.kv("ssh.user:", &config.ssh.user);
        self.ctx
            .kv("ssh.max_attempts:", &config.ssh.max_attempts.to_string());
        self.ctx
            .kv("ssh.retry_delay_secs:", &config.ssh.retry_delay_secs.to_string());
        for (key, value) in &config.options {
            self.ctx.kv(&format!("options.{key}:"), value);
        }
    }
}
