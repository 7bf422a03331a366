//! `flotilla deprovision` — destroy recorded or named instances.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::{ConfigStore, ContextStore};
use crate::application::services::deprovision::deprovision;
use crate::commands::{merge_options, parse_option, provider_for};
use crate::domain::DeprovisionRequest;
use crate::domain::context::recorded_ids;
use crate::output::json;

/// Arguments for the deprovision command.
#[derive(Args, Debug)]
pub struct DeprovisionArgs {
    /// Provider adapter [default: from config]
    #[arg(long)]
    pub provider: Option<String>,

    /// Instance id or name (repeatable) [default: every recorded instance]
    #[arg(long = "instance", value_name = "ID")]
    pub instances: Vec<String>,

    /// Skip confirmation prompt
    #[arg(short = 'y', long)]
    pub yes: bool,

    /// Provider option (repeatable)
    #[arg(long = "option", value_name = "KEY=VALUE", value_parser = parse_option)]
    pub options: Vec<(String, String)>,
}

/// Run the deprovision command.
///
/// # Errors
///
/// Returns an error if the provider is unknown, the connection fails or the
/// context cannot be read or written.
pub async fn run(app: &AppContext, args: DeprovisionArgs) -> Result<()> {
    let config = app.config_store.load()?;
    let tag = args.provider.clone().unwrap_or_else(|| config.provider.clone());
    let adapter = provider_for(&tag)?;

    let pending = if args.instances.is_empty() {
        let ctx = app.context_store.load_async().await?.unwrap_or_default();
        recorded_ids(&ctx, &tag).len()
    } else {
        args.instances.len()
    };
    // --yes, CI and FLOTILLA_YES proceed without asking
    if pending > 0
        && !app.non_interactive
        && !app.confirm(&format!("Destroy {pending} {tag} instance(s)?"), false)?
    {
        app.output.info("Aborted");
        return Ok(());
    }

    let request = DeprovisionRequest {
        instances: args.instances,
        options: merge_options(&config.options, &args.options),
    };
    let report = deprovision(&adapter, &app.context_store, &app.sink(), &request).await?;

    if app.is_json() {
        json::print(&report)
    } else {
        app.human().render_deprovision(&report);
        Ok(())
    }
}
