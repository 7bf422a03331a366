//! `flotilla find` — record existing instances matching a name pattern.

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::ports::ConfigStore;
use crate::application::services::find::find_by_pattern;
use crate::commands::{merge_options, parse_option, provider_for};
use crate::output::json;

/// Arguments for the find command.
#[derive(Args, Debug)]
pub struct FindArgs {
    /// Regular expression matched against instance names
    pub pattern: String,

    /// Provider adapter [default: from config]
    #[arg(long)]
    pub provider: Option<String>,

    /// Provider option (repeatable)
    #[arg(long = "option", value_name = "KEY=VALUE", value_parser = parse_option)]
    pub options: Vec<(String, String)>,
}

/// Run the find command.
///
/// # Errors
///
/// Returns an error on an invalid pattern, an unknown provider, a provider
/// that cannot list instances or a context store failure.
pub async fn run(app: &AppContext, args: FindArgs) -> Result<()> {
    let config = app.config_store.load()?;
    let tag = args.provider.clone().unwrap_or_else(|| config.provider.clone());
    let adapter = provider_for(&tag)?;
    let options = merge_options(&config.options, &args.options);

    let found =
        find_by_pattern(&adapter, &app.context_store, &app.sink(), &args.pattern, &options)
            .await?;

    if app.is_json() {
        json::print(&found)
    } else {
        app.human().render_found(&found);
        Ok(())
    }
}
