//! `flotilla status` — show the recorded pipeline context.

use anyhow::Result;

use crate::app::AppContext;
use crate::application::ports::ContextStore;
use crate::output::json;

/// Run the status command.
///
/// # Errors
///
/// Returns an error if the context file exists but cannot be read.
pub async fn run(app: &AppContext) -> Result<()> {
    let ctx = app.context_store.load_async().await?.unwrap_or_default();
    if app.is_json() {
        return json::print(&ctx);
    }
    app.human().render_status(&ctx);
    Ok(())
}
