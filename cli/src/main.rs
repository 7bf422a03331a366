//! Flotilla CLI - provision, bootstrap and tear down batches of cloud instances

use clap::Parser;
use tracing_subscriber::EnvFilter;

use flotilla_cli::cli::Cli;
use flotilla_cli::output::json::format_error;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let filter = if cli.verbose {
        EnvFilter::new("flotilla_cli=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let json = cli.json;
    if let Err(e) = cli.run().await {
        let message = format!("{e:#}");
        match format_error(&message, "error") {
            Ok(obj) if json => println!("{obj}"),
            _ => eprintln!("Error: {message}"),
        }
        std::process::exit(1);
    }
}
