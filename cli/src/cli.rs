//! CLI argument parsing with clap derive

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags};
use crate::commands;

/// Provision, bootstrap and tear down batches of cloud instances
#[derive(Parser)]
#[command(
    name = "flotilla",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    /// Debug logging on stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Pipeline context file [default: $FLOTILLA_CONTEXT or ./.flotilla/context.json]
    #[arg(long, global = true, value_name = "PATH")]
    pub context: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create instances, wait for them and run bootstrap commands
    Provision(commands::provision::ProvisionArgs),

    /// Destroy recorded or named instances
    Deprovision(commands::deprovision::DeprovisionArgs),

    /// Record existing instances whose name matches a pattern
    Find(commands::find::FindArgs),

    /// Show the recorded pipeline context
    Status,

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<()> {
        let yes = matches!(&self.command, Command::Deprovision(args) if args.yes);
        let app = AppContext::new(&AppFlags {
            output: OutputFlags {
                no_color: self.no_color,
                quiet: self.quiet,
                json: self.json,
            },
            behaviour: BehaviourFlags { yes },
            context: self.context,
        });
        match self.command {
            Command::Provision(args) => commands::provision::run(&app, args).await,
            Command::Deprovision(args) => commands::deprovision::run(&app, args).await,
            Command::Find(args) => commands::find::run(&app, args).await,
            Command::Status => commands::status::run(&app).await,
            Command::Config(cmd) => commands::config::run(&app, cmd),
            Command::Version => commands::version::run(&app),
        }
    }
}
