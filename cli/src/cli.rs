//! CLI argument parsing with clap derive

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;
use crate::infra::config::load_from_env;
use crate::output::OutputContext;

/// Dispatch commands to PUDA lab machines
#[derive(Parser)]
#[command(
    name = "puda",
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

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Send an ordered batch of commands to a machine
    SendBatch(commands::send_batch::SendBatchArgs),

    /// Show a machine's last published state
    GetState(commands::get_state::GetStateArgs),

    /// List the commands a machine accepts
    Commands(commands::catalog::CatalogArgs),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid or the command fails.
    pub async fn run(self) -> Result<()> {
        let Cli {
            no_color,
            quiet,
            json,
            command,
        } = self;
        // JSON mode keeps stdout to the document alone.
        let ctx = OutputContext::new(no_color, quiet || json);
        match command {
            Command::Version => {
                commands::version::run(&ctx, json);
                Ok(())
            }
            Command::Commands(args) => commands::catalog::run(&ctx, json, &args),
            Command::SendBatch(args) => {
                commands::send_batch::run(&ctx, json, args, load_from_env()?).await
            }
            Command::GetState(args) => {
                commands::get_state::run(&ctx, json, args, load_from_env()?).await
            }
        }
    }
}
