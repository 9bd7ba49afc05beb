//! `puda send-batch`: run an ordered batch of commands on one machine.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Args;
use puda_common::PudaConfig;

use crate::application::{BatchOptions, BatchOrchestrator};
use crate::domain::{Attribution, prepare_batch};
use crate::infra::commands_file::{load_commands, load_schema};
use crate::infra::valkey::ValkeyTransport;
use crate::output::{HumanRenderer, JsonRenderer, OutputContext, TerminalReporter};

/// Arguments for the send-batch command.
#[derive(Args)]
pub struct SendBatchArgs {
    /// JSON file holding an array of commands
    #[arg(long)]
    pub commands_file: Option<PathBuf>,

    /// Machine to run the batch on
    #[arg(long, default_value = "first")]
    pub machine_id: String,

    /// User id recorded on every command (overrides PUDA_USER_ID)
    #[arg(long)]
    pub user_id: Option<String>,

    /// Username recorded on every command (overrides PUDA_USERNAME)
    #[arg(long)]
    pub username: Option<String>,

    /// Valkey URL (overrides PUDA_VALKEY_URL)
    #[arg(long)]
    pub valkey_url: Option<String>,

    /// Seconds to wait for each command's reply (overrides PUDA_COMMAND_TIMEOUT_SECS)
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Command catalog to validate the batch against before sending
    #[arg(long, env = "PUDA_SCHEMA")]
    pub schema: Option<PathBuf>,
}

/// Run the send-batch command.
///
/// The batch is fully validated before any connection is opened.
///
/// # Errors
///
/// Returns an error if the batch is invalid, the fabric is unreachable, or
/// any command in the batch does not succeed.
pub async fn run(
    ctx: &OutputContext,
    json: bool,
    args: SendBatchArgs,
    mut config: PudaConfig,
) -> Result<()> {
    if let Some(url) = args.valkey_url {
        config.valkey_url = url;
    }
    if let Some(user_id) = args.user_id {
        config.user_id = Some(user_id);
    }
    if let Some(username) = args.username {
        config.username = Some(username);
    }
    if let Some(secs) = args.timeout {
        config.command_timeout_secs = secs;
    }

    let missing = config.missing_attribution();
    if !missing.is_empty() {
        bail!(
            "Missing attribution: set {} (or pass --user-id/--username)",
            missing.join(" and ")
        );
    }

    let commands_file = match args.commands_file {
        Some(path) => path,
        None => prompt_commands_file(ctx, json)?,
    };

    let specs = load_commands(&commands_file)?;
    let schema = args.schema.as_deref().map(load_schema).transpose()?;
    let requests = prepare_batch(specs, schema.as_ref())
        .with_context(|| format!("invalid batch in {}", commands_file.display()))?;

    let attribution = Attribution::new(
        args.machine_id,
        config.user_id.clone().unwrap_or_default(),
        config.username.clone().unwrap_or_default(),
    );
    attribution.validate()?;
    let timeout_per_command = Duration::from_secs(config.command_timeout_secs);

    let transport = ValkeyTransport::connect(&config)
        .await
        .context("cannot connect to the message fabric")?;
    let reporter = TerminalReporter::new(ctx);
    let outcome = BatchOrchestrator::new(&transport, &config.subject_prefix)
        .run_requests(
            &requests,
            BatchOptions {
                reporter: &reporter,
                attribution: &attribution,
                timeout_per_command,
                schema: None,
            },
        )
        .await;
    drop(reporter);
    transport.shutdown().await;

    let result = outcome?;
    if json {
        JsonRenderer::render_batch_result(&result)?;
    } else {
        HumanRenderer::new(ctx).render_batch_result(&result);
    }

    if !result.success {
        bail!(
            "Batch {} stopped at command {}/{}",
            result.run_id,
            result.failed_at.unwrap_or(result.sent),
            result.total
        );
    }
    Ok(())
}

fn prompt_commands_file(ctx: &OutputContext, json: bool) -> Result<PathBuf> {
    if json || !ctx.is_tty {
        bail!("--commands-file is required in non-interactive mode");
    }
    let path: String = dialoguer::Input::new()
        .with_prompt("Commands file")
        .interact_text()
        .context("reading commands file path")?;
    Ok(PathBuf::from(path.trim()))
}
