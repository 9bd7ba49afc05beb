//! `puda get-state`: print a machine's last published state.

use anyhow::{Context, Result, bail};
use clap::Args;
use puda_common::PudaConfig;

use crate::application::StateAccessor;
use crate::domain::MachineState;
use crate::infra::valkey::ValkeyTransport;
use crate::output::{HumanRenderer, JsonRenderer, OutputContext};

/// Arguments for the get-state command.
#[derive(Args)]
pub struct GetStateArgs {
    /// Machine ID to retrieve state for
    #[arg(long)]
    pub machine_id: String,

    /// Valkey URL (overrides PUDA_VALKEY_URL)
    #[arg(long)]
    pub valkey_url: Option<String>,
}

/// Run the get-state command.
///
/// # Errors
///
/// Returns an error if the store is unreachable, the record cannot be
/// decoded, or no state has been published for the machine.
pub async fn run(
    ctx: &OutputContext,
    json: bool,
    args: GetStateArgs,
    mut config: PudaConfig,
) -> Result<()> {
    if let Some(url) = args.valkey_url {
        config.valkey_url = url;
    }

    let transport = ValkeyTransport::connect(&config)
        .await
        .context("cannot connect to the message fabric")?;
    let outcome = StateAccessor::new(&transport, &config.state_namespace_prefix)
        .get_state(&args.machine_id)
        .await;
    transport.shutdown().await;

    let state = outcome
        .with_context(|| format!("cannot read state for {}", args.machine_id))?;

    if json {
        JsonRenderer::render_state(&args.machine_id, &state)?;
    } else {
        HumanRenderer::new(ctx).render_state(&args.machine_id, &state);
    }

    if let MachineState::Absent = state {
        bail!("Could not find state for {}", args.machine_id);
    }
    Ok(())
}
