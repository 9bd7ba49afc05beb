//! `puda commands`: list the commands a machine accepts.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Args;

use crate::domain::schema::{CatalogFile, SchemaRegistry};
use crate::infra::commands_file::load_schema;
use crate::output::{HumanRenderer, JsonRenderer, OutputContext};

/// Arguments for the commands command.
#[derive(Args)]
pub struct CatalogArgs {
    /// Command catalog (JSON) shipped with the machine driver
    #[arg(long, env = "PUDA_SCHEMA")]
    pub schema: PathBuf,

    /// Show only this command
    #[arg(long)]
    pub name: Option<String>,
}

/// Run the commands command.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded or `--name` is unknown.
pub fn run(ctx: &OutputContext, json: bool, args: &CatalogArgs) -> Result<()> {
    let registry = load_schema(&args.schema)?;

    let registry = match &args.name {
        Some(name) => {
            let Some(command) = registry.get(name) else {
                bail!("Unknown command '{name}' in {}", args.schema.display());
            };
            SchemaRegistry::from_catalog(CatalogFile {
                machine: registry.machine().map(str::to_owned),
                commands: vec![command.clone()],
            })
        }
        None => registry,
    };

    if json {
        JsonRenderer::render_catalog(&registry)
    } else {
        HumanRenderer::new(ctx).render_catalog(&registry);
        Ok(())
    }
}
