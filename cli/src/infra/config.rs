//! Configuration loading from `PUDA_*` environment variables.

use anyhow::{Context, Result};
use puda_common::PudaConfig;

/// Environment variable prefix for every setting.
pub const ENV_PREFIX: &str = "PUDA_";

/// Load configuration from `PUDA_*` env vars, falling back to defaults.
///
/// # Errors
///
/// Returns an error if a variable is present but cannot be parsed
/// (e.g. `PUDA_COMMAND_TIMEOUT_SECS=soon`).
pub fn load_from_env() -> Result<PudaConfig> {
    envy::prefixed(ENV_PREFIX)
        .from_env::<PudaConfig>()
        .with_context(|| format!("failed to load config from {ENV_PREFIX}* env vars"))
}

/// Load configuration from an explicit set of variables (used in tests).
///
/// # Errors
///
/// Returns an error if a variable cannot be parsed.
pub fn load_from_iter<I>(vars: I) -> Result<PudaConfig>
where
    I: IntoIterator<Item = (String, String)>,
{
    envy::prefixed(ENV_PREFIX)
        .from_iter::<_, PudaConfig>(vars)
        .with_context(|| format!("failed to load config from {ENV_PREFIX}* env vars"))
}
