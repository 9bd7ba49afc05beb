use serde::Deserialize;
use std::time::Duration;

use crate::subjects::keys;

/// Client-side configuration shared by every PUDA controller.
///
/// Loaded from `PUDA_*` environment variables; each field maps to
/// `PUDA_<FIELD>` (e.g. `PUDA_VALKEY_URL`). Attribution fields have no
/// default and are checked by the caller that needs them.
#[derive(Debug, Clone, Deserialize)]
pub struct PudaConfig {
    /// Valkey (Redis-compatible) connection URL
    #[serde(default = "default_valkey_url")]
    pub valkey_url: String,

    /// User id recorded on every command for audit
    #[serde(default)]
    pub user_id: Option<String>,

    /// Username recorded on every command for audit
    #[serde(default)]
    pub username: Option<String>,

    /// Seconds to wait for the initial connection
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    /// Seconds to wait for each command's reply
    #[serde(default = "default_command_timeout_secs")]
    pub command_timeout_secs: u64,

    /// Prefix of per-machine state namespaces
    #[serde(default = "default_state_namespace_prefix")]
    pub state_namespace_prefix: String,

    /// Prefix of command and reply subjects
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,
}

fn default_valkey_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

const fn default_connect_timeout_secs() -> u64 {
    10
}

const fn default_command_timeout_secs() -> u64 {
    120
}

fn default_state_namespace_prefix() -> String {
    keys::STATE_NAMESPACE_PREFIX.to_string()
}

fn default_subject_prefix() -> String {
    keys::SUBJECT_PREFIX.to_string()
}

impl Default for PudaConfig {
    fn default() -> Self {
        Self {
            valkey_url: default_valkey_url(),
            user_id: None,
            username: None,
            connect_timeout_secs: default_connect_timeout_secs(),
            command_timeout_secs: default_command_timeout_secs(),
            state_namespace_prefix: default_state_namespace_prefix(),
            subject_prefix: default_subject_prefix(),
        }
    }
}

impl PudaConfig {
    /// Connection timeout as a `Duration`.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    /// Per-command reply timeout as a `Duration`.
    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Names of attribution settings that are missing or blank.
    #[must_use]
    pub fn missing_attribution(&self) -> Vec<&'static str> {
        let blank = |v: &Option<String>| v.as_deref().is_none_or(|s| s.trim().is_empty());
        let mut missing = Vec::new();
        if blank(&self.user_id) {
            missing.push("PUDA_USER_ID");
        }
        if blank(&self.username) {
            missing.push("PUDA_USERNAME");
        }
        missing
    }
}
