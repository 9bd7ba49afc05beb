use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};

/// Subject and namespace prefixes for machine traffic
pub mod keys {
    /// Default prefix for every pub/sub subject.
    /// Format: {prefix}.{machine_id}.cmd.queue
    pub const SUBJECT_PREFIX: &str = "puda";

    /// Default prefix of the per-machine state namespace.
    /// Format: {prefix}_{sanitized_machine_id}
    /// Field: raw machine_id
    /// Value: JSON-serialized machine state record
    pub const STATE_NAMESPACE_PREFIX: &str = "MACHINE_STATE";

    /// Command queue segment, appended after the machine id
    pub const COMMAND_QUEUE: &str = "cmd.queue";

    /// Reply segment; the correlation token follows it
    pub const COMMAND_REPLY: &str = "cmd.reply";
}

/// Bytes that must be escaped in a namespace name.
///
/// Everything outside `[A-Za-z0-9_.]` is percent-encoded. `-` and `%` are in
/// the set, so after `.` is rewritten to `-` every output byte decodes back to
/// exactly one input byte.
const NAMESPACE_ESCAPE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'_').remove(b'.');

/// Subject on which a machine consumes queued commands.
pub fn command_subject(prefix: &str, machine_id: &str) -> String {
    format!("{prefix}.{machine_id}.{}", keys::COMMAND_QUEUE)
}

/// Reply subject for one correlated command.
pub fn reply_subject(prefix: &str, machine_id: &str, command_id: &str) -> String {
    format!("{prefix}.{machine_id}.{}.{command_id}", keys::COMMAND_REPLY)
}

/// Rewrite a machine id into a form that is safe inside a namespace name.
///
/// `.` becomes `-` (so `lab.first` maps to `lab-first`), ASCII alphanumerics
/// and `_` pass through, every other byte is percent-encoded (`-` → `%2D`).
pub fn sanitize_machine_id(machine_id: &str) -> String {
    utf8_percent_encode(machine_id, NAMESPACE_ESCAPE)
        .to_string()
        .replace('.', "-")
}

/// Namespace holding the state record of `machine_id`.
pub fn derive_namespace(prefix: &str, machine_id: &str) -> String {
    format!("{prefix}_{}", sanitize_machine_id(machine_id))
}

/// Validate a machine id before it is used to build subjects or namespaces.
///
/// Machine ids are opaque, but they end up inside pub/sub subjects where
/// whitespace and the `*`/`>`/`?` wildcard characters would change the
/// subject's meaning.
pub fn validate_machine_id(machine_id: &str) -> Result<(), &'static str> {
    if machine_id.is_empty() {
        return Err("machine_id must not be empty");
    }
    if machine_id.len() > 128 {
        return Err("machine_id must be at most 128 bytes");
    }
    if machine_id
        .chars()
        .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '*' | '>' | '?' | '[' | ']'))
    {
        return Err("machine_id must not contain whitespace or wildcard characters");
    }
    Ok(())
}
