//! Failure kinds and operator-facing remediation hints.

use crate::domain::constants::DEFAULT_FAUCET_URL;
use regex::Regex;

#[derive(thiserror::Error, Debug)]
pub enum DeployError {
    #[error("{what} is missing; run `{command}` first")]
    MissingPrerequisite { what: String, command: String },
    #[error("missing value: {0}")]
    MissingValue(String),
    #[error("invalid {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("`{tool}` failed (exit {code}): {detail}")]
    ToolFailed {
        tool: String,
        code: String,
        detail: String,
    },
    #[error("could not find {0} address in deploy output")]
    AddressNotFound(String),
    #[error("rpc error: {0}")]
    Rpc(String),
    #[error("transaction {0} reverted")]
    Reverted(String),
    #[error("gave up waiting for {0}")]
    Timeout(String),
    #[error("state file {path}: {reason}")]
    StateFile { path: String, reason: String },
}

impl DeployError {
    pub fn missing(what: &str, command: &str) -> Self {
        DeployError::MissingPrerequisite {
            what: what.to_string(),
            command: command.to_string(),
        }
    }

    pub fn invalid(field: &str, reason: impl Into<String>) -> Self {
        DeployError::InvalidValue {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Maps a failure message to canned remediation text by matching known phrases.
pub fn classify(message: &str) -> Option<String> {
    let m = message.to_ascii_lowercase();
    let hint = if m.contains("insufficient funds") {
        format!(
            "The wallet cannot cover the transaction. Fund it from {} and retry.",
            DEFAULT_FAUCET_URL
        )
    } else if m.contains("nonce") {
        "A previous transaction from this wallet is still pending or the nonce is stale. Wait a minute and retry.".to_string()
    } else if m.contains("already registered") {
        "This DataDAO is already registered; run `datadao status` to see the recorded id.".to_string()
    } else if m.contains("reverted") {
        "The contract rejected the call. Check the arguments (a DataDAO name must be unique) and the registration fee.".to_string()
    } else if m.contains("could not connect")
        || m.contains("connection refused")
        || m.contains("timed out")
        || m.contains("dns error")
    {
        "The endpoint did not answer. Check `network.rpc_url` in datadao.toml and your connection.".to_string()
    } else if m.contains("unauthorized") || m.contains("forbidden") || auth_status(&m) {
        "The service rejected the credentials. Re-run `datadao setup` with valid API keys.".to_string()
    } else if m.contains("command not found")
        || m.contains("no such file")
        || m.contains("not found in path")
    {
        "A required tool is not installed; run `datadao doctor` to see which.".to_string()
    } else {
        return None;
    };
    Some(hint)
}

/// A standalone 401/403 status code; digits inside hashes or numbers don't count.
fn auth_status(m: &str) -> bool {
    Regex::new(r"\b(401|403)\b")
        .map(|re| re.is_match(m))
        .unwrap_or(false)
}
