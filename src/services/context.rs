use crate::config::Config;
use crate::error::DeployError;
use crate::services::chain::Chain;
use crate::services::pinning::Pinner;
use crate::services::prompt::Prompter;
use crate::services::releases::ReleaseSource;
use crate::services::shell::CommandRunner;
use std::path::Path;

/// Everything a deployment step may touch besides the state file.
pub struct StepContext<'a> {
    pub project: &'a Path,
    pub config: &'a Config,
    pub runner: &'a dyn CommandRunner,
    pub chain: &'a dyn Chain,
    pub prompter: &'a dyn Prompter,
    pub releases: &'a dyn ReleaseSource,
    pub pinner: &'a dyn Pinner,
}

/// Borrows a required state value or names the command that produces it.
pub fn require<'s>(value: &'s Option<String>, what: &str, command: &str) -> anyhow::Result<&'s str> {
    value
        .as_deref()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| DeployError::missing(what, command).into())
}
