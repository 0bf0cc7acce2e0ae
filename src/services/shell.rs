//! Thin wrapper around external tools (deploy framework, cast, git, docker).

use crate::error::DeployError;
use crate::services::storage::mask;
use std::path::Path;

/// Flags whose following value is a secret and must not reach the logs.
const SECRET_FLAGS: &[&str] = &["--private-key", "--raw-private-key"];

#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub code: Option<i32>,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl ToolOutput {
    pub fn combined(&self) -> String {
        format!("{}\n{}", self.stdout, self.stderr)
    }

    /// Last `n` non-empty lines of combined output, for error reports.
    pub fn tail(&self, n: usize) -> String {
        let combined = self.combined();
        let lines: Vec<&str> = combined.lines().filter(|l| !l.trim().is_empty()).collect();
        lines[lines.len().saturating_sub(n)..].join("\n")
    }

    /// Converts a non-zero exit into `ToolFailed`.
    pub fn check(self, tool: &str) -> anyhow::Result<Self> {
        if self.success {
            return Ok(self);
        }
        Err(DeployError::ToolFailed {
            tool: tool.to_string(),
            code: self
                .code
                .map(|c| c.to_string())
                .unwrap_or_else(|| "signal".to_string()),
            detail: self.tail(5),
        }
        .into())
    }
}

pub trait CommandRunner {
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> anyhow::Result<ToolOutput>;
}

pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[String], cwd: &Path) -> anyhow::Result<ToolOutput> {
        tracing::debug!(program, args = ?redact_args(args), cwd = %cwd.display(), "running tool");
        let out = std::process::Command::new(program)
            .args(args)
            .current_dir(cwd)
            .output()
            .map_err(|e| DeployError::ToolFailed {
                tool: program.to_string(),
                code: "spawn".to_string(),
                detail: format!("{} (command not found in PATH?)", e),
            })?;
        Ok(ToolOutput {
            code: out.status.code(),
            success: out.status.success(),
            stdout: String::from_utf8_lossy(&out.stdout).to_string(),
            stderr: String::from_utf8_lossy(&out.stderr).to_string(),
        })
    }
}

/// Copy of `args` with secret flag values masked, for logging.
pub fn redact_args(args: &[String]) -> Vec<String> {
    let mut out = Vec::with_capacity(args.len());
    let mut hide_next = false;
    for a in args {
        if hide_next {
            out.push(mask(a));
            hide_next = false;
            continue;
        }
        match a.split_once('=') {
            Some((flag, value)) if SECRET_FLAGS.contains(&flag) => {
                out.push(format!("{}={}", flag, mask(value)));
            }
            _ => {
                hide_next = SECRET_FLAGS.contains(&a.as_str());
                out.push(a.clone());
            }
        }
    }
    out
}

pub fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

/// `<tool> --version` succeeds.
pub fn tool_available(runner: &dyn CommandRunner, program: &str, cwd: &Path) -> bool {
    runner
        .run(program, &args(&["--version"]), cwd)
        .map(|o| o.success)
        .unwrap_or(false)
}
