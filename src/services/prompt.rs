//! Operator prompts. Non-interactive runs and tests swap in other implementations.

use crate::error::DeployError;
use console::{style, Term};

pub trait Prompter {
    /// Free-text answer; blank input takes `default` when one is given.
    fn input(&self, label: &str, default: Option<&str>) -> anyhow::Result<String>;
    /// Hidden input; blank is allowed and returned as "".
    fn secret(&self, label: &str) -> anyhow::Result<String>;
    fn confirm(&self, label: &str, default: bool) -> anyhow::Result<bool>;
    fn interactive(&self) -> bool;
}

pub struct TermPrompter {
    term: Term,
}

impl TermPrompter {
    pub fn new() -> Self {
        Self {
            term: Term::stderr(),
        }
    }
}

impl Default for TermPrompter {
    fn default() -> Self {
        Self::new()
    }
}

impl Prompter for TermPrompter {
    fn input(&self, label: &str, default: Option<&str>) -> anyhow::Result<String> {
        loop {
            match default {
                Some(d) => self
                    .term
                    .write_str(&format!("{} {} ", style(label).bold(), style(format!("[{}]", d)).dim()))?,
                None => self.term.write_str(&format!("{} ", style(label).bold()))?,
            }
            let line = self.term.read_line()?;
            let line = line.trim();
            if !line.is_empty() {
                return Ok(line.to_string());
            }
            if let Some(d) = default {
                return Ok(d.to_string());
            }
            self.term.write_line(&format!("{}", style("a value is required").yellow()))?;
        }
    }

    fn secret(&self, label: &str) -> anyhow::Result<String> {
        self.term.write_str(&format!("{} ", style(label).bold()))?;
        Ok(self.term.read_secure_line()?.trim().to_string())
    }

    fn confirm(&self, label: &str, default: bool) -> anyhow::Result<bool> {
        let hint = if default { "[Y/n]" } else { "[y/N]" };
        self.term.write_str(&format!("{} {} ", style(label).bold(), hint))?;
        let line = self.term.read_line()?.trim().to_ascii_lowercase();
        Ok(match line.as_str() {
            "" => default,
            "y" | "yes" => true,
            _ => false,
        })
    }

    fn interactive(&self) -> bool {
        true
    }
}

/// Answers with defaults and refuses anything that has none.
pub struct NoPrompt;

impl Prompter for NoPrompt {
    fn input(&self, label: &str, default: Option<&str>) -> anyhow::Result<String> {
        default
            .map(|d| d.to_string())
            .ok_or_else(|| DeployError::MissingValue(label.trim_end_matches(':').to_string()).into())
    }

    fn secret(&self, label: &str) -> anyhow::Result<String> {
        Err(DeployError::MissingValue(label.trim_end_matches(':').to_string()).into())
    }

    fn confirm(&self, _label: &str, default: bool) -> anyhow::Result<bool> {
        Ok(default)
    }

    fn interactive(&self) -> bool {
        false
    }
}
