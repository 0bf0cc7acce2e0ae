//! Merging writer for dotenv files consumed by the contracts, refiner and UI
//! checkouts.

use crate::services::storage::write_atomic;
use std::collections::BTreeMap;
use std::path::Path;

/// Reads `KEY=value` pairs; comments, blank lines and malformed lines are skipped.
pub fn read_env(path: &Path) -> anyhow::Result<BTreeMap<String, String>> {
    let mut out = BTreeMap::new();
    if !path.exists() {
        return Ok(out);
    }
    for line in std::fs::read_to_string(path)?.lines() {
        if let Some((k, v)) = parse_line(line) {
            out.insert(k, v);
        }
    }
    Ok(out)
}

fn parse_line(line: &str) -> Option<(String, String)> {
    let l = line.trim();
    if l.is_empty() || l.starts_with('#') {
        return None;
    }
    let l = l.strip_prefix("export ").unwrap_or(l);
    let (k, v) = l.split_once('=')?;
    let k = k.trim();
    if k.is_empty() {
        return None;
    }
    let v = v.trim();
    let v = v
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(v);
    Some((k.to_string(), v.to_string()))
}

fn render_value(v: &str) -> String {
    if v.chars().any(|c| c.is_whitespace() || c == '#' || c == '"') {
        format!("\"{}\"", v.replace('"', "\\\""))
    } else {
        v.to_string()
    }
}

/// Rewrites managed keys in place, appends new ones, and keeps every other
/// line (comments, foreign keys) as it was.
pub fn merge_env(path: &Path, managed: &[(&str, String)]) -> anyhow::Result<()> {
    let existing = if path.exists() {
        std::fs::read_to_string(path)?
    } else {
        String::new()
    };
    let mut pending: Vec<(&str, &String)> = managed.iter().map(|(k, v)| (*k, v)).collect();
    let mut lines = Vec::new();
    for line in existing.lines() {
        let replaced = parse_line(line).and_then(|(k, _)| {
            pending
                .iter()
                .position(|(mk, _)| *mk == k)
                .map(|i| pending.remove(i))
        });
        match replaced {
            Some((k, v)) => lines.push(format!("{}={}", k, render_value(v))),
            None => lines.push(line.to_string()),
        }
    }
    for (k, v) in pending {
        lines.push(format!("{}={}", k, render_value(v)));
    }
    let mut body = lines.join("\n");
    body.push('\n');
    write_atomic(path, &body)?;
    tracing::info!(path = %path.display(), keys = managed.len(), "env file written");
    Ok(())
}
