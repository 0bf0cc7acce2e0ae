//! Publishing template repositories: git push, then wait for the CI pipeline to
//! attach a release artifact.

use crate::config::Config;
use crate::error::DeployError;
use crate::services::poll::poll;
use crate::services::prompt::Prompter;
use crate::services::shell::{args, CommandRunner};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct Release {
    pub id: u64,
    /// Download URL of the first `.tar.gz` asset.
    pub tarball: Option<String>,
}

pub trait ReleaseSource {
    /// Newest published release of `owner/name`, if any.
    fn latest_release(&self, repo: &str) -> anyhow::Result<Option<Release>>;
}

#[derive(Deserialize)]
struct GithubRelease {
    id: u64,
    #[serde(default)]
    assets: Vec<GithubAsset>,
}

#[derive(Deserialize)]
struct GithubAsset {
    name: String,
    browser_download_url: String,
}

pub struct GithubReleases {
    api_url: String,
    client: reqwest::blocking::Client,
}

impl GithubReleases {
    pub fn new(api_url: &str, timeout_ms: u64) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .user_agent(concat!("datadao/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

impl ReleaseSource for GithubReleases {
    fn latest_release(&self, repo: &str) -> anyhow::Result<Option<Release>> {
        let url = format!("{}/repos/{}/releases/latest", self.api_url, repo);
        let resp = self.client.get(url).send()?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let release: GithubRelease = resp.error_for_status()?.json()?;
        Ok(Some(Release {
            id: release.id,
            tarball: release
                .assets
                .into_iter()
                .find(|a| a.name.ends_with(".tar.gz"))
                .map(|a| a.browser_download_url),
        }))
    }
}

/// Id of the newest release before a push; 0 when there is none or it can't be read.
pub fn release_baseline(releases: &dyn ReleaseSource, repo: &str) -> u64 {
    match releases.latest_release(repo) {
        Ok(r) => r.map(|r| r.id).unwrap_or(0),
        Err(e) => {
            tracing::warn!(repo, error = %e, "could not read current release; any release will be accepted");
            0
        }
    }
}

/// `git add -A`, `git commit`, `git push`. A commit with nothing staged is fine.
pub fn push_repo(
    runner: &dyn CommandRunner,
    git: &str,
    dir: &Path,
    message: &str,
) -> anyhow::Result<()> {
    runner.run(git, &args(&["add", "-A"]), dir)?.check("git add")?;
    let commit = runner.run(git, &args(&["commit", "-m", message]), dir)?;
    if !commit.success {
        let text = commit.combined().to_ascii_lowercase();
        if !(text.contains("nothing to commit") || text.contains("no changes added")) {
            commit.check("git commit")?;
        }
        tracing::info!(dir = %dir.display(), "nothing new to commit");
    }
    runner.run(git, &args(&["push"]), dir)?.check("git push")?;
    tracing::info!(dir = %dir.display(), "pushed");
    Ok(())
}

pub fn validate_artifact_url(url: &str) -> anyhow::Result<String> {
    let u = url.trim();
    if !u.starts_with("https://") || u.len() <= "https://".len() {
        return Err(DeployError::invalid("artifact url", format!("must be an https:// URL: {}", u)).into());
    }
    Ok(u.to_string())
}

/// Waits for a release artifact, falling back to the operator when the
/// pipeline is not configured or does not finish in time. With `after` set,
/// releases with an id at or below it are ignored.
pub fn await_artifact(
    what: &str,
    repo: Option<&str>,
    after: Option<u64>,
    config: &Config,
    releases: &dyn ReleaseSource,
    prompter: &dyn Prompter,
) -> anyhow::Result<String> {
    if let Some(repo) = repo {
        let found = poll(
            &format!("{} release", what),
            config.polling.release_attempts,
            config.polling.release_interval(),
            || {
                Ok(releases
                    .latest_release(repo)?
                    .filter(|r| after.map_or(true, |a| r.id > a))
                    .and_then(|r| r.tarball))
            },
        );
        if let Some(url) = found {
            return validate_artifact_url(&url);
        }
        tracing::warn!(repo, "no release artifact appeared");
    }
    if !prompter.interactive() {
        return Err(DeployError::Timeout(format!("{} release artifact", what)).into());
    }
    let answer = prompter.input(&format!("Paste the {} artifact URL (.tar.gz):", what), None)?;
    validate_artifact_url(&answer)
}
