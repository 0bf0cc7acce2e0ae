use crate::domain::constants::STATE_FILE;
use crate::domain::models::{DeploymentState, Flag, Step, StepError};
use crate::error::{classify, DeployError};
use std::path::{Path, PathBuf};

/// Owns `deployment.json` for one project directory.
pub struct StateManager {
    path: PathBuf,
    pub state: DeploymentState,
}

impl StateManager {
    pub fn load(project: &Path) -> anyhow::Result<Self> {
        let path = project.join(STATE_FILE);
        let state = if path.exists() {
            let raw = std::fs::read_to_string(&path)?;
            serde_json::from_str(&raw).map_err(|e| DeployError::StateFile {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?
        } else {
            DeploymentState::default()
        };
        Ok(Self { path, state })
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self) -> anyhow::Result<()> {
        write_atomic(&self.path, &serde_json::to_string_pretty(&self.state)?)?;
        tracing::debug!(path = %self.path.display(), "state saved");
        Ok(())
    }

    pub fn is_done(&self, flag: Flag) -> bool {
        self.state.state.get(flag)
    }

    /// Sets a flag and persists immediately.
    pub fn mark(&mut self, flag: Flag) -> anyhow::Result<()> {
        self.state.state.set(flag, true);
        tracing::info!(flag = flag.key(), "step flag set");
        self.save()
    }

    pub fn record_error(&mut self, step: Step, message: &str) -> Option<String> {
        let hint = classify(message);
        self.state.errors.insert(
            step.name().to_string(),
            StepError {
                message: message.to_string(),
                hint: hint.clone(),
                timestamp: chrono::Utc::now().to_rfc3339(),
            },
        );
        hint
    }

    pub fn clear_error(&mut self, step: Step) {
        self.state.errors.remove(step.name());
    }

    pub fn reset_step(&mut self, step: Step) {
        for flag in step.flags() {
            self.state.state.set(*flag, false);
        }
        self.clear_error(step);
    }

    pub fn reset_all(&mut self) {
        for flag in Flag::ALL {
            self.state.state.set(flag, false);
        }
        self.state.errors.clear();
    }

    /// Invariant violations between completion flags and the values they imply.
    pub fn validate(&self) -> Vec<String> {
        let s = &self.state;
        let mut warnings = Vec::new();
        if s.state.contracts_deployed && (s.token_address.is_none() || s.proxy_address.is_none()) {
            warnings.push("contractsDeployed is set but tokenAddress/proxyAddress is missing".to_string());
        }
        if s.state.data_dao_registered && s.dlp_id.is_none() {
            warnings.push("dataDAORegistered is set but dlpId is missing".to_string());
        }
        if s.state.proof_published && s.proof_url.is_none() {
            warnings.push("proofPublished is set but proofUrl is missing".to_string());
        }
        if s.state.refiner_published && s.refiner_url.is_none() {
            warnings.push("refinerPublished is set but refinerUrl is missing".to_string());
        }
        if s.state.refiner_registered && s.refiner_id.is_none() {
            warnings.push("refinerRegistered is set but refinerId is missing".to_string());
        }
        warnings
    }

    /// First step whose completion flag is unset.
    pub fn next_step(&self) -> Option<Step> {
        Step::ORDER
            .into_iter()
            .find(|s| !self.is_done(s.completion_flag()))
    }
}

/// Writes through a sibling temp file so readers never see a partial file.
pub fn write_atomic(path: &Path, contents: &str) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "state".to_string());
    let tmp = path.with_file_name(format!(".{}.tmp", file_name));
    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

/// Shows only the last four characters of a secret.
pub fn mask(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "*".repeat(chars.len());
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}", "*".repeat(8), tail)
}
