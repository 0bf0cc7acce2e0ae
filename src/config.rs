//! `datadao.toml` loading.
//!
//! Every section is optional; a missing file yields the Moksha testnet defaults.
//! `DATADAO_RPC_URL` and `DATADAO_CHAIN_ID` override the file.

use crate::domain::constants::*;
use crate::error::DeployError;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub network: NetworkConfig,
    pub contracts: ContractsConfig,
    pub tools: ToolsConfig,
    pub polling: PollingConfig,
    pub services: ServicesConfig,
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub explorer_url: String,
    pub faucet_url: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            rpc_url: DEFAULT_RPC_URL.to_string(),
            chain_id: DEFAULT_CHAIN_ID,
            explorer_url: DEFAULT_EXPLORER_URL.to_string(),
            faucet_url: DEFAULT_FAUCET_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ContractsConfig {
    pub dlp_registry: String,
    pub data_refiner_registry: String,
    pub data_registry: String,
    /// Decimal string; wei amounts overflow TOML integers.
    pub registration_fee_wei: String,
}

impl Default for ContractsConfig {
    fn default() -> Self {
        Self {
            dlp_registry: DLP_REGISTRY_ADDRESS.to_string(),
            data_refiner_registry: DATA_REFINER_REGISTRY_ADDRESS.to_string(),
            data_registry: DATA_REGISTRY_ADDRESS.to_string(),
            registration_fee_wei: REGISTRATION_FEE_WEI.to_string(),
        }
    }
}

impl ContractsConfig {
    pub fn registration_fee(&self) -> anyhow::Result<u128> {
        self.registration_fee_wei
            .trim()
            .parse::<u128>()
            .map_err(|e| DeployError::invalid("contracts.registration_fee_wei", e.to_string()).into())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Program followed by its arguments, run inside the contracts directory.
    pub deploy_command: Vec<String>,
    pub cast: String,
    pub git: String,
    pub docker: String,
    pub docker_enabled: bool,
    pub docker_image: String,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            deploy_command: [
                "npx",
                "hardhat",
                "deploy",
                "--network",
                "moksha",
                "--tags",
                "DLPDeploy",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            cast: "cast".to_string(),
            git: "git".to_string(),
            docker: "docker".to_string(),
            docker_enabled: true,
            docker_image: "datadao-refiner".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    pub tx_attempts: u32,
    pub tx_interval_secs: u64,
    pub release_attempts: u32,
    pub release_interval_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            tx_attempts: 60,
            tx_interval_secs: 5,
            release_attempts: 20,
            release_interval_secs: 30,
        }
    }
}

impl PollingConfig {
    pub fn tx_interval(&self) -> Duration {
        Duration::from_secs(self.tx_interval_secs)
    }

    pub fn release_interval(&self) -> Duration {
        Duration::from_secs(self.release_interval_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServicesConfig {
    pub pinata_api_url: String,
    pub ipfs_gateway: String,
    pub github_api_url: String,
    pub nextauth_url: String,
    pub http_timeout_ms: u64,
}

impl Default for ServicesConfig {
    fn default() -> Self {
        Self {
            pinata_api_url: PINATA_API_URL.to_string(),
            ipfs_gateway: IPFS_GATEWAY.to_string(),
            github_api_url: GITHUB_API_URL.to_string(),
            nextauth_url: DEFAULT_NEXTAUTH_URL.to_string(),
            http_timeout_ms: 15_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub contracts_dir: String,
    pub proof_dir: String,
    pub refiner_dir: String,
    pub ui_dir: String,
    /// Relative to `proof_dir`.
    pub proof_config_file: String,
    /// Relative to `refiner_dir`.
    pub schema_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            contracts_dir: "contracts".to_string(),
            proof_dir: "proof".to_string(),
            refiner_dir: "refiner".to_string(),
            ui_dir: "ui".to_string(),
            proof_config_file: "my_proof/__main__.py".to_string(),
            schema_file: "schema.json".to_string(),
        }
    }
}

impl PathsConfig {
    pub fn contracts(&self, project: &Path) -> PathBuf {
        project.join(&self.contracts_dir)
    }

    pub fn proof(&self, project: &Path) -> PathBuf {
        project.join(&self.proof_dir)
    }

    pub fn refiner(&self, project: &Path) -> PathBuf {
        project.join(&self.refiner_dir)
    }

    pub fn ui(&self, project: &Path) -> PathBuf {
        project.join(&self.ui_dir)
    }
}

pub fn load_config(project: &Path) -> anyhow::Result<Config> {
    let path = project.join(CONFIG_FILE);
    let mut config = if path.exists() {
        let raw = std::fs::read_to_string(&path)?;
        toml::from_str(&raw).map_err(|e| DeployError::invalid(CONFIG_FILE, e.to_string()))?
    } else {
        Config::default()
    };
    apply_env_overrides(&mut config)?;
    tracing::debug!(rpc = %config.network.rpc_url, chain_id = config.network.chain_id, "config loaded");
    Ok(config)
}

fn apply_env_overrides(config: &mut Config) -> anyhow::Result<()> {
    if let Ok(url) = std::env::var("DATADAO_RPC_URL") {
        if !url.trim().is_empty() {
            config.network.rpc_url = url.trim().to_string();
        }
    }
    if let Ok(id) = std::env::var("DATADAO_CHAIN_ID") {
        config.network.chain_id = id
            .trim()
            .parse()
            .map_err(|_| DeployError::invalid("DATADAO_CHAIN_ID", "not an integer"))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_sections_fall_back_to_defaults() {
        let cfg: Config = toml::from_str(
            r#"
            [network]
            rpc_url = "http://127.0.0.1:8545"

            [polling]
            tx_attempts = 3
            "#,
        )
        .expect("parse config");
        assert_eq!(cfg.network.rpc_url, "http://127.0.0.1:8545");
        assert_eq!(cfg.network.chain_id, DEFAULT_CHAIN_ID);
        assert_eq!(cfg.polling.tx_attempts, 3);
        assert_eq!(cfg.polling.tx_interval_secs, 5);
        assert_eq!(cfg.tools.deploy_command[0], "npx");
        assert_eq!(cfg.paths.ui_dir, "ui");
    }

    #[test]
    fn registration_fee_parses_large_values() {
        let cfg = ContractsConfig::default();
        assert_eq!(
            cfg.registration_fee().expect("fee"),
            1_000_000_000_000_000_000
        );
        let bad = ContractsConfig {
            registration_fee_wei: "one".to_string(),
            ..ContractsConfig::default()
        };
        assert!(bad.registration_fee().is_err());
    }

    #[test]
    fn missing_file_is_default() {
        let dir = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(dir.path()).expect("load");
        assert_eq!(cfg.tools.cast, "cast");
    }
}
