#![allow(dead_code)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub const PRIVATE_KEY: &str = "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
pub const OWNER: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";
pub const TOKEN: &str = "0x1111111111111111111111111111111111111111";
pub const PROXY: &str = "0x2222222222222222222222222222222222222222";
pub const VESTING: &str = "0x4444444444444444444444444444444444444444";

/// Variables a developer shell might carry into the binary.
const LEAKY_ENV: &[&str] = &[
    "DATADAO_PRIVATE_KEY",
    "DATADAO_RPC_URL",
    "DATADAO_CHAIN_ID",
    "PINATA_API_KEY",
    "PINATA_API_SECRET",
    "GOOGLE_CLIENT_ID",
    "GOOGLE_CLIENT_SECRET",
    "GITHUB_USERNAME",
    "RUST_LOG",
];

pub struct TestEnv {
    _tmp: TempDir,
    pub project: PathBuf,
}

impl TestEnv {
    /// A project whose network endpoints point at a closed local port.
    pub fn new() -> Self {
        let tmp = TempDir::new().expect("create temp dir");
        let project = tmp.path().join("my-dao");
        fs::create_dir_all(project.join("contracts")).expect("create contracts checkout");
        write_config(&project, &deploy_script());
        Self { _tmp: tmp, project }
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = cargo_bin_cmd!("datadao");
        for var in LEAKY_ENV {
            cmd.env_remove(var);
        }
        cmd.arg("--project-dir")
            .arg(&self.project)
            .arg("--non-interactive");
        cmd
    }

    pub fn run_json(&self, args: &[&str]) -> Value {
        let out = self
            .cmd()
            .arg("--json")
            .args(args)
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&out).expect("valid json output")
    }

    pub fn fail_json(&self, args: &[&str]) -> Value {
        let out = self
            .cmd()
            .arg("--json")
            .args(args)
            .assert()
            .failure()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&out).expect("valid json error")
    }

    pub fn setup(&self) -> Value {
        self.run_json(&[
            "setup",
            "--dlp-name",
            "Sleep Data DAO",
            "--token-name",
            "Sleep Token",
            "--token-symbol",
            "sleep",
            "--private-key",
            PRIVATE_KEY,
            "--address",
            OWNER,
            "--public-key",
            "0x04abcdef",
            "--pinata-api-key",
            "pk",
            "--pinata-api-secret",
            "pinata-secret-value",
            "--google-client-id",
            "gid.apps.googleusercontent.com",
            "--google-client-secret",
            "google-secret-value",
            "--github-username",
            "octo",
            "--skip-checks",
        ])
    }

    pub fn state(&self) -> Value {
        let raw = fs::read_to_string(self.project.join("deployment.json")).expect("read state");
        serde_json::from_str(&raw).expect("state json")
    }

    pub fn write_state(&self, state: &Value) {
        fs::write(
            self.project.join("deployment.json"),
            serde_json::to_string_pretty(state).expect("serialize state"),
        )
        .expect("write state");
    }
}

/// Stands in for the hardhat deploy: prints the lines the real one prints.
fn deploy_script() -> String {
    format!(
        "echo 'Compiling 42 files'; \
         echo 'Token deployed to: {TOKEN}'; \
         echo 'DataLiquidityPoolProxy deployed to: {PROXY}'; \
         echo 'VestingWallet deployed to: {VESTING}'"
    )
}

pub fn write_config(project: &Path, script: &str) {
    let body = format!(
        r#"[network]
rpc_url = "http://127.0.0.1:9"

[tools]
deploy_command = ["sh", "-c", "{script}"]
cast = "datadao-test-missing-cast"
git = "datadao-test-missing-git"
docker = "datadao-test-missing-docker"

[polling]
tx_attempts = 1
tx_interval_secs = 0
release_attempts = 1
release_interval_secs = 0

[services]
pinata_api_url = "http://127.0.0.1:9"
github_api_url = "http://127.0.0.1:9"
http_timeout_ms = 2000
"#
    );
    fs::write(project.join("datadao.toml"), body).expect("write config");
}
