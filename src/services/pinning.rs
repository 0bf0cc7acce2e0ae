//! IPFS pinning through the Pinata HTTP API.

use crate::error::DeployError;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

pub trait Pinner {
    /// Pins a JSON document and returns its CID.
    fn pin_json(&self, name: &str, content: &Value) -> anyhow::Result<String>;
    fn test_auth(&self) -> anyhow::Result<()>;
}

#[derive(Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

pub struct Pinata {
    api_url: String,
    key: String,
    secret: String,
    client: reqwest::blocking::Client,
}

impl Pinata {
    pub fn new(api_url: &str, key: &str, secret: &str, timeout_ms: u64) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()?;
        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            key: key.to_string(),
            secret: secret.to_string(),
            client,
        })
    }
}

impl Pinner for Pinata {
    fn pin_json(&self, name: &str, content: &Value) -> anyhow::Result<String> {
        let body = json!({
            "pinataContent": content,
            "pinataMetadata": {"name": name},
        });
        let resp: PinResponse = self
            .client
            .post(format!("{}/pinning/pinJSONToIPFS", self.api_url))
            .header("pinata_api_key", &self.key)
            .header("pinata_secret_api_key", &self.secret)
            .json(&body)
            .send()?
            .error_for_status()?
            .json()?;
        tracing::info!(name, cid = %resp.ipfs_hash, "pinned to ipfs");
        Ok(resp.ipfs_hash)
    }

    fn test_auth(&self) -> anyhow::Result<()> {
        self.client
            .get(format!("{}/data/testAuthentication", self.api_url))
            .header("pinata_api_key", &self.key)
            .header("pinata_secret_api_key", &self.secret)
            .send()?
            .error_for_status()?;
        Ok(())
    }
}

/// Stand-in used when no credentials are configured yet.
pub struct NoPinning;

impl Pinner for NoPinning {
    fn pin_json(&self, _name: &str, _content: &Value) -> anyhow::Result<String> {
        Err(DeployError::missing("Pinata credentials", "datadao setup").into())
    }

    fn test_auth(&self) -> anyhow::Result<()> {
        Err(DeployError::missing("Pinata credentials", "datadao setup").into())
    }
}

pub fn gateway_url(gateway: &str, cid: &str) -> String {
    format!("{}/ipfs/{}", gateway.trim_end_matches('/'), cid)
}
