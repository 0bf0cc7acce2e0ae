//! Chain access: JSON-RPC reads over HTTP, and transaction submission through
//! `cast` (which holds the signing logic).

use crate::config::PollingConfig;
use crate::error::DeployError;
use crate::services::poll::poll;
use crate::services::shell::CommandRunner;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use sha3::{Digest, Keccak256};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Receipt {
    pub success: bool,
    pub block_number: Option<u64>,
    pub logs: Vec<LogEntry>,
}

#[derive(Debug, Clone)]
pub struct SendRequest {
    pub to: String,
    /// Human-readable signature, e.g. `updateProofInstruction(string)`.
    pub signature: String,
    pub args: Vec<String>,
    pub value_wei: Option<u128>,
}

pub trait Chain {
    fn chain_id(&self) -> anyhow::Result<u64>;
    fn balance(&self, address: &str) -> anyhow::Result<u128>;
    /// `eth_call` against latest; returns the raw `0x` hex result.
    fn call(&self, to: &str, data: &str) -> anyhow::Result<String>;
    fn receipt(&self, tx_hash: &str) -> anyhow::Result<Option<Receipt>>;
    /// Signs and broadcasts without waiting; returns the transaction hash.
    fn send(&self, private_key: &str, req: &SendRequest) -> anyhow::Result<String>;
}

// ---- ABI helpers -----------------------------------------------------------

/// First four bytes of keccak256 of the canonical signature, hex encoded.
pub fn selector(signature: &str) -> String {
    let digest = Keccak256::digest(signature.as_bytes());
    hex::encode(&digest[..4])
}

pub fn encode_address(address: &str) -> anyhow::Result<String> {
    let raw = address.trim().trim_start_matches("0x");
    if raw.len() != 40 || hex::decode(raw).is_err() {
        return Err(DeployError::invalid("address", format!("not a 20-byte hex address: {}", address)).into());
    }
    Ok(format!("{:0>64}", raw.to_ascii_lowercase()))
}

/// Builds calldata from a signature and pre-encoded 32-byte words.
pub fn calldata(signature: &str, words: &[String]) -> String {
    let mut out = format!("0x{}", selector(signature));
    for w in words {
        out.push_str(w);
    }
    out
}

fn strip(hexstr: &str) -> &str {
    hexstr.trim().trim_start_matches("0x")
}

/// Decodes the 32-byte word at `index`; values above u128 are rejected.
pub fn decode_uint(result: &str, index: usize) -> anyhow::Result<u128> {
    let raw = strip(result);
    let start = index * 64;
    let word = raw
        .get(start..start + 64)
        .ok_or_else(|| DeployError::Rpc(format!("short return data: {} chars", raw.len())))?;
    if word[..32].chars().any(|c| c != '0') {
        return Err(DeployError::Rpc("uint256 value exceeds u128".to_string()).into());
    }
    Ok(u128::from_str_radix(&word[32..], 16)?)
}

/// Decodes a single dynamic `string` return value.
pub fn decode_string(result: &str) -> anyhow::Result<String> {
    let raw = strip(result);
    if raw.is_empty() {
        return Ok(String::new());
    }
    let offset = decode_uint(raw, 0)? as usize;
    if offset % 32 != 0 {
        return Err(DeployError::Rpc("misaligned string offset".to_string()).into());
    }
    let len = decode_uint(raw, offset / 32)? as usize;
    let start = offset * 2 + 64;
    let bytes_hex = raw
        .get(start..start + len * 2)
        .ok_or_else(|| DeployError::Rpc("string data out of range".to_string()))?;
    Ok(String::from_utf8(hex::decode(bytes_hex)?)?)
}

pub fn parse_quantity(q: &str) -> anyhow::Result<u128> {
    let raw = strip(q);
    if raw.is_empty() {
        return Ok(0);
    }
    Ok(u128::from_str_radix(raw, 16)?)
}

pub fn topic_to_u64(topic: &str) -> anyhow::Result<u64> {
    let v = decode_uint(topic, 0)?;
    u64::try_from(v).map_err(|_| DeployError::Rpc("topic value exceeds u64".to_string()).into())
}

/// Pulls the first 32-byte transaction hash out of tool output.
pub fn extract_tx_hash(output: &str) -> Option<String> {
    let re = Regex::new(r"0x[0-9a-fA-F]{64}").ok()?;
    re.find(output).map(|m| m.as_str().to_string())
}

// ---- confirmation ----------------------------------------------------------

/// Polls for a receipt; a timeout or a failed status becomes an error.
pub fn wait_for_receipt(
    chain: &dyn Chain,
    tx_hash: &str,
    polling: &PollingConfig,
) -> anyhow::Result<Receipt> {
    wait_for_receipt_every(chain, tx_hash, polling.tx_attempts, polling.tx_interval())
}

pub fn wait_for_receipt_every(
    chain: &dyn Chain,
    tx_hash: &str,
    attempts: u32,
    interval: Duration,
) -> anyhow::Result<Receipt> {
    let receipt = poll("transaction receipt", attempts, interval, || chain.receipt(tx_hash))
        .ok_or_else(|| DeployError::Timeout(format!("confirmation of {}", tx_hash)))?;
    if !receipt.success {
        return Err(DeployError::Reverted(tx_hash.to_string()).into());
    }
    tracing::info!(tx = tx_hash, block = ?receipt.block_number, "transaction confirmed");
    Ok(receipt)
}

// ---- JSON-RPC + cast implementation ---------------------------------------

#[derive(Deserialize)]
struct RpcResponse {
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Deserialize)]
struct RpcErrorBody {
    message: String,
}

pub struct RpcChain<R: CommandRunner> {
    rpc_url: String,
    client: reqwest::blocking::Client,
    cast: String,
    runner: R,
    cwd: PathBuf,
}

impl<R: CommandRunner> RpcChain<R> {
    pub fn new(
        rpc_url: &str,
        timeout_ms: u64,
        cast: &str,
        runner: R,
        cwd: PathBuf,
    ) -> anyhow::Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()?;
        Ok(Self {
            rpc_url: rpc_url.to_string(),
            client,
            cast: cast.to_string(),
            runner,
            cwd,
        })
    }

    fn request(&self, method: &str, params: Value) -> anyhow::Result<Value> {
        let body = json!({"jsonrpc": "2.0", "id": 1, "method": method, "params": params});
        tracing::debug!(method, "rpc request");
        let resp: RpcResponse = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .map_err(|e| DeployError::Rpc(e.to_string()))?
            .error_for_status()
            .map_err(|e| DeployError::Rpc(e.to_string()))?
            .json()?;
        if let Some(err) = resp.error {
            return Err(DeployError::Rpc(err.message).into());
        }
        Ok(resp.result.unwrap_or(Value::Null))
    }
}

fn parse_receipt(v: &Value) -> anyhow::Result<Option<Receipt>> {
    if v.is_null() {
        return Ok(None);
    }
    let success = v.get("status").and_then(|s| s.as_str()) != Some("0x0");
    let block_number = v
        .get("blockNumber")
        .and_then(|b| b.as_str())
        .map(parse_quantity)
        .transpose()?
        .map(|b| b as u64);
    let logs = v
        .get("logs")
        .and_then(|l| l.as_array())
        .map(|arr| {
            arr.iter()
                .map(|l| LogEntry {
                    address: l
                        .get("address")
                        .and_then(|a| a.as_str())
                        .unwrap_or_default()
                        .to_string(),
                    topics: l
                        .get("topics")
                        .and_then(|t| t.as_array())
                        .map(|t| {
                            t.iter()
                                .filter_map(|x| x.as_str().map(|s| s.to_string()))
                                .collect()
                        })
                        .unwrap_or_default(),
                    data: l
                        .get("data")
                        .and_then(|d| d.as_str())
                        .unwrap_or_default()
                        .to_string(),
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(Some(Receipt {
        success,
        block_number,
        logs,
    }))
}

impl<R: CommandRunner> Chain for RpcChain<R> {
    fn chain_id(&self) -> anyhow::Result<u64> {
        let v = self.request("eth_chainId", json!([]))?;
        let q = v.as_str().ok_or_else(|| DeployError::Rpc("eth_chainId: not a string".to_string()))?;
        Ok(parse_quantity(q)? as u64)
    }

    fn balance(&self, address: &str) -> anyhow::Result<u128> {
        let v = self.request("eth_getBalance", json!([address, "latest"]))?;
        let q = v.as_str().ok_or_else(|| DeployError::Rpc("eth_getBalance: not a string".to_string()))?;
        parse_quantity(q)
    }

    fn call(&self, to: &str, data: &str) -> anyhow::Result<String> {
        let v = self.request("eth_call", json!([{"to": to, "data": data}, "latest"]))?;
        Ok(v.as_str().unwrap_or("0x").to_string())
    }

    fn receipt(&self, tx_hash: &str) -> anyhow::Result<Option<Receipt>> {
        let v = self.request("eth_getTransactionReceipt", json!([tx_hash]))?;
        parse_receipt(&v)
    }

    fn send(&self, private_key: &str, req: &SendRequest) -> anyhow::Result<String> {
        let mut args = vec!["send".to_string(), req.to.clone(), req.signature.clone()];
        args.extend(req.args.iter().cloned());
        if let Some(v) = req.value_wei {
            args.push("--value".to_string());
            args.push(v.to_string());
        }
        args.extend([
            "--private-key".to_string(),
            private_key.to_string(),
            "--rpc-url".to_string(),
            self.rpc_url.clone(),
            "--async".to_string(),
        ]);
        tracing::info!(to = %req.to, signature = %req.signature, "submitting transaction");
        let out = self.runner.run(&self.cast, &args, &self.cwd)?.check("cast send")?;
        extract_tx_hash(&out.stdout)
            .ok_or_else(|| DeployError::Rpc(format!("no transaction hash in cast output: {}", out.tail(3))).into())
    }
}
