//! `register`: put the deployed pool into the on-chain DLP registry.

use crate::domain::constants::GAS_MARGIN_WEI;
use crate::domain::models::{Flag, Step, StepReport};
use crate::error::DeployError;
use crate::services::chain::{calldata, decode_uint, encode_address, wait_for_receipt, Chain, SendRequest};
use crate::services::context::{require, StepContext};
use crate::services::poll::poll;
use crate::services::storage::StateManager;

const DLP_IDS: &str = "dlpIds(address)";
const REGISTER_DLP: &str = "registerDlp((address,address,address,string,string,string,string))";

/// Confirms the endpoint is the configured chain and the wallet can pay `needed`.
pub fn preflight(ctx: &StepContext, address: &str, needed: u128) -> anyhow::Result<()> {
    let chain_id = ctx.chain.chain_id()?;
    if chain_id != ctx.config.network.chain_id {
        return Err(DeployError::invalid(
            "chain id",
            format!(
                "rpc reports {} but datadao.toml expects {}",
                chain_id, ctx.config.network.chain_id
            ),
        )
        .into());
    }
    let balance = ctx.chain.balance(address)?;
    tracing::info!(address, balance, needed, "wallet balance");
    if balance < needed {
        return Err(DeployError::invalid(
            "wallet balance",
            format!(
                "insufficient funds: {} wei available, {} wei needed; fund {} at {}",
                balance, needed, address, ctx.config.network.faucet_url
            ),
        )
        .into());
    }
    Ok(())
}

pub fn lookup_dlp_id(chain: &dyn Chain, registry: &str, dlp: &str) -> anyhow::Result<Option<u64>> {
    let data = calldata(DLP_IDS, &[encode_address(dlp)?]);
    let id = decode_uint(&chain.call(registry, &data)?, 0)?;
    if id == 0 {
        return Ok(None);
    }
    Ok(Some(u64::try_from(id).map_err(|_| DeployError::Rpc("dlp id exceeds u64".to_string()))?))
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "'"))
}

pub fn register_datadao(ctx: &StepContext, sm: &mut StateManager) -> anyhow::Result<StepReport> {
    if !sm.is_done(Flag::ContractsDeployed) {
        return Err(DeployError::missing("deployed contracts", Step::Contracts.command()).into());
    }
    let s = &sm.state;
    let proxy = require(&s.proxy_address, "proxyAddress", Step::Contracts.command())?.to_string();
    let owner = require(&s.address, "address", "datadao setup")?.to_string();
    let key = require(&s.private_key, "privateKey", "datadao setup")?.to_string();
    let name = require(&s.dlp_name, "dlpName", "datadao setup")?.to_string();
    let registry = ctx.config.contracts.dlp_registry.clone();

    if let Some(id) = lookup_dlp_id(ctx.chain, &registry, &proxy)? {
        tracing::info!(dlp_id = id, "already registered");
        sm.state.dlp_id = Some(id);
        sm.mark(Flag::DataDaoRegistered)?;
        return Ok(StepReport::new(Step::Register, "already_registered").with("dlpId", id));
    }

    let fee = ctx.config.contracts.registration_fee()?;
    preflight(ctx, &owner, fee.saturating_add(GAS_MARGIN_WEI))?;

    let tuple = format!(
        "({},{},{},{},{},{},{})",
        proxy,
        owner,
        owner,
        quote(&name),
        quote(""),
        quote(""),
        quote("")
    );
    let tx = ctx.chain.send(
        &key,
        &SendRequest {
            to: registry.clone(),
            signature: REGISTER_DLP.to_string(),
            args: vec![tuple],
            value_wei: Some(fee),
        },
    )?;
    tracing::info!(tx = %tx, "registration submitted");
    wait_for_receipt(ctx.chain, &tx, &ctx.config.polling)?;

    let polled = poll(
        "dlp id",
        ctx.config.polling.tx_attempts,
        ctx.config.polling.tx_interval(),
        || lookup_dlp_id(ctx.chain, &registry, &proxy),
    );
    let id = match polled {
        Some(id) => id,
        None if ctx.prompter.interactive() => {
            let raw = ctx
                .prompter
                .input("Registration confirmed but the id is not visible yet. Enter the dlpId from the explorer:", None)?;
            raw.trim()
                .parse::<u64>()
                .map_err(|_| DeployError::invalid("dlpId", "not a positive integer"))?
        }
        None => return Err(DeployError::Timeout("dlp id after registration".to_string()).into()),
    };

    sm.state.dlp_id = Some(id);
    sm.mark(Flag::DataDaoRegistered)?;
    Ok(StepReport::new(Step::Register, "done")
        .with("dlpId", id)
        .with("tx", tx))
}
