//! `deploy contracts`: run the deploy framework and scrape the addresses it prints.

use crate::domain::models::{DeploymentState, Flag, Step, StepReport};
use crate::error::DeployError;
use crate::services::context::{require, StepContext};
use crate::services::envfile::merge_env;
use crate::services::storage::StateManager;
use regex::Regex;

#[derive(Debug, Clone, PartialEq)]
pub struct DeployedAddresses {
    pub token: String,
    pub proxy: String,
    pub vesting: Option<String>,
}

#[derive(Clone, Copy, PartialEq, PartialOrd)]
enum Label {
    Vesting,
    Token,
    DlpImplementation,
    DlpProxy,
}

fn label_of(prefix: &str) -> Option<Label> {
    let p = prefix.to_ascii_lowercase().replace([' ', '_', '-'], "");
    if p.contains("vesting") {
        Some(Label::Vesting)
    } else if p.contains("token") {
        Some(Label::Token)
    } else if p.contains("dataliquiditypool") || p.contains("dlp") {
        if p.contains("proxy") {
            Some(Label::DlpProxy)
        } else {
            Some(Label::DlpImplementation)
        }
    } else {
        None
    }
}

/// Extracts addresses from labelled lines of deploy output.
///
/// The first address on a line is attributed to that line's label. A proxy label
/// wins over an implementation label regardless of order.
pub fn parse_addresses(output: &str) -> anyhow::Result<DeployedAddresses> {
    let re = Regex::new(r"\b0x[0-9a-fA-F]{40}\b")?;
    let mut token = None;
    let mut vesting = None;
    let mut proxy: Option<(Label, String)> = None;

    for line in output.lines() {
        let Some(m) = re.find(line) else { continue };
        let Some(label) = label_of(&line[..m.start()]) else {
            continue;
        };
        let addr = m.as_str().to_string();
        match label {
            Label::Vesting => {
                vesting.get_or_insert(addr);
            }
            Label::Token => {
                token.get_or_insert(addr);
            }
            Label::DlpProxy | Label::DlpImplementation => {
                let better = proxy.as_ref().map(|(l, _)| label > *l).unwrap_or(true);
                if better {
                    proxy = Some((label, addr));
                }
            }
        }
    }

    Ok(DeployedAddresses {
        token: token.ok_or_else(|| DeployError::AddressNotFound("token".to_string()))?,
        proxy: proxy
            .map(|(_, a)| a)
            .ok_or_else(|| DeployError::AddressNotFound("data liquidity pool".to_string()))?,
        vesting,
    })
}

/// Writes the deploy framework's `.env` from the current state.
pub fn write_contracts_env(ctx: &StepContext, s: &DeploymentState) -> anyhow::Result<()> {
    let cmd = "datadao setup";
    let managed = vec![
        ("DEPLOYER_PRIVATE_KEY", require(&s.private_key, "privateKey", cmd)?.to_string()),
        ("OWNER_ADDRESS", require(&s.address, "address", cmd)?.to_string()),
        ("DLP_NAME", require(&s.dlp_name, "dlpName", cmd)?.to_string()),
        ("DLP_PUBLIC_KEY", s.public_key.clone().unwrap_or_default()),
        ("DLP_TOKEN_NAME", require(&s.token_name, "tokenName", cmd)?.to_string()),
        ("DLP_TOKEN_SYMBOL", require(&s.token_symbol, "tokenSymbol", cmd)?.to_string()),
        (
            "DLP_REGISTRY_CONTRACT_ADDRESS",
            ctx.config.contracts.dlp_registry.clone(),
        ),
        (
            "DATA_REGISTRY_CONTRACT_ADDRESS",
            ctx.config.contracts.data_registry.clone(),
        ),
    ];
    merge_env(&ctx.config.paths.contracts(ctx.project).join(".env"), &managed)
}

pub fn deploy_contracts(ctx: &StepContext, sm: &mut StateManager) -> anyhow::Result<StepReport> {
    if sm.is_done(Flag::ContractsDeployed) {
        if let (Some(token), Some(proxy)) = (&sm.state.token_address, &sm.state.proxy_address) {
            tracing::info!(proxy = %proxy, "contracts already deployed; `datadao reset --step contracts` redeploys");
            return Ok(StepReport::new(Step::Contracts, "already_deployed")
                .with("tokenAddress", token)
                .with("proxyAddress", proxy));
        }
        tracing::warn!("contractsDeployed is set without addresses; deploying again");
    }
    let dir = ctx.config.paths.contracts(ctx.project);
    if !dir.is_dir() {
        return Err(DeployError::missing(
            &format!("contracts checkout at {}", dir.display()),
            "git clone <dlp contracts template> contracts",
        )
        .into());
    }
    write_contracts_env(ctx, &sm.state)?;

    let (program, rest) = ctx
        .config
        .tools
        .deploy_command
        .split_first()
        .ok_or_else(|| DeployError::invalid("tools.deploy_command", "empty"))?;
    tracing::info!(program, "deploying contracts; this can take a few minutes");
    let out = ctx.runner.run(program, rest, &dir)?;
    if !out.success {
        tracing::error!(tail = %out.tail(20), "deploy tool failed");
    }
    let out = out.check(program)?;
    let addrs = match parse_addresses(&out.combined()) {
        Ok(a) => a,
        Err(e) => {
            tracing::error!(tail = %out.tail(20), "deploy output did not contain addresses");
            return Err(e);
        }
    };

    let replaced = sm
        .state
        .proxy_address
        .as_deref()
        .is_some_and(|old| !old.eq_ignore_ascii_case(&addrs.proxy));
    if replaced {
        forget_old_pool(sm);
    }
    sm.state.token_address = Some(addrs.token.clone());
    sm.state.proxy_address = Some(addrs.proxy.clone());
    sm.state.vesting_address = addrs.vesting.clone();
    sm.mark(Flag::ContractsDeployed)?;

    let mut report = StepReport::new(Step::Contracts, "done")
        .with("tokenAddress", &addrs.token)
        .with("proxyAddress", &addrs.proxy);
    if let Some(v) = &addrs.vesting {
        report = report.with("vestingAddress", v);
    }
    if replaced {
        report = report.with("downstreamReset", "register,proof,refiner,ui");
    }
    Ok(report)
}

/// A new pool invalidates everything registered against the previous one.
fn forget_old_pool(sm: &mut StateManager) {
    tracing::warn!("pool address changed; registration, proof, refiner and ui will run again");
    for step in [Step::Register, Step::Proof, Step::Refiner, Step::Ui] {
        sm.reset_step(step);
    }
    sm.state.dlp_id = None;
    sm.state.refiner_id = None;
    sm.state.refiner_tx = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::context::testing::Harness;

    const TOKEN: &str = "0x1111111111111111111111111111111111111111";
    const PROXY: &str = "0x2222222222222222222222222222222222222222";
    const IMPL: &str = "0x3333333333333333333333333333333333333333";
    const VESTING: &str = "0x4444444444444444444444444444444444444444";

    fn hardhat_log() -> String {
        format!(
            "Compiled 42 Solidity files successfully\n\
             deploying \"DataLiquidityPoolImplementation\" (tx: 0x{h}): deployed at {IMPL} with 3000000 gas\n\
             deploying \"DataLiquidityPoolProxy\" (tx: 0x{h}): deployed at {PROXY} with 400000 gas\n\
             Token Address: {TOKEN}\n\
             Vesting Wallet Address: {VESTING}\n",
            h = "a".repeat(64)
        )
    }

    #[test]
    fn typical_log_yields_all_addresses() {
        let a = parse_addresses(&hardhat_log()).expect("parse");
        assert_eq!(a.token, TOKEN);
        assert_eq!(a.proxy, PROXY);
        assert_eq!(a.vesting.as_deref(), Some(VESTING));
    }

    #[test]
    fn proxy_label_wins_over_implementation_in_any_order() {
        let out = format!("DLP Proxy: {PROXY}\nDataLiquidityPool implementation: {IMPL}\nToken: {TOKEN}\n");
        assert_eq!(parse_addresses(&out).expect("parse").proxy, PROXY);
        let only_impl = format!("DataLiquidityPool Address: {IMPL}\nToken Address: {TOKEN}\n");
        assert_eq!(parse_addresses(&only_impl).expect("parse").proxy, IMPL);
    }

    #[test]
    fn missing_token_is_an_error() {
        let err = parse_addresses(&format!("DLP Proxy: {PROXY}\n")).err().expect("error");
        assert!(err.to_string().contains("token"));
    }

    fn seeded(h: &Harness) -> StateManager {
        let mut sm = StateManager::load(h.dir.path()).expect("load");
        sm.state.private_key = Some(format!("0x{}", "1".repeat(64)));
        sm.state.address = Some(TOKEN.to_string());
        sm.state.dlp_name = Some("Demo DAO".to_string());
        sm.state.token_name = Some("Demo Token".to_string());
        sm.state.token_symbol = Some("DEMO".to_string());
        sm
    }

    #[test]
    fn deploy_writes_env_and_records_addresses() {
        let h = Harness::new();
        std::fs::create_dir_all(h.dir.path().join("contracts")).expect("mkdir");
        h.runner.push_ok(&hardhat_log());
        let mut sm = seeded(&h);

        let report = deploy_contracts(&h.ctx(), &mut sm).expect("deploy");
        assert_eq!(report.outputs["proxyAddress"], PROXY);
        assert!(sm.state.state.contracts_deployed);
        assert_eq!(sm.state.token_address.as_deref(), Some(TOKEN));
        assert!(h.runner.calls()[0].starts_with("npx hardhat deploy"));

        let env = crate::services::envfile::read_env(&h.dir.path().join("contracts/.env"))
            .expect("env");
        assert_eq!(env["DLP_NAME"], "Demo DAO");
        assert_eq!(env["DLP_TOKEN_SYMBOL"], "DEMO");
    }

    #[test]
    fn second_run_keeps_deployed_pool() {
        let h = Harness::new();
        std::fs::create_dir_all(h.dir.path().join("contracts")).expect("mkdir");
        let mut sm = seeded(&h);
        sm.state.token_address = Some(TOKEN.to_string());
        sm.state.proxy_address = Some(PROXY.to_string());
        sm.state.state.contracts_deployed = true;
        sm.state.dlp_id = Some(27);
        sm.state.state.data_dao_registered = true;

        let report = deploy_contracts(&h.ctx(), &mut sm).expect("deploy");
        assert_eq!(report.status, "already_deployed");
        assert_eq!(report.outputs["proxyAddress"], PROXY);
        assert!(h.runner.calls().is_empty());
        assert_eq!(sm.state.dlp_id, Some(27));
    }

    #[test]
    fn redeploy_after_reset_clears_old_registration() {
        let h = Harness::new();
        std::fs::create_dir_all(h.dir.path().join("contracts")).expect("mkdir");
        let new_proxy = "0x8888888888888888888888888888888888888888";
        h.runner
            .push_ok(&format!("Token Address: {TOKEN}\nDataLiquidityPoolProxy deployed at {new_proxy}\n"));
        let mut sm = seeded(&h);
        sm.state.token_address = Some(TOKEN.to_string());
        sm.state.proxy_address = Some(PROXY.to_string());
        sm.state.dlp_id = Some(27);
        sm.state.state.data_dao_registered = true;
        sm.state.state.ui_configured = true;

        let report = deploy_contracts(&h.ctx(), &mut sm).expect("deploy");
        assert_eq!(report.status, "done");
        assert_eq!(sm.state.proxy_address.as_deref(), Some(new_proxy));
        assert_eq!(sm.state.dlp_id, None);
        assert!(!sm.state.state.data_dao_registered);
        assert!(!sm.state.state.ui_configured);
        assert!(sm.validate().is_empty());
    }

    #[test]
    fn tool_failure_leaves_flag_unset() {
        let h = Harness::new();
        std::fs::create_dir_all(h.dir.path().join("contracts")).expect("mkdir");
        h.runner.push_fail(1, "Error: insufficient funds for intrinsic transaction cost");
        let mut sm = seeded(&h);
        let err = deploy_contracts(&h.ctx(), &mut sm).err().expect("error");
        assert!(err.to_string().contains("insufficient funds"));
        assert!(!sm.state.state.contracts_deployed);
    }

    #[test]
    fn missing_checkout_is_a_prerequisite_error() {
        let h = Harness::new();
        let mut sm = seeded(&h);
        let err = deploy_contracts(&h.ctx(), &mut sm).err().expect("error");
        assert!(err.to_string().contains("contracts checkout"));
    }
}
