//! `deploy proof`: point the proof-of-contribution template at our DLP, publish
//! it, and register the artifact URL on the pool contract.

use crate::domain::models::{Flag, Step, StepReport};
use crate::error::DeployError;
use crate::services::chain::{calldata, decode_string, wait_for_receipt, SendRequest};
use crate::services::context::{require, StepContext};
use crate::services::releases::{await_artifact, push_repo, release_baseline};
use crate::services::storage::StateManager;
use regex::Regex;
use std::path::Path;

const PROOF_INSTRUCTION: &str = "proofInstruction()";
const UPDATE_PROOF_INSTRUCTION: &str = "updateProofInstruction(string)";

/// Rewrites the `dlp_id` assignment (`dlp_id = N` or `"dlp_id": N`).
pub fn set_dlp_id(source: &str, dlp_id: u64) -> anyhow::Result<String> {
    let re = Regex::new(r#"(?m)^(\s*["']?dlp_id["']?\s*[:=]\s*)\d+"#)?;
    if !re.is_match(source) {
        return Err(DeployError::invalid("proof config", "no dlp_id assignment found").into());
    }
    Ok(re
        .replace_all(source, |caps: &regex::Captures| format!("{}{}", &caps[1], dlp_id))
        .to_string())
}

fn configure(ctx: &StepContext, dir: &Path, dlp_id: u64) -> anyhow::Result<()> {
    let file = dir.join(&ctx.config.paths.proof_config_file);
    if !file.exists() {
        return Err(DeployError::missing(
            &format!("proof template config {}", file.display()),
            "git clone <proof template> proof",
        )
        .into());
    }
    let updated = set_dlp_id(&std::fs::read_to_string(&file)?, dlp_id)?;
    std::fs::write(&file, updated)?;
    tracing::info!(file = %file.display(), dlp_id, "proof template configured");
    Ok(())
}

pub fn deploy_proof(ctx: &StepContext, sm: &mut StateManager) -> anyhow::Result<StepReport> {
    if !sm.is_done(Flag::DataDaoRegistered) {
        return Err(DeployError::missing("DataDAO registration", Step::Register.command()).into());
    }
    let dlp_id = sm
        .state
        .dlp_id
        .ok_or_else(|| DeployError::missing("dlpId", Step::Register.command()))?;
    let dir = ctx.config.paths.proof(ctx.project);

    if !sm.is_done(Flag::ProofConfigured) {
        configure(ctx, &dir, dlp_id)?;
        sm.mark(Flag::ProofConfigured)?;
    }

    if !sm.is_done(Flag::ProofPublished) {
        let repo = sm.state.proof_repo.clone();
        if let Some(r) = repo.as_deref().filter(|_| dir.join(".git").exists()) {
            if sm.state.proof_release_after.is_none() {
                sm.state.proof_release_after = Some(release_baseline(ctx.releases, r));
                sm.save()?;
            }
            push_repo(ctx.runner, &ctx.config.tools.git, &dir, &format!("Configure proof for DLP {}", dlp_id))?;
        }
        let url = await_artifact(
            "proof",
            repo.as_deref(),
            sm.state.proof_release_after,
            ctx.config,
            ctx.releases,
            ctx.prompter,
        )?;
        sm.state.proof_url = Some(url);
        sm.state.proof_release_after = None;
        sm.mark(Flag::ProofPublished)?;
    }

    let url = require(&sm.state.proof_url, "proofUrl", Step::Proof.command())?.to_string();
    if !sm.is_done(Flag::ProofRegistered) {
        let proxy = require(&sm.state.proxy_address, "proxyAddress", Step::Contracts.command())?.to_string();
        let key = require(&sm.state.private_key, "privateKey", "datadao setup")?.to_string();
        let current = ctx
            .chain
            .call(&proxy, &calldata(PROOF_INSTRUCTION, &[]))
            .and_then(|r| decode_string(&r))
            .unwrap_or_default();
        if current == url {
            tracing::info!("proof instruction already set on-chain");
        } else {
            let tx = ctx.chain.send(
                &key,
                &SendRequest {
                    to: proxy,
                    signature: UPDATE_PROOF_INSTRUCTION.to_string(),
                    args: vec![url.clone()],
                    value_wei: None,
                },
            )?;
            wait_for_receipt(ctx.chain, &tx, &ctx.config.polling)?;
        }
        sm.mark(Flag::ProofRegistered)?;
    }

    Ok(StepReport::new(Step::Proof, "done").with("proofUrl", url))
}
