//! `deploy ui`: hand the deployment results to the web application through its `.env`.

use crate::domain::models::{Flag, Step, StepReport};
use crate::error::DeployError;
use crate::services::context::{require, StepContext};
use crate::services::envfile::merge_env;
use crate::services::refiner::random_hex_key;
use crate::services::storage::StateManager;

pub fn deploy_ui(ctx: &StepContext, sm: &mut StateManager) -> anyhow::Result<StepReport> {
    if !sm.is_done(Flag::DataDaoRegistered) {
        return Err(DeployError::missing("DataDAO registration", Step::Register.command()).into());
    }
    let dlp_id = sm
        .state
        .dlp_id
        .ok_or_else(|| DeployError::missing("dlpId", Step::Register.command()))?;
    let dir = ctx.config.paths.ui(ctx.project);
    if !dir.is_dir() {
        return Err(DeployError::missing(
            &format!("web app checkout at {}", dir.display()),
            "git clone <web app template> ui",
        )
        .into());
    }
    if sm.state.nextauth_secret.is_none() {
        sm.state.nextauth_secret = Some(random_hex_key());
    }

    let s = &sm.state;
    let setup = "datadao setup";
    let mut managed = vec![
        ("GOOGLE_CLIENT_ID", require(&s.google_client_id, "googleClientId", setup)?.to_string()),
        (
            "GOOGLE_CLIENT_SECRET",
            require(&s.google_client_secret, "googleClientSecret", setup)?.to_string(),
        ),
        ("NEXTAUTH_SECRET", s.nextauth_secret.clone().unwrap_or_default()),
        ("NEXTAUTH_URL", ctx.config.services.nextauth_url.clone()),
        ("NEXT_PUBLIC_DLP_ID", dlp_id.to_string()),
        (
            "NEXT_PUBLIC_DLP_CONTRACT_ADDRESS",
            require(&s.proxy_address, "proxyAddress", Step::Contracts.command())?.to_string(),
        ),
        (
            "NEXT_PUBLIC_TOKEN_CONTRACT_ADDRESS",
            require(&s.token_address, "tokenAddress", Step::Contracts.command())?.to_string(),
        ),
        ("NEXT_PUBLIC_RPC_URL", ctx.config.network.rpc_url.clone()),
    ];
    if let Some(id) = s.refiner_id {
        managed.push(("REFINER_ID", id.to_string()));
    }
    if let (Some(k), Some(sec)) = (&s.pinata_api_key, &s.pinata_api_secret) {
        managed.push(("PINATA_API_KEY", k.clone()));
        managed.push(("PINATA_API_SECRET", sec.clone()));
    }
    if let Some(url) = &s.proof_url {
        managed.push(("NEXT_PUBLIC_PROOF_URL", url.clone()));
    }

    let path = dir.join(".env");
    merge_env(&path, &managed)?;
    sm.mark(Flag::UiConfigured)?;
    Ok(StepReport::new(Step::Ui, "done").with("envFile", path.display()))
}
