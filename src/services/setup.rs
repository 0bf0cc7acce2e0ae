//! `setup`: collect identity and credentials, then seed `deployment.json`.

use crate::domain::constants::{DEFAULT_DLP_NAME, DEFAULT_TOKEN_SYMBOL};
use crate::domain::models::SetupReport;
use crate::error::DeployError;
use crate::services::chain::encode_address;
use crate::services::context::StepContext;
use crate::services::contracts::write_contracts_env;
use crate::services::prompt::Prompter;
use crate::services::shell::args;
use crate::services::storage::StateManager;
use regex::Regex;

/// Values supplied up front (flags or environment); anything left `None` is
/// taken from the existing state or asked for.
#[derive(Debug, Default, Clone)]
pub struct SetupInput {
    pub dlp_name: Option<String>,
    pub token_name: Option<String>,
    pub token_symbol: Option<String>,
    pub private_key: Option<String>,
    pub address: Option<String>,
    pub public_key: Option<String>,
    pub pinata_api_key: Option<String>,
    pub pinata_api_secret: Option<String>,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub github_username: Option<String>,
    pub proof_repo: Option<String>,
    pub refiner_repo: Option<String>,
}

pub fn normalize_private_key(raw: &str) -> anyhow::Result<String> {
    let k = raw.trim().trim_start_matches("0x");
    if k.len() != 64 || !k.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(DeployError::invalid("private key", "expected 64 hex characters").into());
    }
    Ok(format!("0x{}", k))
}

pub fn validate_symbol(raw: &str) -> anyhow::Result<String> {
    let s = raw.trim().to_ascii_uppercase();
    if s.is_empty() || s.len() > 10 || !s.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(DeployError::invalid("token symbol", "1-10 letters or digits").into());
    }
    Ok(s)
}

pub fn kebab(name: &str) -> String {
    let mut out = String::new();
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}

/// Accepts `0x` plus 40 hex digits, whether typed or printed by `cast`.
fn checked_address(raw: &str) -> anyhow::Result<String> {
    let a = raw.trim();
    encode_address(a)?;
    Ok(format!("0x{}", a.trim_start_matches("0x")))
}

fn checked_public_key(raw: &str) -> anyhow::Result<String> {
    let k = raw.trim().trim_start_matches("0x");
    if k.is_empty() || !k.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(DeployError::invalid("public key", format!("not a hex public key: {:?}", raw.trim())).into());
    }
    Ok(format!("0x{}", k))
}

fn first_match(re: &str, text: &str) -> Option<String> {
    Regex::new(re)
        .ok()?
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// `(address, private key)` from `cast wallet new` output.
pub fn parse_new_wallet(output: &str) -> anyhow::Result<(String, String)> {
    let address = first_match(r"Address:\s*(0x[0-9a-fA-F]{40})", output);
    let key = first_match(r"(?i)Private key:\s*(0x[0-9a-fA-F]{64})", output);
    match (address, key) {
        (Some(a), Some(k)) => Ok((a, k)),
        _ => Err(DeployError::ToolFailed {
            tool: "cast wallet new".to_string(),
            code: "0".to_string(),
            detail: "unrecognised output".to_string(),
        }
        .into()),
    }
}

fn cast(ctx: &StepContext, list: &[&str]) -> anyhow::Result<String> {
    let out = ctx
        .runner
        .run(&ctx.config.tools.cast, &args(list), ctx.project)?
        .check("cast wallet")?;
    Ok(out.stdout.trim().to_string())
}

fn pick(
    given: Option<String>,
    existing: &Option<String>,
    ask: impl FnOnce() -> anyhow::Result<String>,
) -> anyhow::Result<String> {
    if let Some(v) = given.filter(|v| !v.trim().is_empty()) {
        return Ok(v.trim().to_string());
    }
    if let Some(v) = existing.as_ref().filter(|v| !v.trim().is_empty()) {
        return Ok(v.clone());
    }
    ask()
}

fn required_secret(p: &dyn Prompter, label: &str) -> anyhow::Result<String> {
    let v = p.secret(label)?;
    if v.is_empty() {
        return Err(DeployError::MissingValue(label.trim_end_matches(':').to_string()).into());
    }
    Ok(v)
}

pub fn run_setup(
    ctx: &StepContext,
    sm: &mut StateManager,
    input: SetupInput,
) -> anyhow::Result<SetupReport> {
    let p = ctx.prompter;
    let mut generated_wallet = false;

    let dlp_name = pick(input.dlp_name, &sm.state.dlp_name, || {
        p.input("DataDAO name:", Some(DEFAULT_DLP_NAME))
    })?;
    let default_token = format!("{} Token", dlp_name);
    let token_name = pick(input.token_name, &sm.state.token_name, || {
        p.input("Token name:", Some(&default_token))
    })?;
    let token_symbol = validate_symbol(&pick(input.token_symbol, &sm.state.token_symbol, || {
        p.input("Token symbol:", Some(DEFAULT_TOKEN_SYMBOL))
    })?)?;

    let mut address = input.address.clone();
    let private_key = match pick(input.private_key, &sm.state.private_key, || {
        p.secret("Deployer private key (blank to generate a new wallet):")
    })? {
        k if k.is_empty() => {
            let (a, k) = parse_new_wallet(&cast(ctx, &["wallet", "new"])?)?;
            tracing::info!(address = %a, "generated a new wallet");
            generated_wallet = true;
            address = Some(a);
            k
        }
        k => normalize_private_key(&k)?,
    };

    let key_changed = sm.state.private_key.as_deref() != Some(private_key.as_str());
    let address = checked_address(&match (address, sm.state.address.clone()) {
        (Some(a), _) => a,
        (None, Some(a)) if !key_changed => a,
        _ => cast(ctx, &["wallet", "address", "--private-key", &private_key])?,
    })?;
    let public_key = checked_public_key(&match (input.public_key, sm.state.public_key.clone()) {
        (Some(k), _) => k,
        (None, Some(k)) if !key_changed => k,
        _ => cast(ctx, &["wallet", "public-key", "--raw-private-key", &private_key])?,
    })?;

    let pinata_api_key = pick(input.pinata_api_key, &sm.state.pinata_api_key, || {
        p.input("Pinata API key:", None)
    })?;
    let pinata_api_secret = pick(input.pinata_api_secret, &sm.state.pinata_api_secret, || {
        required_secret(p, "Pinata API secret:")
    })?;
    let google_client_id = pick(input.google_client_id, &sm.state.google_client_id, || {
        p.input("Google OAuth client id:", None)
    })?;
    let google_client_secret = pick(input.google_client_secret, &sm.state.google_client_secret, || {
        required_secret(p, "Google OAuth client secret:")
    })?;
    let github_username = pick(input.github_username, &sm.state.github_username, || {
        p.input("GitHub username (blank to publish manually):", Some(""))
    })?;

    let slug = kebab(&dlp_name);
    let repo_default = |suffix: &str| {
        if github_username.is_empty() {
            String::new()
        } else {
            format!("{}/{}-{}", github_username, slug, suffix)
        }
    };
    let proof_default = repo_default("proof");
    let refiner_default = repo_default("refiner");
    let proof_repo = pick(input.proof_repo, &sm.state.proof_repo, || {
        p.input("Proof repository (owner/name):", Some(&proof_default))
    })?;
    let refiner_repo = pick(input.refiner_repo, &sm.state.refiner_repo, || {
        p.input("Refiner repository (owner/name):", Some(&refiner_default))
    })?;

    let s = &mut sm.state;
    s.dlp_name = Some(dlp_name.clone());
    s.token_name = Some(token_name);
    s.token_symbol = Some(token_symbol.clone());
    s.private_key = Some(private_key);
    s.address = Some(address.clone());
    s.public_key = Some(public_key);
    s.pinata_api_key = Some(pinata_api_key);
    s.pinata_api_secret = Some(pinata_api_secret);
    s.google_client_id = Some(google_client_id);
    s.google_client_secret = Some(google_client_secret);
    s.github_username = Some(github_username).filter(|v| !v.is_empty());
    s.proof_repo = Some(proof_repo).filter(|v| !v.is_empty());
    s.refiner_repo = Some(refiner_repo).filter(|v| !v.is_empty());
    sm.save()?;

    let contracts_env = if ctx.config.paths.contracts(ctx.project).is_dir() {
        write_contracts_env(ctx, &sm.state)?;
        true
    } else {
        tracing::warn!("no contracts checkout yet; contracts/.env will be written by `deploy contracts`");
        false
    };

    Ok(SetupReport {
        state_file: sm.path().display().to_string(),
        dlp_name,
        token_symbol,
        address,
        generated_wallet,
        proof_repo: sm.state.proof_repo.clone(),
        refiner_repo: sm.state.refiner_repo.clone(),
        contracts_env,
        warnings: Vec::new(),
    })
}
