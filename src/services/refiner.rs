//! `deploy refiner`: configure, build and publish the data refiner, pin its
//! schema, and register it in the data refiner registry.

use crate::domain::models::{DeploymentState, Flag, Step, StepReport};
use crate::error::DeployError;
use crate::services::chain::{topic_to_u64, wait_for_receipt, Receipt, SendRequest};
use crate::services::context::{require, StepContext};
use crate::services::envfile::{merge_env, read_env};
use crate::services::pinning::gateway_url;
use crate::services::releases::{await_artifact, push_repo, release_baseline, validate_artifact_url};
use crate::services::shell::args;
use crate::services::storage::StateManager;
use sha2::{Digest, Sha256};

const ADD_REFINER: &str = "addRefiner(uint256,string,string,string,string)";

pub fn random_hex_key() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

pub fn schema_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// The registry's `RefinerAdded` event carries the id as its first indexed topic.
pub fn refiner_id_from_receipt(receipt: &Receipt, registry: &str) -> anyhow::Result<u64> {
    let log = receipt
        .logs
        .iter()
        .find(|l| l.address.eq_ignore_ascii_case(registry) && l.topics.len() >= 2)
        .ok_or_else(|| DeployError::Rpc("no refiner event in receipt".to_string()))?;
    topic_to_u64(&log.topics[1])
}

fn configure(ctx: &StepContext, sm: &mut StateManager) -> anyhow::Result<()> {
    let dir = ctx.config.paths.refiner(ctx.project);
    if !dir.is_dir() {
        return Err(DeployError::missing(
            &format!("refiner checkout at {}", dir.display()),
            "git clone <refiner template> refiner",
        )
        .into());
    }
    let env_path = dir.join(".env");
    if sm.state.refinement_encryption_key.is_none() {
        // a key already in use must not rotate
        let existing = read_env(&env_path)?
            .remove("REFINEMENT_ENCRYPTION_KEY")
            .filter(|k| !k.is_empty());
        if existing.is_some() {
            tracing::info!("adopting encryption key from refiner/.env");
        }
        sm.state.refinement_encryption_key = Some(existing.unwrap_or_else(random_hex_key));
    }
    let s = &sm.state;
    let managed = vec![
        (
            "REFINEMENT_ENCRYPTION_KEY",
            s.refinement_encryption_key.clone().unwrap_or_default(),
        ),
        ("PINATA_API_KEY", require(&s.pinata_api_key, "pinataApiKey", "datadao setup")?.to_string()),
        (
            "PINATA_API_SECRET",
            require(&s.pinata_api_secret, "pinataApiSecret", "datadao setup")?.to_string(),
        ),
    ];
    merge_env(&env_path, &managed)?;
    sm.mark(Flag::RefinerConfigured)
}

fn build_image(ctx: &StepContext) {
    if !ctx.config.tools.docker_enabled {
        return;
    }
    let dir = ctx.config.paths.refiner(ctx.project);
    let result = ctx
        .runner
        .run(
            &ctx.config.tools.docker,
            &args(&["build", "-t", &ctx.config.tools.docker_image, "."]),
            &dir,
        )
        .and_then(|o| o.check("docker build"));
    match result {
        Ok(_) => tracing::info!(image = %ctx.config.tools.docker_image, "refiner image built"),
        Err(e) => tracing::warn!(error = %e, "local docker build failed; continuing with the release pipeline"),
    }
}

/// Pins the schema when its content changed since the last pin.
fn publish_schema(ctx: &StepContext, sm: &mut StateManager) -> anyhow::Result<String> {
    let file = ctx.config.paths.refiner(ctx.project).join(&ctx.config.paths.schema_file);
    if file.exists() {
        let bytes = std::fs::read(&file)?;
        let hash = schema_hash(&bytes);
        if sm.state.schema_hash.as_deref() == Some(hash.as_str()) {
            if let Some(url) = &sm.state.schema_url {
                tracing::info!("schema unchanged; reusing pinned copy");
                return Ok(url.clone());
            }
        }
        let content: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| DeployError::invalid("schema file", e.to_string()))?;
        let name = format!("{} schema", sm.state.dlp_name.as_deref().unwrap_or("refiner"));
        let cid = ctx.pinner.pin_json(&name, &content)?;
        let url = gateway_url(&ctx.config.services.ipfs_gateway, &cid);
        sm.state.schema_url = Some(url.clone());
        sm.state.schema_hash = Some(hash);
        sm.save()?;
        return Ok(url);
    }
    if let Some(url) = &sm.state.schema_url {
        return Ok(url.clone());
    }
    if !ctx.prompter.interactive() {
        return Err(DeployError::missing(&format!("schema file {}", file.display()), "docker run <refiner image>").into());
    }
    let url = validate_artifact_url(&ctx.prompter.input("Schema definition URL:", None)?)?;
    sm.state.schema_url = Some(url.clone());
    sm.save()?;
    Ok(url)
}

fn send_add_refiner(
    ctx: &StepContext,
    s: &DeploymentState,
    dlp_id: u64,
    registry: &str,
) -> anyhow::Result<String> {
    let schema_url = require(&s.schema_url, "schemaUrl", Step::Refiner.command())?.to_string();
    let refiner_url = require(&s.refiner_url, "refinerUrl", Step::Refiner.command())?.to_string();
    let public_key = require(&s.public_key, "publicKey", "datadao setup")?.to_string();
    let key = require(&s.private_key, "privateKey", "datadao setup")?;
    let name = format!("{} Refiner", s.dlp_name.as_deref().unwrap_or("DataDAO"));
    let tx = ctx.chain.send(
        key,
        &SendRequest {
            to: registry.to_string(),
            signature: ADD_REFINER.to_string(),
            args: vec![dlp_id.to_string(), name, schema_url, refiner_url, public_key],
            value_wei: None,
        },
    )?;
    tracing::info!(tx = %tx, "addRefiner submitted");
    Ok(tx)
}

pub fn deploy_refiner(ctx: &StepContext, sm: &mut StateManager) -> anyhow::Result<StepReport> {
    if !sm.is_done(Flag::DataDaoRegistered) {
        return Err(DeployError::missing("DataDAO registration", Step::Register.command()).into());
    }
    let dlp_id = sm
        .state
        .dlp_id
        .ok_or_else(|| DeployError::missing("dlpId", Step::Register.command()))?;

    if !sm.is_done(Flag::RefinerConfigured) {
        configure(ctx, sm)?;
    }

    if !sm.is_done(Flag::RefinerPublished) {
        build_image(ctx);
        publish_schema(ctx, sm)?;
        let dir = ctx.config.paths.refiner(ctx.project);
        let repo = sm.state.refiner_repo.clone();
        if let Some(r) = repo.as_deref().filter(|_| dir.join(".git").exists()) {
            if sm.state.refiner_release_after.is_none() {
                sm.state.refiner_release_after = Some(release_baseline(ctx.releases, r));
                sm.save()?;
            }
            push_repo(ctx.runner, &ctx.config.tools.git, &dir, &format!("Configure refiner for DLP {}", dlp_id))?;
        }
        let url = await_artifact(
            "refiner",
            repo.as_deref(),
            sm.state.refiner_release_after,
            ctx.config,
            ctx.releases,
            ctx.prompter,
        )?;
        sm.state.refiner_url = Some(url);
        sm.state.refiner_release_after = None;
        sm.mark(Flag::RefinerPublished)?;
    }

    if !sm.is_done(Flag::RefinerRegistered) {
        let registry = ctx.config.contracts.data_refiner_registry.clone();
        let tx = match sm.state.refiner_tx.clone() {
            Some(tx) => {
                tracing::info!(tx = %tx, "resuming pending addRefiner transaction");
                tx
            }
            None => {
                let tx = send_add_refiner(ctx, &sm.state, dlp_id, &registry)?;
                sm.state.refiner_tx = Some(tx.clone());
                sm.save()?;
                tx
            }
        };
        let receipt = match wait_for_receipt(ctx.chain, &tx, &ctx.config.polling) {
            Ok(r) => r,
            Err(e) => {
                // only a reverted transaction may be sent again
                if matches!(e.downcast_ref::<DeployError>(), Some(DeployError::Reverted(_))) {
                    sm.state.refiner_tx = None;
                    sm.save()?;
                }
                return Err(e);
            }
        };
        let id = refiner_id_from_receipt(&receipt, &registry)?;
        sm.state.refiner_id = Some(id);
        sm.state.refiner_tx = None;
        sm.mark(Flag::RefinerRegistered)?;
    }

    let mut report = StepReport::new(Step::Refiner, "done");
    if let Some(id) = sm.state.refiner_id {
        report = report.with("refinerId", id);
    }
    if let Some(url) = &sm.state.refiner_url {
        report = report.with("refinerUrl", url);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::chain::fake::{encode_uint, ok_receipt};
    use crate::services::chain::LogEntry;
    use crate::services::context::testing::Harness;
    use crate::services::releases::fake::FakeReleases;

    fn registered(h: &Harness) -> StateManager {
        let mut sm = StateManager::load(h.dir.path()).expect("load");
        sm.state.private_key = Some(format!("0x{}", "1".repeat(64)));
        sm.state.public_key = Some(format!("0x04{}", "9".repeat(128)));
        sm.state.dlp_name = Some("Demo".to_string());
        sm.state.pinata_api_key = Some("pk".to_string());
        sm.state.pinata_api_secret = Some("ps".to_string());
        sm.state.dlp_id = Some(5);
        sm.state.state.data_dao_registered = true;
        std::fs::create_dir_all(h.dir.path().join("refiner")).expect("mkdir");
        sm
    }

    fn refiner_log(registry: &str, id: u128) -> LogEntry {
        LogEntry {
            address: registry.to_ascii_lowercase(),
            topics: vec![format!("0x{}", "e".repeat(64)), format!("0x{}", encode_uint(id))],
            data: "0x".to_string(),
        }
    }

    #[test]
    fn refiner_id_comes_from_registry_log() {
        let registry = "0x93c3EF89369fDcf08Be159D9DeF0F18AB6Be008c";
        let other = LogEntry {
            address: "0xdead".to_string(),
            topics: vec!["0x01".to_string(), format!("0x{}", encode_uint(99))],
            data: "0x".to_string(),
        };
        let receipt = ok_receipt(vec![other, refiner_log(registry, 17)]);
        assert_eq!(refiner_id_from_receipt(&receipt, registry).expect("id"), 17);
        assert!(refiner_id_from_receipt(&ok_receipt(vec![]), registry).is_err());
    }

    #[test]
    fn full_flow_pins_schema_and_registers() {
        let mut h = Harness::new();
        h.releases = FakeReleases::with(&[Some("https://github.com/me/r/releases/download/v1/refiner.tar.gz")]);
        let registry = h.config.contracts.data_refiner_registry.clone();
        h.chain.push_receipt(Some(ok_receipt(vec![refiner_log(&registry, 3)])));
        let mut sm = registered(&h);
        std::fs::write(h.dir.path().join("refiner/schema.json"), r#"{"name":"demo","version":"0.1"}"#)
            .expect("schema");

        let report = deploy_refiner(&h.ctx(), &mut sm).expect("refiner");
        assert_eq!(report.outputs["refinerId"], "3");
        assert_eq!(sm.state.refiner_id, Some(3));
        assert!(sm.state.schema_url.as_deref().expect("schema url").ends_with("/ipfs/QmFake1"));
        assert_eq!(sm.state.refinement_encryption_key.as_ref().map(|k| k.len()), Some(64));

        let env = crate::services::envfile::read_env(&h.dir.path().join("refiner/.env")).expect("env");
        assert_eq!(env["PINATA_API_KEY"], "pk");
        let sent = h.chain.sent.borrow();
        assert_eq!(sent[0].signature, ADD_REFINER);
        assert_eq!(sent[0].args[0], "5");
        assert_eq!(sent[0].args[1], "Demo Refiner");
        assert!(h.runner.calls()[0].starts_with("docker build -t datadao-refiner"));
    }

    #[test]
    fn unchanged_schema_is_not_pinned_again() {
        let h = Harness::new();
        let mut sm = registered(&h);
        let body = br#"{"name":"demo"}"#;
        std::fs::write(h.dir.path().join("refiner/schema.json"), body).expect("schema");
        sm.state.schema_hash = Some(schema_hash(body));
        sm.state.schema_url = Some("https://gateway/ipfs/QmOld".to_string());
        let url = publish_schema(&h.ctx(), &mut sm).expect("schema");
        assert_eq!(url, "https://gateway/ipfs/QmOld");
        assert!(h.pinner.pinned.borrow().is_empty());
    }

    #[test]
    fn docker_failure_does_not_stop_publication() {
        let mut h = Harness::new();
        h.releases = FakeReleases::with(&[Some("https://x/r.tar.gz")]);
        h.runner.push_fail(1, "Cannot connect to the Docker daemon");
        let registry = h.config.contracts.data_refiner_registry.clone();
        h.chain.push_receipt(Some(ok_receipt(vec![refiner_log(&registry, 8)])));
        let mut sm = registered(&h);
        sm.state.schema_url = Some("https://gateway/ipfs/QmKnown".to_string());
        deploy_refiner(&h.ctx(), &mut sm).expect("refiner");
        assert!(sm.state.state.refiner_registered);
    }

    #[test]
    fn existing_env_key_is_adopted() {
        let h = Harness::new();
        let mut sm = registered(&h);
        std::fs::write(
            h.dir.path().join("refiner/.env"),
            "REFINEMENT_ENCRYPTION_KEY=abc123\nOTHER=1\n",
        )
        .expect("write env");
        configure(&h.ctx(), &mut sm).expect("configure");
        assert_eq!(sm.state.refinement_encryption_key.as_deref(), Some("abc123"));
        let env = read_env(&h.dir.path().join("refiner/.env")).expect("env");
        assert_eq!(env["OTHER"], "1");
        assert_eq!(env["PINATA_API_KEY"], "pk");
    }

    fn published(h: &Harness) -> StateManager {
        let mut sm = registered(h);
        sm.state.schema_url = Some("https://gateway/ipfs/QmKnown".to_string());
        sm.state.refiner_url = Some("https://x/r.tar.gz".to_string());
        sm.state.state.refiner_configured = true;
        sm.state.state.refiner_published = true;
        sm
    }

    #[test]
    fn pending_registration_is_resumed_not_resent() {
        let h = Harness::new();
        let mut sm = published(&h);
        let err = deploy_refiner(&h.ctx(), &mut sm).err().expect("no receipt yet");
        assert!(err.to_string().contains("gave up waiting"));
        let pending = sm.state.refiner_tx.clone().expect("pending tx kept");
        let reloaded = StateManager::load(h.dir.path()).expect("reload");
        assert_eq!(reloaded.state.refiner_tx.as_deref(), Some(pending.as_str()));

        let registry = h.config.contracts.data_refiner_registry.clone();
        h.chain.push_receipt(Some(ok_receipt(vec![refiner_log(&registry, 11)])));
        deploy_refiner(&h.ctx(), &mut sm).expect("resumed");
        assert_eq!(h.chain.sent.borrow().len(), 1);
        assert_eq!(sm.state.refiner_id, Some(11));
        assert_eq!(sm.state.refiner_tx, None);
    }

    #[test]
    fn reverted_registration_may_be_sent_again() {
        let h = Harness::new();
        let mut sm = published(&h);
        h.chain.push_receipt(Some(Receipt {
            success: false,
            block_number: Some(2),
            logs: vec![],
        }));
        let err = deploy_refiner(&h.ctx(), &mut sm).err().expect("reverted");
        assert!(err.to_string().contains("reverted"));
        assert_eq!(sm.state.refiner_tx, None);
    }

    #[test]
    fn missing_checkout_is_not_created() {
        let h = Harness::new();
        let mut sm = registered(&h);
        std::fs::remove_dir_all(h.dir.path().join("refiner")).expect("rmdir");
        let err = deploy_refiner(&h.ctx(), &mut sm).err().expect("error");
        assert!(err.to_string().contains("refiner checkout"));
        assert!(!h.dir.path().join("refiner").exists());
        assert!(!sm.state.state.refiner_configured);
    }

    #[test]
    fn missing_pinata_credentials_point_at_setup() {
        let h = Harness::new();
        let mut sm = registered(&h);
        sm.state.pinata_api_secret = None;
        let err = deploy_refiner(&h.ctx(), &mut sm).err().expect("error");
        assert!(err.to_string().contains("pinataApiSecret"));
    }
}
