mod common;

use common::{TestEnv, OWNER, PRIVATE_KEY, PROXY, TOKEN, VESTING};
use predicates::str::contains;
use std::fs;

#[test]
fn fresh_project_status_points_at_setup() {
    let env = TestEnv::new();
    let v = env.run_json(&["status"]);
    assert_eq!(v["ok"], true);
    assert_eq!(v["data"]["next"], "datadao setup");
    assert_eq!(v["data"]["steps"].as_array().map(|s| s.len()), Some(5));
    assert!(!env.project.join("deployment.json").exists());
}

#[test]
fn setup_writes_state_and_contracts_env() {
    let env = TestEnv::new();
    let v = env.setup();
    assert_eq!(v["data"]["token_symbol"], "SLEEP");
    assert_eq!(v["data"]["proof_repo"], "octo/sleep-data-dao-proof");
    assert_eq!(v["data"]["contracts_env"], true);

    let state = env.state();
    assert_eq!(state["dlpName"], "Sleep Data DAO");
    assert_eq!(state["address"], OWNER);
    assert_eq!(state["refinerRepo"], "octo/sleep-data-dao-refiner");
    assert_eq!(state["state"]["contractsDeployed"], false);

    let dotenv = fs::read_to_string(env.project.join("contracts/.env")).expect("contracts env");
    assert!(dotenv.contains("DLP_TOKEN_SYMBOL=SLEEP"));
    assert!(dotenv.contains(&format!("OWNER_ADDRESS={}", OWNER)));
}

#[test]
fn status_masks_secrets() {
    let env = TestEnv::new();
    env.setup();
    let v = env.run_json(&["status"]);
    let values = &v["data"]["values"];
    assert_eq!(values["privateKey"], "********690d");
    assert_eq!(values["googleClientSecret"], "********alue");
    assert_eq!(v["data"]["next"], "datadao deploy contracts");

    let out = env.cmd().arg("status").assert().success().get_output().stdout.clone();
    let text = String::from_utf8(out).expect("utf8");
    assert!(text.contains("contracts\tpending"));
    assert!(!text.contains("pinata-secret-value"));
}

#[test]
fn setup_without_key_fails_when_non_interactive() {
    let env = TestEnv::new();
    let v = env.fail_json(&["setup", "--dlp-name", "Demo", "--skip-checks"]);
    assert_eq!(v["ok"], false);
    assert!(v["error"]
        .as_str()
        .unwrap_or_default()
        .contains("missing value"));
}

#[test]
fn register_before_contracts_records_error_with_command() {
    let env = TestEnv::new();
    env.setup();
    let v = env.fail_json(&["register"]);
    assert!(v["error"]
        .as_str()
        .unwrap_or_default()
        .contains("datadao deploy contracts"));

    let state = env.state();
    assert!(state["errors"]["register"]["message"].is_string());
    assert!(state["errors"]["register"]["timestamp"].is_string());
}

#[test]
fn deploy_contracts_scrapes_addresses() {
    let env = TestEnv::new();
    env.setup();
    let v = env.run_json(&["deploy", "contracts"]);
    assert_eq!(v["data"]["status"], "done");
    assert_eq!(v["data"]["outputs"]["proxyAddress"], PROXY);

    let state = env.state();
    assert_eq!(state["tokenAddress"], TOKEN);
    assert_eq!(state["proxyAddress"], PROXY);
    assert_eq!(state["vestingAddress"], VESTING);
    assert_eq!(state["state"]["contractsDeployed"], true);
}

#[test]
fn second_contracts_run_keeps_the_deployed_pool() {
    let env = TestEnv::new();
    env.setup();
    env.run_json(&["deploy", "contracts"]);

    common::write_config(
        &env.project,
        "echo 'DataLiquidityPoolProxy deployed to: 0x9999999999999999999999999999999999999999'",
    );
    let v = env.run_json(&["deploy", "contracts"]);
    assert_eq!(v["data"]["status"], "already_deployed");
    assert_eq!(v["data"]["outputs"]["proxyAddress"], PROXY);
    assert_eq!(env.state()["proxyAddress"], PROXY);
}

#[test]
fn debug_logging_never_prints_the_private_key() {
    let env = TestEnv::new();
    let out = env
        .cmd()
        .args([
            "-vv",
            "setup",
            "--dlp-name",
            "Demo",
            "--private-key",
            PRIVATE_KEY,
            "--skip-checks",
        ])
        .assert()
        .failure()
        .get_output()
        .clone();
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("running tool"));
    assert!(stderr.contains("********690d"));
    assert!(!stderr.contains(&PRIVATE_KEY[2..]));
}

#[test]
fn failed_deploy_tool_is_reported_and_recorded() {
    let env = TestEnv::new();
    common::write_config(&env.project, "echo 'Error: insufficient funds for gas' >&2; exit 1");
    env.setup();
    env.cmd()
        .args(["deploy", "contracts"])
        .assert()
        .failure()
        .stderr(contains("hint:"))
        .stderr(contains("faucet"));

    let state = env.state();
    assert_eq!(state["state"]["contractsDeployed"], false);
    assert!(state["errors"]["contracts"]["hint"]
        .as_str()
        .unwrap_or_default()
        .contains("faucet"));
}

#[test]
fn ui_step_writes_env_from_registered_state() {
    let env = TestEnv::new();
    env.setup();
    let mut state = env.state();
    state["tokenAddress"] = TOKEN.into();
    state["proxyAddress"] = PROXY.into();
    state["dlpId"] = 27.into();
    state["state"]["contractsDeployed"] = true.into();
    state["state"]["dataDAORegistered"] = true.into();
    env.write_state(&state);
    fs::create_dir_all(env.project.join("ui")).expect("create ui checkout");

    let v = env.run_json(&["deploy", "ui"]);
    assert_eq!(v["data"]["status"], "done");

    let dotenv = fs::read_to_string(env.project.join("ui/.env")).expect("ui env");
    assert!(dotenv.contains("NEXT_PUBLIC_DLP_ID=27"));
    assert!(dotenv.contains("GOOGLE_CLIENT_ID=gid.apps.googleusercontent.com"));
    assert!(dotenv.contains(&format!("NEXT_PUBLIC_DLP_CONTRACT_ADDRESS={}", PROXY)));
    assert_eq!(env.state()["state"]["uiConfigured"], true);
}

#[test]
fn deploy_all_skips_completed_steps() {
    let env = TestEnv::new();
    env.setup();
    let mut state = env.state();
    for flag in [
        "contractsDeployed",
        "dataDAORegistered",
        "proofConfigured",
        "proofPublished",
        "proofRegistered",
        "refinerConfigured",
        "refinerPublished",
        "refinerRegistered",
        "uiConfigured",
    ] {
        state["state"][flag] = true.into();
    }
    env.write_state(&state);

    let v = env.run_json(&["deploy", "all"]);
    let reports = v["data"].as_array().expect("reports");
    assert_eq!(reports.len(), 5);
    assert!(reports.iter().all(|r| r["status"] == "skipped"));
}

#[test]
fn reset_step_clears_only_that_step() {
    let env = TestEnv::new();
    env.setup();
    env.run_json(&["deploy", "contracts"]);
    let v = env.run_json(&["reset", "--step", "contracts"]);
    assert_eq!(v["data"]["reset"][0], "contracts");

    let state = env.state();
    assert_eq!(state["state"]["contractsDeployed"], false);
    assert_eq!(state["proxyAddress"], PROXY);
}

#[test]
fn unknown_state_fields_survive_a_rewrite() {
    let env = TestEnv::new();
    env.setup();
    let mut state = env.state();
    state["customNote"] = "keep me".into();
    state["state"]["legacyFlag"] = true.into();
    env.write_state(&state);

    env.run_json(&["reset", "--all"]);
    let state = env.state();
    assert_eq!(state["customNote"], "keep me");
    assert_eq!(state["state"]["legacyFlag"], true);
}

#[test]
fn doctor_reports_missing_tools_and_rpc() {
    let env = TestEnv::new();
    env.setup();
    let v = env.run_json(&["doctor"]);
    assert_eq!(v["data"]["overall"], "needs_attention");
    let checks = v["data"]["checks"].as_array().expect("checks");
    let status = |name: &str| {
        checks
            .iter()
            .find(|c| c["name"] == name)
            .map(|c| c["status"].clone())
    };
    assert_eq!(status("deployment_json"), Some("ok".into()));
    assert_eq!(status("tool_cast"), Some("missing".into()));
    assert_eq!(status("rpc_reachable"), Some("unreachable".into()));
    assert_eq!(status("wallet_balance"), Some("unknown".into()));
}

#[test]
fn bad_config_is_a_clean_error() {
    let env = TestEnv::new();
    fs::write(env.project.join("datadao.toml"), "[network\nrpc_url = 1").expect("write config");
    let v = env.fail_json(&["status"]);
    assert!(v["error"].as_str().unwrap_or_default().contains("datadao.toml"));
}
