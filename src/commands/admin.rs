use crate::cli::{Cli, Commands, SetupArgs};
use crate::domain::models::{DoctorReport, SetupReport, Step};
use crate::services::context::StepContext;
use crate::services::doctor::run_doctor;
use crate::services::output::print_one;
use crate::services::pinning::{Pinata, Pinner};
use crate::services::setup::run_setup;
use crate::services::status::{build_status, render_status};
use crate::services::storage::StateManager;
use serde::Serialize;

#[derive(Serialize)]
pub struct ResetReport {
    pub reset: Vec<String>,
}

pub fn handle_admin_commands(
    cli: &Cli,
    ctx: &StepContext,
    sm: &mut StateManager,
) -> anyhow::Result<bool> {
    match &cli.command {
        Commands::Setup(args) => {
            let report = setup(ctx, sm, args)?;
            print_one(cli.json, report, setup_lines)?;
        }
        Commands::Status => {
            print_one(cli.json, build_status(sm), render_status)?;
        }
        Commands::Reset { step, all } => {
            let report = reset(ctx, sm, *step, *all)?;
            print_one(cli.json, report, |r| {
                if r.reset.is_empty() {
                    "nothing reset".to_string()
                } else {
                    format!("reset: {}", r.reset.join(", "))
                }
            })?;
        }
        Commands::Doctor => {
            let report = run_doctor(ctx, sm);
            print_one(cli.json, report, doctor_lines)?;
        }
        _ => return Ok(false),
    }
    Ok(true)
}

fn setup(ctx: &StepContext, sm: &mut StateManager, args: &SetupArgs) -> anyhow::Result<SetupReport> {
    let mut report = run_setup(ctx, sm, args.input())?;
    if args.skip_checks {
        return Ok(report);
    }
    if let (Some(key), Some(secret)) = (&sm.state.pinata_api_key, &sm.state.pinata_api_secret) {
        let services = &ctx.config.services;
        let checked = Pinata::new(&services.pinata_api_url, key, secret, services.http_timeout_ms)
            .and_then(|p| p.test_auth());
        if let Err(e) = checked {
            tracing::warn!(error = %e, "pinata credential check failed");
            report
                .warnings
                .push(format!("Pinata credentials could not be verified: {:#}", e));
        }
    }
    Ok(report)
}

/// Clears flags for one step, or every step when `all` is set (or nothing was named).
pub fn reset(
    ctx: &StepContext,
    sm: &mut StateManager,
    step: Option<Step>,
    all: bool,
) -> anyhow::Result<ResetReport> {
    let steps: Vec<Step> = match step {
        Some(s) if !all => vec![s],
        _ => {
            if !ctx
                .prompter
                .confirm("Clear progress for every step? Values in deployment.json are kept.", true)?
            {
                return Ok(ResetReport { reset: Vec::new() });
            }
            Step::ORDER.to_vec()
        }
    };
    if steps.len() == Step::ORDER.len() {
        sm.reset_all();
    } else {
        for s in &steps {
            sm.reset_step(*s);
        }
    }
    sm.save()?;
    tracing::info!(steps = steps.len(), "progress reset");
    Ok(ResetReport {
        reset: steps.iter().map(|s| s.name().to_string()).collect(),
    })
}

fn setup_lines(r: &SetupReport) -> String {
    let mut out = vec![
        format!("saved {}", r.state_file),
        format!("dlp: {} ({})", r.dlp_name, r.token_symbol),
        format!("wallet: {}{}", r.address, if r.generated_wallet { " (new)" } else { "" }),
    ];
    if let Some(repo) = &r.proof_repo {
        out.push(format!("proof repo: {}", repo));
    }
    if let Some(repo) = &r.refiner_repo {
        out.push(format!("refiner repo: {}", repo));
    }
    if r.contracts_env {
        out.push("contracts/.env updated".to_string());
    }
    for w in &r.warnings {
        out.push(format!("warning: {}", w));
    }
    out.push(format!("next: {}", Step::Contracts.command()));
    out.join("\n")
}

fn doctor_lines(r: &DoctorReport) -> String {
    let mut out: Vec<String> = r
        .checks
        .iter()
        .map(|c| format!("{}\t{}", c.name, c.status))
        .collect();
    out.push(format!("overall\t{}", r.overall));
    out.join("\n")
}
