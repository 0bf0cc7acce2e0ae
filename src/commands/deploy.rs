use crate::cli::{Cli, Commands, DeployCommands};
use crate::domain::models::{Step, StepReport};
use crate::services::context::StepContext;
use crate::services::contracts::deploy_contracts;
use crate::services::output::{print_one, print_out, step_line};
use crate::services::proof::deploy_proof;
use crate::services::refiner::deploy_refiner;
use crate::services::registration::register_datadao;
use crate::services::storage::StateManager;
use crate::services::ui::deploy_ui;

/// Runs one step; a failure lands in `errors[step]` before it is returned.
pub fn run_step(step: Step, ctx: &StepContext, sm: &mut StateManager) -> anyhow::Result<StepReport> {
    let span = tracing::info_span!("step", name = step.name());
    let _guard = span.enter();
    let result = match step {
        Step::Contracts => deploy_contracts(ctx, sm),
        Step::Register => register_datadao(ctx, sm),
        Step::Proof => deploy_proof(ctx, sm),
        Step::Refiner => deploy_refiner(ctx, sm),
        Step::Ui => deploy_ui(ctx, sm),
    };
    match result {
        Ok(report) => {
            sm.clear_error(step);
            sm.save()?;
            Ok(report)
        }
        Err(e) => {
            let message = format!("{:#}", e);
            sm.record_error(step, &message);
            if let Err(save_err) = sm.save() {
                tracing::error!(error = %save_err, "could not record failure in state file");
            }
            tracing::error!(error = %message, "step failed");
            Err(e)
        }
    }
}

/// Every step whose completion flag is unset, in order, stopping at the first failure.
pub fn run_all(ctx: &StepContext, sm: &mut StateManager) -> anyhow::Result<Vec<StepReport>> {
    let mut reports = Vec::new();
    for step in Step::ORDER {
        if sm.is_done(step.completion_flag()) {
            reports.push(StepReport::new(step, "skipped"));
            continue;
        }
        reports.push(run_step(step, ctx, sm)?);
    }
    Ok(reports)
}

pub fn handle_deploy_commands(
    cli: &Cli,
    ctx: &StepContext,
    sm: &mut StateManager,
) -> anyhow::Result<bool> {
    let step = match &cli.command {
        Commands::Register => Step::Register,
        Commands::Deploy { command } => match command {
            DeployCommands::All => {
                let reports = run_all(ctx, sm)?;
                print_out(cli.json, &reports, step_line)?;
                return Ok(true);
            }
            DeployCommands::Contracts => Step::Contracts,
            DeployCommands::Proof => Step::Proof,
            DeployCommands::Refiner => Step::Refiner,
            DeployCommands::Ui => Step::Ui,
        },
        _ => return Ok(false),
    };
    let report = run_step(step, ctx, sm)?;
    print_one(cli.json, report, step_line)?;
    Ok(true)
}
