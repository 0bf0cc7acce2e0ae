use clap::Parser;
use std::io::IsTerminal;

mod cli;
mod commands;
mod config;
mod domain;
mod error;
mod logging;
mod services;

use cli::Cli;
use commands::{handle_admin_commands, handle_deploy_commands};
use services::chain::RpcChain;
use services::context::StepContext;
use services::output::print_error;
use services::pinning::{NoPinning, Pinata, Pinner};
use services::prompt::{NoPrompt, Prompter, TermPrompter};
use services::releases::GithubReleases;
use services::shell::SystemRunner;
use services::storage::StateManager;

fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init_logging(cli.verbose) {
        eprintln!("logging disabled: {}", e);
    }
    if let Err(e) = run(&cli) {
        let hint = error::classify(&format!("{:#}", e));
        print_error(cli.json, &e, hint);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let project = cli.project_dir.as_path();
    let config = config::load_config(project)?;
    let mut sm = StateManager::load(project)?;
    for w in sm.validate() {
        tracing::warn!(warning = %w, "state inconsistency");
    }

    let services = &config.services;
    let runner = SystemRunner;
    let chain = RpcChain::new(
        &config.network.rpc_url,
        services.http_timeout_ms,
        &config.tools.cast,
        SystemRunner,
        project.to_path_buf(),
    )?;
    let releases = GithubReleases::new(&services.github_api_url, services.http_timeout_ms)?;
    let pinner: Box<dyn Pinner> = match (&sm.state.pinata_api_key, &sm.state.pinata_api_secret) {
        (Some(key), Some(secret)) => Box::new(Pinata::new(
            &services.pinata_api_url,
            key,
            secret,
            services.http_timeout_ms,
        )?),
        _ => Box::new(NoPinning),
    };
    let prompter: Box<dyn Prompter> = if cli.non_interactive || !std::io::stdin().is_terminal() {
        Box::new(NoPrompt)
    } else {
        Box::new(TermPrompter::new())
    };

    let ctx = StepContext {
        project,
        config: &config,
        runner: &runner,
        chain: &chain,
        prompter: prompter.as_ref(),
        releases: &releases,
        pinner: pinner.as_ref(),
    };

    if handle_admin_commands(cli, &ctx, &mut sm)? {
        return Ok(());
    }
    if handle_deploy_commands(cli, &ctx, &mut sm)? {
        return Ok(());
    }
    Ok(())
}
