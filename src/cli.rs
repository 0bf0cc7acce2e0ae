use crate::domain::models::Step;
use crate::services::setup::SetupInput;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "datadao", version, about = "DataDAO deployment toolkit")]
pub struct Cli {
    #[arg(long, global = true, help = "Output machine-readable JSON")]
    pub json: bool,
    #[arg(
        long,
        global = true,
        default_value = ".",
        help = "Project directory holding deployment.json"
    )]
    pub project_dir: PathBuf,
    #[arg(long, global = true, help = "Never prompt; missing values are errors")]
    pub non_interactive: bool,
    #[arg(short, long, global = true, action = clap::ArgAction::Count, help = "Increase log verbosity")]
    pub verbose: u8,
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect credentials and write deployment.json
    Setup(SetupArgs),
    Deploy {
        #[command(subcommand)]
        command: DeployCommands,
    },
    /// Register the deployed pool in the DLP registry
    Register,
    /// Show step progress, recorded errors and the next command
    Status,
    /// Clear completion flags so a step runs again
    Reset {
        #[arg(long, value_enum)]
        step: Option<Step>,
        #[arg(long, default_value_t = false)]
        all: bool,
    },
    /// Check tools, RPC reachability and wallet balance
    Doctor,
}

#[derive(Subcommand, Debug)]
pub enum DeployCommands {
    /// Run every pending step in order
    All,
    Contracts,
    Proof,
    Refiner,
    Ui,
}

#[derive(Args, Debug, Default)]
pub struct SetupArgs {
    #[arg(long)]
    pub dlp_name: Option<String>,
    #[arg(long)]
    pub token_name: Option<String>,
    #[arg(long)]
    pub token_symbol: Option<String>,
    #[arg(long, env = "DATADAO_PRIVATE_KEY", hide_env_values = true)]
    pub private_key: Option<String>,
    #[arg(long)]
    pub address: Option<String>,
    #[arg(long)]
    pub public_key: Option<String>,
    #[arg(long, env = "PINATA_API_KEY", hide_env_values = true)]
    pub pinata_api_key: Option<String>,
    #[arg(long, env = "PINATA_API_SECRET", hide_env_values = true)]
    pub pinata_api_secret: Option<String>,
    #[arg(long, env = "GOOGLE_CLIENT_ID")]
    pub google_client_id: Option<String>,
    #[arg(long, env = "GOOGLE_CLIENT_SECRET", hide_env_values = true)]
    pub google_client_secret: Option<String>,
    #[arg(long, env = "GITHUB_USERNAME")]
    pub github_username: Option<String>,
    #[arg(long)]
    pub proof_repo: Option<String>,
    #[arg(long)]
    pub refiner_repo: Option<String>,
    #[arg(long, default_value_t = false, help = "Skip the Pinata credential check")]
    pub skip_checks: bool,
}

impl SetupArgs {
    pub fn input(&self) -> SetupInput {
        SetupInput {
            dlp_name: self.dlp_name.clone(),
            token_name: self.token_name.clone(),
            token_symbol: self.token_symbol.clone(),
            private_key: self.private_key.clone(),
            address: self.address.clone(),
            public_key: self.public_key.clone(),
            pinata_api_key: self.pinata_api_key.clone(),
            pinata_api_secret: self.pinata_api_secret.clone(),
            google_client_id: self.google_client_id.clone(),
            google_client_secret: self.google_client_secret.clone(),
            github_username: self.github_username.clone(),
            proof_repo: self.proof_repo.clone(),
            refiner_repo: self.refiner_repo.clone(),
        }
    }
}
