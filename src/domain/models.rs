use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Serialize)]
pub struct JsonOut<T: Serialize> {
    pub ok: bool,
    pub data: T,
}

#[derive(Serialize)]
pub struct JsonErr {
    pub ok: bool,
    pub error: String,
    pub hint: Option<String>,
}

/// Contents of `deployment.json`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dlp_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_symbol: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinata_api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinata_api_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub google_client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub github_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_repo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refiner_repo: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vesting_address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dlp_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refiner_id: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refiner_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refinement_encryption_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nextauth_secret: Option<String>,

    /// `addRefiner` transaction submitted but not yet resolved to an id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refiner_tx: Option<String>,
    /// Newest release id seen before the last push; only newer releases count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proof_release_after: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refiner_release_after: Option<u64>,

    #[serde(default)]
    pub state: Progress,
    #[serde(default)]
    pub errors: BTreeMap<String, StepError>,

    /// Keys written by other tools; carried through untouched.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    #[serde(default)]
    pub contracts_deployed: bool,
    #[serde(default, rename = "dataDAORegistered")]
    pub data_dao_registered: bool,
    #[serde(default)]
    pub proof_configured: bool,
    #[serde(default)]
    pub proof_published: bool,
    #[serde(default)]
    pub proof_registered: bool,
    #[serde(default)]
    pub refiner_configured: bool,
    #[serde(default)]
    pub refiner_published: bool,
    #[serde(default)]
    pub refiner_registered: bool,
    #[serde(default)]
    pub ui_configured: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StepError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flag {
    ContractsDeployed,
    DataDaoRegistered,
    ProofConfigured,
    ProofPublished,
    ProofRegistered,
    RefinerConfigured,
    RefinerPublished,
    RefinerRegistered,
    UiConfigured,
}

impl Flag {
    pub const ALL: [Flag; 9] = [
        Flag::ContractsDeployed,
        Flag::DataDaoRegistered,
        Flag::ProofConfigured,
        Flag::ProofPublished,
        Flag::ProofRegistered,
        Flag::RefinerConfigured,
        Flag::RefinerPublished,
        Flag::RefinerRegistered,
        Flag::UiConfigured,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Flag::ContractsDeployed => "contractsDeployed",
            Flag::DataDaoRegistered => "dataDAORegistered",
            Flag::ProofConfigured => "proofConfigured",
            Flag::ProofPublished => "proofPublished",
            Flag::ProofRegistered => "proofRegistered",
            Flag::RefinerConfigured => "refinerConfigured",
            Flag::RefinerPublished => "refinerPublished",
            Flag::RefinerRegistered => "refinerRegistered",
            Flag::UiConfigured => "uiConfigured",
        }
    }
}

impl Progress {
    pub fn get(&self, flag: Flag) -> bool {
        match flag {
            Flag::ContractsDeployed => self.contracts_deployed,
            Flag::DataDaoRegistered => self.data_dao_registered,
            Flag::ProofConfigured => self.proof_configured,
            Flag::ProofPublished => self.proof_published,
            Flag::ProofRegistered => self.proof_registered,
            Flag::RefinerConfigured => self.refiner_configured,
            Flag::RefinerPublished => self.refiner_published,
            Flag::RefinerRegistered => self.refiner_registered,
            Flag::UiConfigured => self.ui_configured,
        }
    }

    pub fn set(&mut self, flag: Flag, value: bool) {
        let slot = match flag {
            Flag::ContractsDeployed => &mut self.contracts_deployed,
            Flag::DataDaoRegistered => &mut self.data_dao_registered,
            Flag::ProofConfigured => &mut self.proof_configured,
            Flag::ProofPublished => &mut self.proof_published,
            Flag::ProofRegistered => &mut self.proof_registered,
            Flag::RefinerConfigured => &mut self.refiner_configured,
            Flag::RefinerPublished => &mut self.refiner_published,
            Flag::RefinerRegistered => &mut self.refiner_registered,
            Flag::UiConfigured => &mut self.ui_configured,
        };
        *slot = value;
    }
}

/// A deployment step, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Step {
    Contracts,
    Register,
    Proof,
    Refiner,
    Ui,
}

impl Step {
    pub const ORDER: [Step; 5] = [
        Step::Contracts,
        Step::Register,
        Step::Proof,
        Step::Refiner,
        Step::Ui,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Step::Contracts => "contracts",
            Step::Register => "register",
            Step::Proof => "proof",
            Step::Refiner => "refiner",
            Step::Ui => "ui",
        }
    }

    /// The command an operator runs to perform this step.
    pub fn command(self) -> &'static str {
        match self {
            Step::Contracts => "datadao deploy contracts",
            Step::Register => "datadao register",
            Step::Proof => "datadao deploy proof",
            Step::Refiner => "datadao deploy refiner",
            Step::Ui => "datadao deploy ui",
        }
    }

    /// Flags owned by the step. The last one marks the step complete.
    pub fn flags(self) -> &'static [Flag] {
        match self {
            Step::Contracts => &[Flag::ContractsDeployed],
            Step::Register => &[Flag::DataDaoRegistered],
            Step::Proof => &[
                Flag::ProofConfigured,
                Flag::ProofPublished,
                Flag::ProofRegistered,
            ],
            Step::Refiner => &[
                Flag::RefinerConfigured,
                Flag::RefinerPublished,
                Flag::RefinerRegistered,
            ],
            Step::Ui => &[Flag::UiConfigured],
        }
    }

    pub fn completion_flag(self) -> Flag {
        let flags = self.flags();
        flags[flags.len() - 1]
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct StepReport {
    pub step: String,
    pub status: String,
    pub outputs: BTreeMap<String, String>,
}

impl StepReport {
    pub fn new(step: Step, status: &str) -> Self {
        Self {
            step: step.name().to_string(),
            status: status.to_string(),
            outputs: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: impl ToString) -> Self {
        self.outputs.insert(key.to_string(), value.to_string());
        self
    }
}

#[derive(Serialize)]
pub struct CheckItem {
    pub name: String,
    pub status: String,
}

#[derive(Serialize)]
pub struct DoctorReport {
    pub overall: String,
    pub checks: Vec<CheckItem>,
}

#[derive(Serialize)]
pub struct StepStatus {
    pub step: String,
    pub done: bool,
    pub flags: BTreeMap<String, bool>,
    pub error: Option<StepError>,
}

#[derive(Serialize)]
pub struct StatusReport {
    pub project: String,
    pub steps: Vec<StepStatus>,
    pub values: BTreeMap<String, String>,
    pub warnings: Vec<String>,
    pub next: Option<String>,
}

#[derive(Serialize)]
pub struct SetupReport {
    pub state_file: String,
    pub dlp_name: String,
    pub token_symbol: String,
    pub address: String,
    pub generated_wallet: bool,
    pub proof_repo: Option<String>,
    pub refiner_repo: Option<String>,
    pub contracts_env: bool,
    pub warnings: Vec<String>,
}
