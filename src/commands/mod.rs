//! Command handler layer.
//!
//! This module owns CLI-oriented orchestration and output wiring.
//!
//! ## Files
//! - `admin.rs` — setup/status/reset/doctor.
//! - `deploy.rs` — the deployment steps and `deploy all`.
//!
//! ## Principles
//! - Parse/match CLI inputs here.
//! - Delegate deployment logic to `services/*`.
//! - Failures are recorded in `deployment.json` before they propagate.

pub mod admin;
pub mod deploy;

pub use admin::handle_admin_commands;
pub use deploy::handle_deploy_commands;
