//! Shared data model layer (structs/constants only).
//!
//! ## Files
//! - `models.rs` — deployment state, step/flag enums, report/output structs.
//! - `constants.rs` — network defaults and well-known file names.
//!
//! ## Rule of thumb
//! Domain types should be data-only: no filesystem/network side effects.
//!
//! ## Compatibility note
//! `DeploymentState` is the on-disk `deployment.json` schema. Field names are
//! camelCase and unknown keys are preserved, so other tooling that reads or
//! writes the same file keeps working.

pub mod constants;
pub mod models;
