//! Service layer containing deployment logic and side-effect helpers.
//!
//! ## Service map
//! - `setup.rs` — credential collection and state seeding.
//! - `contracts.rs` — deploy tool invocation + address extraction.
//! - `registration.rs` — DLP registry registration and id lookup.
//! - `proof.rs` — proof template configure/publish/register.
//! - `refiner.rs` — refiner configure/build/schema pin/publish/register.
//! - `ui.rs` — web application `.env` wiring.
//! - `status.rs` / `doctor.rs` — read-only reports.
//! - `storage.rs` — `deployment.json` persistence (`StateManager`).
//! - `envfile.rs` — dotenv merge writer.
//! - `chain.rs` — JSON-RPC reads, ABI helpers, `cast send`.
//! - `releases.rs` — git push + release artifact polling.
//! - `pinning.rs` — IPFS pinning.
//! - `shell.rs` / `prompt.rs` / `poll.rs` — tool, operator and retry plumbing.
//! - `output.rs` — JSON/text output helpers.
//!
//! ## Conventions
//! - External systems sit behind traits (`CommandRunner`, `Chain`,
//!   `ReleaseSource`, `Pinner`, `Prompter`) collected in `StepContext`.
//! - Steps persist each flag as soon as it flips, so a re-run resumes.
//! - Keep command handlers thin; delegate to services.

pub mod chain;
pub mod context;
pub mod contracts;
pub mod doctor;
pub mod envfile;
pub mod output;
pub mod pinning;
pub mod poll;
pub mod proof;
pub mod prompt;
pub mod refiner;
pub mod registration;
pub mod releases;
pub mod setup;
pub mod shell;
pub mod status;
pub mod storage;
pub mod ui;
