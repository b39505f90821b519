//! Launch orchestration
//!
//! Sequences resolve, materialize, validate, detect, build and spawn for one
//! connection and reports a single outcome.

mod orchestrator;
mod outcome;
mod spawner;

pub use orchestrator::{LaunchOptions, LaunchOrchestrator};
pub use outcome::{LaunchFailure, LaunchOutcome, LaunchReport, LaunchStage};
pub use spawner::{DetachedSpawner, Spawner};
