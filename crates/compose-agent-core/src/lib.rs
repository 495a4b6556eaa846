//! compose-agent core
//!
//! Turns a deployment request (compose manifest + env file) into staged files
//! and the `docker compose` down / pull / up sequence.

pub mod error;
pub mod lifecycle;
pub mod log;
pub mod manifest;
pub mod model;
pub mod orchestrator;
pub mod process;
pub mod staging;

pub use error::*;
pub use lifecycle::{LifecycleCommand, project_name};
pub use log::{DeployLog, FileDeployLog, MemoryDeployLog, NullDeployLog};
pub use manifest::Manifest;
pub use model::*;
pub use orchestrator::{DEFAULT_COMMAND_TIMEOUT, DeploymentOrchestrator, OrchestratorConfig};
pub use process::{ProcessOutcome, ProcessRunner, TokioProcessRunner};
pub use staging::{ENV_FILE, MANIFEST_FILE, StagedFiles, StagingArea};
