//! compose-agent
//!
//! Receives compose deployments over gRPC and applies them with
//! `docker compose` on this host.

pub mod pb;
pub mod registry;
pub mod server;
pub mod service;

pub use server::{build_service, serve};
pub use service::DeployService;
