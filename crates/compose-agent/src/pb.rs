//! gRPC types for the `deployAgent.DeployDockerCompose` service

#![allow(clippy::all)]

include!("generated/deploy_agent.rs");
