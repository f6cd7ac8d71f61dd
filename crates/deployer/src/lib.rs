//! gridrun deployer: drives a browser grid and a test-runner job through a
//! Kubernetes control plane.
//!
//! # Modules
//!
//! - [`command`]: external process execution
//! - [`client`]: control-plane capability and its `kubectl` implementation
//! - [`applier`]: manifest apply, patch and scale
//! - [`retry`]: bounded polling against an injected clock
//! - [`readiness`]: replica readiness and service endpoint checks
//! - [`monitor`]: job log polling and outcome classification
//! - [`archive`]: report file persistence
//! - [`pipeline`]: the orchestrator state machine and teardown

pub mod applier;
pub mod archive;
pub mod client;
pub mod command;
pub mod discovery;
pub mod error;
pub mod monitor;
pub mod pipeline;
pub mod readiness;
pub mod retry;

#[cfg(test)]
mod mock;

pub use client::{ControlPlaneClient, FieldQuery, KubectlClient};
pub use command::{CommandRunner, CommandSpec, ProcessRunner, RunOptions};
pub use error::{CommandError, DeployerError};
pub use pipeline::{Orchestrator, PipelineState, RunFailure, RunReport, Step};
