//! Deployer error types
//!
//! [`DeployerError`] covers every failure a deployment component can hit. The
//! components catch these at their boundary and hand the orchestrator a plain
//! success/failure signal; `From<DeployerError> for GridrunError` exists for
//! callers that prefer `?` propagation.

use std::time::Duration;

use gridrun_core::error::GridrunError;

/// Failure of a single external command.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The process could not be started (binary missing, permissions).
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The process ran and exited unsuccessfully.
    #[error("command '{command}' exited with {}: {stderr}", exit_label(.exit_code))]
    NonZeroExit {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "signal".to_owned(),
    }
}

/// Deployment component errors.
#[derive(Debug, thiserror::Error)]
pub enum DeployerError {
    /// Control-plane CLI missing or cluster unreachable.
    #[error("prerequisite check failed: {0}")]
    Prerequisite(String),

    /// A manifest apply, patch or scale command failed.
    #[error("failed to {action} {target}: {reason}")]
    Apply {
        action: &'static str,
        target: String,
        reason: String,
    },

    /// The workload never reached its desired ready-replica count.
    #[error(
        "workload '{workload}' not ready after {timeout:?} ({last_ready}/{desired} replicas ready)"
    )]
    ReadinessTimeout {
        workload: String,
        desired: u32,
        last_ready: u32,
        timeout: Duration,
    },

    /// No pod matched the job-runner selector.
    #[error("no pod found for selector '{selector}' in namespace '{namespace}'")]
    Discovery { selector: String, namespace: String },

    /// No completion marker appeared in the job log before the deadline.
    #[error("job did not report completion within {timeout:?}")]
    JobTimeout { timeout: Duration },

    /// Writing the report artifact failed.
    #[error("failed to archive report: {0}")]
    Archive(String),

    /// An underlying control-plane command failed.
    #[error(transparent)]
    Command(#[from] CommandError),
}

impl From<DeployerError> for GridrunError {
    fn from(err: DeployerError) -> Self {
        GridrunError::Deploy(err.to_string())
    }
}
