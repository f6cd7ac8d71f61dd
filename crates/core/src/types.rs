//! Domain types shared by the deployer and the CLI.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The five ordered manifests consumed by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Manifest {
    Namespace,
    Config,
    Workload,
    Service,
    JobRunner,
}

impl Manifest {
    /// File name inside the manifest directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Namespace => "01-namespace.yaml",
            Self::Config => "02-configmap.yaml",
            Self::Workload => "03-chrome-node-deployment.yaml",
            Self::Service => "04-chrome-node-service.yaml",
            Self::JobRunner => "05-test-controller-deployment.yaml",
        }
    }
}

/// Outcome of one external command invocation.
///
/// When output was streamed to the console instead of captured, `stdout` and
/// `stderr` are empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandResult {
    /// Exit code; `None` when the process was terminated by a signal.
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Captured stdout with surrounding whitespace removed.
    pub fn trimmed_stdout(&self) -> &str {
        self.stdout.trim()
    }
}

/// Desired versus observed ready replicas at one poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReadinessState {
    pub desired: u32,
    pub ready: u32,
}

impl ReadinessState {
    pub fn is_ready(&self) -> bool {
        self.ready == self.desired
    }
}

impl fmt::Display for ReadinessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.ready, self.desired)
    }
}

/// Final status of the test job, decoded from its log stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobOutcome {
    /// A completion marker appeared and the log reports a passing run.
    Passed,
    /// A completion marker appeared but the run did not pass.
    Failed,
    /// No completion marker appeared before the deadline.
    TimedOut,
}

impl JobOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A persisted copy of the job-runner log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportArtifact {
    pub path: PathBuf,
    #[serde(skip)]
    pub content: String,
    /// Lines matching the pass/fail summary pattern.
    pub summary: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_file_names_are_ordered() {
        let names: Vec<_> = [
            Manifest::Namespace,
            Manifest::Config,
            Manifest::Workload,
            Manifest::Service,
            Manifest::JobRunner,
        ]
        .iter()
        .map(Manifest::file_name)
        .collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }

    #[test]
    fn command_result_success_requires_zero_exit() {
        let ok = CommandResult {
            exit_code: Some(0),
            ..Default::default()
        };
        let failed = CommandResult {
            exit_code: Some(1),
            ..Default::default()
        };
        let signalled = CommandResult::default();
        assert!(ok.success());
        assert!(!failed.success());
        assert!(!signalled.success());
    }

    #[test]
    fn readiness_state_display() {
        let state = ReadinessState {
            desired: 3,
            ready: 1,
        };
        assert_eq!(state.to_string(), "1/3");
        assert!(!state.is_ready());
    }

    #[test]
    fn job_outcome_serializes_snake_case() {
        let json = serde_json::to_string(&JobOutcome::TimedOut).unwrap();
        assert_eq!(json, "\"timed_out\"");
    }
}
