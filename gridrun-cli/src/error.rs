//! CLI-specific error types and exit code mapping

use gridrun_core::error::GridrunError;

/// CLI-specific error type.
///
/// `exit_code()` maps each variant to the process exit status.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// kubectl missing or cluster unreachable.
    #[error("prerequisite check failed: {0}")]
    Prerequisite(String),

    /// A pipeline step failed; carries the step name.
    #[error("deployment failed at step: {0}")]
    Pipeline(String),

    /// The job finished but did not pass.
    #[error("test job completed with failures")]
    JobFailed,

    /// No completion marker appeared before the deadline.
    #[error("test job did not complete within the timeout")]
    JobTimedOut,

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (file read, stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Wrapped domain error from gridrun-core.
    #[error("{0}")]
    Core(#[from] GridrunError),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                                    |
    /// |------|--------------------------------------------|
    /// | 0    | Success                                    |
    /// | 1    | Pipeline, prerequisite or job failure      |
    /// | 2    | Configuration error                        |
    /// | 3    | Job timed out                              |
    /// | 10   | IO error                                   |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(GridrunError::Config(_)) => 2,
            Self::JobTimedOut => 3,
            Self::Io(_) | Self::Core(GridrunError::Io(_)) => 10,
            Self::Command(_)
            | Self::Prerequisite(_)
            | Self::Pipeline(_)
            | Self::JobFailed
            | Self::JsonSerialize(_)
            | Self::Core(GridrunError::Deploy(_)) => 1,
        }
    }
}
