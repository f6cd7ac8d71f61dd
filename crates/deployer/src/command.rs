//! External command execution.
//!
//! Every control-plane interaction spawns exactly one process through a
//! [`CommandRunner`]. There is no retry at this layer; the pollers above it
//! decide whether a failed read is worth repeating.

use std::fmt;
use std::future::Future;
use std::process::Stdio;

use metrics::counter;
use tokio::process::Command;
use tracing::debug;

use gridrun_core::metrics as m;
use gridrun_core::types::CommandResult;

use crate::error::CommandError;

/// Program plus argument vector. Never passed through a shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    program: String,
    args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn argv(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// How a command's exit status and output are handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Turn a non-zero exit into `CommandError::NonZeroExit`.
    pub fail_on_error: bool,
    /// Buffer stdout/stderr; when false they stream to the console.
    pub capture_output: bool,
}

impl RunOptions {
    /// Capture output and fail on non-zero exit.
    pub const CHECKED: Self = Self {
        fail_on_error: true,
        capture_output: true,
    };

    /// Capture output and return the result whatever the exit status.
    pub const UNCHECKED: Self = Self {
        fail_on_error: false,
        capture_output: true,
    };

    /// Stream output straight to the console.
    pub const STREAMED: Self = Self {
        fail_on_error: false,
        capture_output: false,
    };
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::CHECKED
    }
}

/// Executes a single external command.
pub trait CommandRunner: Send + Sync + 'static {
    fn run(
        &self,
        spec: &CommandSpec,
        options: RunOptions,
    ) -> impl Future<Output = Result<CommandResult, CommandError>> + Send;
}

/// Runs commands as child processes via `tokio::process`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        spec: &CommandSpec,
        options: RunOptions,
    ) -> Result<CommandResult, CommandError> {
        debug!(command = %spec, capture = options.capture_output, "running command");

        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args).stdin(Stdio::null()).kill_on_drop(true);

        let result = if options.capture_output {
            let output = cmd.output().await.map_err(|source| CommandError::Spawn {
                program: spec.program.clone(),
                source,
            })?;
            CommandResult {
                exit_code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }
        } else {
            let status = cmd
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status()
                .await
                .map_err(|source| CommandError::Spawn {
                    program: spec.program.clone(),
                    source,
                })?;
            CommandResult {
                exit_code: status.code(),
                ..Default::default()
            }
        };

        let outcome = if result.success() {
            "success"
        } else {
            "failure"
        };
        counter!(m::COMMANDS_EXECUTED_TOTAL, m::LABEL_RESULT => outcome).increment(1);
        debug!(command = %spec, exit_code = ?result.exit_code, "command finished");

        check_exit(spec, result, options)
    }
}

/// Applies the `fail_on_error` policy to a finished command.
pub(crate) fn check_exit(
    spec: &CommandSpec,
    result: CommandResult,
    options: RunOptions,
) -> Result<CommandResult, CommandError> {
    if options.fail_on_error && !result.success() {
        return Err(CommandError::NonZeroExit {
            command: spec.to_string(),
            exit_code: result.exit_code,
            stderr: result.stderr.trim().to_owned(),
        });
    }
    Ok(result)
}
