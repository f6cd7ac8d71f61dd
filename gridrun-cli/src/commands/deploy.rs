//! Default entry point: run the full deployment pipeline.

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use gridrun_core::clock::SystemClock;
use gridrun_core::config::{DeployOverrides, DeploymentConfig, GridrunConfig};
use gridrun_core::reporter::Reporter;
use gridrun_core::types::JobOutcome;
use gridrun_deployer::{KubectlClient, Orchestrator, RunFailure, RunReport};

use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the deployment pipeline.
pub async fn execute(
    config: &GridrunConfig,
    overrides: &DeployOverrides,
    writer: &OutputWriter,
    reporter: Arc<dyn Reporter>,
) -> Result<(), CliError> {
    let deployment = DeploymentConfig::from_config(config, overrides)?;
    info!(
        namespace = deployment.namespace(),
        node_count = deployment.node_count(),
        "starting deployment"
    );

    let client = Arc::new(KubectlClient::new(config.cluster.kubectl.clone()));
    let orchestrator = Orchestrator::new(deployment, client, Arc::new(SystemClock), reporter);

    let report = orchestrator.run().await;
    let summary = RunSummary::from_report(orchestrator.config(), &report);
    writer.render(&summary)?;

    exit_status(&report)
}

/// Maps a finished run to the CLI result.
pub fn exit_status(report: &RunReport) -> Result<(), CliError> {
    match &report.failure {
        Some(RunFailure::Prerequisite(reason)) => {
            return Err(CliError::Prerequisite(reason.clone()));
        }
        Some(RunFailure::Step(step)) => return Err(CliError::Pipeline(step.name().to_owned())),
        None => {}
    }

    match report.outcome {
        Some(JobOutcome::Passed) => Ok(()),
        Some(JobOutcome::TimedOut) => Err(CliError::JobTimedOut),
        Some(JobOutcome::Failed) | None => Err(CliError::JobFailed),
    }
}

/// Final run summary.
#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub namespace: String,
    pub node_count: u32,
    pub success: bool,
    pub completed_steps: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prerequisite_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<JobOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_path: Option<String>,
    pub summary_lines: Vec<String>,
}

impl RunSummary {
    pub fn from_report(config: &DeploymentConfig, report: &RunReport) -> Self {
        let (failed_step, prerequisite_error) = match &report.failure {
            Some(RunFailure::Step(step)) => (Some(step.name().to_owned()), None),
            Some(RunFailure::Prerequisite(reason)) => (None, Some(reason.clone())),
            None => (None, None),
        };

        let artifact = report.report.as_ref();
        Self {
            namespace: config.namespace().to_owned(),
            node_count: config.node_count(),
            success: report.succeeded(),
            completed_steps: report
                .completed
                .iter()
                .map(|s| s.name().to_owned())
                .collect(),
            failed_step,
            prerequisite_error,
            outcome: report.outcome,
            report_path: artifact.map(|r| r.path.display().to_string()),
            summary_lines: artifact.map(|r| r.summary.clone()).unwrap_or_default(),
        }
    }
}

impl Render for RunSummary {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w)?;
        writeln!(w, "Run Summary: {}", self.namespace.bold())?;
        writeln!(w, "  Nodes:     {}", self.node_count)?;
        writeln!(w, "  Steps:     {}/9 completed", self.completed_steps.len())?;

        if let Some(reason) = &self.prerequisite_error {
            writeln!(w, "  Preflight: {}", reason.red())?;
        }
        if let Some(step) = &self.failed_step {
            writeln!(w, "  Failed at: {}", step.red().bold())?;
        }

        let outcome = match self.outcome {
            Some(JobOutcome::Passed) => "PASSED".green().bold(),
            Some(JobOutcome::Failed) => "FAILED".red().bold(),
            Some(JobOutcome::TimedOut) => "TIMED OUT".yellow().bold(),
            None => "-".normal(),
        };
        writeln!(w, "  Tests:     {outcome}")?;

        match &self.report_path {
            Some(path) => writeln!(w, "  Report:    {path}")?,
            None => writeln!(w, "  Report:    {}", "not saved".dimmed())?,
        }
        Ok(())
    }
}
