//! `gridrun --cleanup`: delete the run namespace and exit.

use std::io::Write;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use gridrun_core::clock::SystemClock;
use gridrun_core::config::{DeployOverrides, DeploymentConfig, GridrunConfig};
use gridrun_core::reporter::Reporter;
use gridrun_deployer::{KubectlClient, Orchestrator};

use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the teardown.
pub async fn execute(
    config: &GridrunConfig,
    overrides: &DeployOverrides,
    writer: &OutputWriter,
    reporter: Arc<dyn Reporter>,
) -> Result<(), CliError> {
    let deployment = DeploymentConfig::from_config(config, overrides)?;
    info!(namespace = deployment.namespace(), "tearing down");

    let client = Arc::new(KubectlClient::new(config.cluster.kubectl.clone()));
    let orchestrator = Orchestrator::new(deployment, client, Arc::new(SystemClock), reporter);

    let deleted = orchestrator.teardown().await;
    let report = TeardownReport {
        namespace: orchestrator.config().namespace().to_owned(),
        deleted,
    };
    writer.render(&report)?;

    if !deleted {
        return Err(CliError::Command(format!("failed to delete namespace {}", report.namespace)));
    }
    Ok(())
}

/// Teardown result.
#[derive(Debug, Serialize)]
pub struct TeardownReport {
    pub namespace: String,
    pub deleted: bool,
}

impl Render for TeardownReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let result = if self.deleted {
            "DELETED".green().bold()
        } else {
            "FAILED".red().bold()
        };
        writeln!(w, "Cleanup {}: {}", self.namespace.bold(), result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_teardown_report_render() {
        let report = TeardownReport {
            namespace: "qa".to_owned(),
            deleted: false,
        };
        let mut buffer = Vec::new();
        report.render_text(&mut buffer).expect("renders");
        let output = String::from_utf8(buffer).expect("valid UTF-8");
        assert!(output.contains("qa"));
        assert!(output.contains("FAILED"));
    }

    #[test]
    fn test_teardown_report_json() {
        let report = TeardownReport {
            namespace: "qa".to_owned(),
            deleted: true,
        };
        let json = serde_json::to_value(&report).expect("serializes");
        assert_eq!(json["deleted"], true);
    }
}
