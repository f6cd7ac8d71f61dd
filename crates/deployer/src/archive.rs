//! Persists the job-runner log as a timestamped report file.

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDateTime;
use tracing::{info, warn};

use gridrun_core::clock::Clock;
use gridrun_core::reporter::Reporter;
use gridrun_core::types::ReportArtifact;

use crate::client::ControlPlaneClient;
use crate::discovery::find_pod;
use crate::error::DeployerError;

const SUMMARY_MARKERS: [&str; 2] = ["passed in", "failed in"];

/// `test-results-YYYYMMDD-HHMMSS.log` for the given local time.
pub fn report_file_name(timestamp: NaiveDateTime) -> String {
    format!("test-results-{}.log", timestamp.format("%Y%m%d-%H%M%S"))
}

/// Lines reporting a pass/fail tally.
pub fn summary_lines(log: &str) -> Vec<String> {
    log.lines()
        .filter(|line| SUMMARY_MARKERS.iter().any(|m| line.contains(m)))
        .map(str::to_owned)
        .collect()
}

pub struct ReportArchiver<C: ControlPlaneClient, K: Clock> {
    client: Arc<C>,
    clock: Arc<K>,
    reporter: Arc<dyn Reporter>,
}

impl<C: ControlPlaneClient, K: Clock> ReportArchiver<C, K> {
    pub fn new(client: Arc<C>, clock: Arc<K>, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            client,
            clock,
            reporter,
        }
    }

    /// Writes the full job log under `output_dir`, creating it if needed.
    pub async fn archive(
        &self,
        selector: &str,
        namespace: &str,
        output_dir: &Path,
    ) -> Result<ReportArtifact, DeployerError> {
        let pod = find_pod(&*self.client, selector, namespace).await?;

        tokio::fs::create_dir_all(output_dir).await.map_err(|e| {
            DeployerError::Archive(format!("cannot create {}: {e}", output_dir.display()))
        })?;

        let content = self
            .client
            .get_logs(&pod, namespace, None)
            .await
            .map_err(|e| DeployerError::Archive(format!("cannot fetch log of {pod}: {e}")))?;

        let path = output_dir.join(report_file_name(self.clock.wall_time()));
        tokio::fs::write(&path, &content)
            .await
            .map_err(|e| DeployerError::Archive(format!("cannot write {}: {e}", path.display())))?;

        info!(path = %path.display(), bytes = content.len(), "report saved");
        self.reporter
            .success(&format!("Test report saved: {}", path.display()));

        let summary = summary_lines(&content);
        if summary.is_empty() {
            warn!(path = %path.display(), "no summary line in report");
            self.reporter.info("No test result summary found");
        }
        for line in &summary {
            self.reporter.output(line);
        }

        Ok(ReportArtifact {
            path,
            content,
            summary,
        })
    }
}
