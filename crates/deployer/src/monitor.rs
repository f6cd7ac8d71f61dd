//! Job completion monitoring.
//!
//! Polls a bounded tail of the job-runner log for a completion marker. Once a
//! marker shows up (or the deadline passes) the full log is fetched once,
//! passed to the reporter verbatim, and classified.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tracing::{debug, info, warn};

use gridrun_core::clock::Clock;
use gridrun_core::metrics as m;
use gridrun_core::reporter::Reporter;
use gridrun_core::types::JobOutcome;

use crate::client::ControlPlaneClient;
use crate::discovery::find_pod;
use crate::error::DeployerError;
use crate::retry::{Attempt, poll_until};

/// Substrings signalling that the job has finished.
pub const COMPLETION_MARKERS: [&str; 3] = ["Tests completed", "passed in", "failed in"];

const PASS_MARKER: &str = "passed in";
const FAIL_MARKER: &str = "failed";

/// True when `log` contains any completion marker.
pub fn has_completion_marker(log: &str) -> bool {
    COMPLETION_MARKERS.iter().any(|marker| log.contains(marker))
}

/// Passed iff the log reports a passing run and mentions no failure at all.
pub fn classify(log: &str) -> JobOutcome {
    if log.contains(PASS_MARKER) && !log.contains(FAIL_MARKER) {
        JobOutcome::Passed
    } else {
        JobOutcome::Failed
    }
}

/// Watches the job-runner pod until it reports completion.
pub struct JobMonitor<C: ControlPlaneClient, K: Clock> {
    client: Arc<C>,
    clock: Arc<K>,
    reporter: Arc<dyn Reporter>,
    tail_lines: u32,
}

impl<C: ControlPlaneClient, K: Clock> JobMonitor<C, K> {
    pub fn new(
        client: Arc<C>,
        clock: Arc<K>,
        reporter: Arc<dyn Reporter>,
        tail_lines: u32,
    ) -> Self {
        Self {
            client,
            clock,
            reporter,
            tail_lines,
        }
    }

    /// Resolves the job pod and waits for its outcome.
    ///
    /// Fails only when no pod matches `selector`; a missing marker yields
    /// [`JobOutcome::TimedOut`].
    pub async fn monitor(
        &self,
        selector: &str,
        namespace: &str,
        deadline: Duration,
        poll_interval: Duration,
    ) -> Result<JobOutcome, DeployerError> {
        let pod = find_pod(&*self.client, selector, namespace).await?;
        info!(pod = %pod, namespace, "monitoring job pod");
        self.reporter.info("Tests running, watching logs...");

        let client = &*self.client;
        let pod_ref = pod.as_str();
        let tail = Some(self.tail_lines);

        let check = move |attempt: u32| async move {
            counter!(m::JOB_LOG_POLLS_TOTAL).increment(1);
            match client.get_logs(pod_ref, namespace, tail).await {
                Ok(log) if has_completion_marker(&log) => {
                    debug!(attempt, "completion marker found");
                    Attempt::Done(log)
                }
                Ok(_) => Attempt::Pending,
                Err(e) => {
                    warn!(attempt, error = %e, "log tail fetch failed");
                    Attempt::Pending
                }
            }
        };
        let completed = poll_until(&*self.clock, poll_interval, deadline, check).await;

        let full_log = self.fetch_full_log(&pod, namespace).await;

        let outcome = match completed {
            Ok(tail) => {
                // the matching tail stands in when the full log is unavailable
                let log = full_log.unwrap_or(tail);
                self.reporter.output(&log);
                classify(&log)
            }
            Err(exceeded) => {
                let err = DeployerError::JobTimeout { timeout: deadline };
                warn!(error = %err, attempts = exceeded.attempts, "job monitoring expired");
                let secs = deadline.as_secs();
                self.reporter.warn(&format!("Test timeout ({secs}s)"));
                if let Some(log) = &full_log {
                    self.reporter.output(log);
                }
                JobOutcome::TimedOut
            }
        };

        counter!(m::JOB_OUTCOMES_TOTAL, m::LABEL_OUTCOME => outcome.as_str()).increment(1);
        match outcome {
            JobOutcome::Passed => self.reporter.success("Tests completed successfully"),
            JobOutcome::Failed => self.reporter.warn("Tests failed or did not complete"),
            JobOutcome::TimedOut => {}
        }
        info!(pod = %pod, %outcome, "job finished");
        Ok(outcome)
    }

    /// `None` when the log cannot be fetched or is empty.
    async fn fetch_full_log(&self, pod: &str, namespace: &str) -> Option<String> {
        match self.client.get_logs(pod, namespace, None).await {
            Ok(log) if !log.is_empty() => Some(log),
            Ok(_) => None,
            Err(e) => {
                warn!(pod, error = %e, "full log fetch failed");
                None
            }
        }
    }
}
