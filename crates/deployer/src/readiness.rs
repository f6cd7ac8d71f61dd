//! Replica readiness and service endpoint checks.
//!
//! Cluster bring-up is noisy: a failed or unparsable ready-replica query counts
//! as zero ready and polling continues. Only the deadline ends the wait.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use metrics::counter;
use tracing::{debug, error, info, warn};

use gridrun_core::clock::Clock;
use gridrun_core::metrics as m;
use gridrun_core::reporter::Reporter;
use gridrun_core::types::ReadinessState;

use crate::client::{ControlPlaneClient, FieldQuery};
use crate::error::DeployerError;
use crate::retry::{Attempt, poll_until};

const READY_REPLICAS_PATH: &str = "{.status.readyReplicas}";
const ENDPOINT_ADDRESSES_PATH: &str = "{.subsets[*].addresses[*].ip}";

/// Waits for workloads and services to become usable.
pub struct ReadinessPoller<C: ControlPlaneClient, K: Clock> {
    client: Arc<C>,
    clock: Arc<K>,
    reporter: Arc<dyn Reporter>,
}

impl<C: ControlPlaneClient, K: Clock> ReadinessPoller<C, K> {
    pub fn new(client: Arc<C>, clock: Arc<K>, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            client,
            clock,
            reporter,
        }
    }

    /// Polls the deployment's ready replicas until they equal `desired`.
    ///
    /// Returns `false` only when `deadline` elapses first.
    pub async fn wait_for_replica_readiness(
        &self,
        workload: &str,
        namespace: &str,
        desired: u32,
        deadline: Duration,
        interval: Duration,
    ) -> bool {
        let query = FieldQuery::named("deployment", workload, namespace, READY_REPLICAS_PATH);
        let last_ready = AtomicU32::new(0);

        let client = &*self.client;
        let reporter = &*self.reporter;
        let query = &query;
        let last = &last_ready;

        let check = move |attempt: u32| async move {
            counter!(m::READINESS_POLLS_TOTAL).increment(1);
            let ready = observe_ready(client, query).await;
            last.store(ready, Ordering::SeqCst);

            let state = ReadinessState { desired, ready };
            debug!(workload, attempt, %state, "readiness poll");
            if state.is_ready() {
                Attempt::Done(state)
            } else {
                reporter.info(&format!("Ready pods: {state}"));
                Attempt::Pending
            }
        };
        let outcome = poll_until(&*self.clock, interval, deadline, check).await;

        match outcome {
            Ok(state) => {
                info!(workload, namespace, %state, "replicas ready");
                self.reporter
                    .success(&format!("All {workload} replicas ready ({state})"));
                true
            }
            Err(exceeded) => {
                let err = DeployerError::ReadinessTimeout {
                    workload: workload.to_owned(),
                    desired,
                    last_ready: last_ready.load(Ordering::SeqCst),
                    timeout: deadline,
                };
                error!(error = %err, attempts = exceeded.attempts, "readiness wait expired");
                self.reporter.error(&err.to_string());
                false
            }
        }
    }

    /// Checks once that the service has at least one endpoint address.
    pub async fn wait_for_service_endpoints(&self, service: &str, namespace: &str) -> bool {
        let query = FieldQuery::named("endpoints", service, namespace, ENDPOINT_ADDRESSES_PATH);
        match self.client.get_field(&query).await {
            Ok(addresses) => {
                let count = addresses.split_whitespace().count();
                if count > 0 {
                    info!(service, namespace, count, "service endpoints registered");
                    self.reporter
                        .success(&format!("Service {service} ready ({count} endpoints)"));
                    true
                } else {
                    warn!(service, namespace, "service has no endpoints");
                    self.reporter
                        .error(&format!("No endpoints found for service {service}"));
                    false
                }
            }
            Err(e) => {
                warn!(service, namespace, error = %e, "endpoint query failed");
                self.reporter
                    .error(&format!("Could not verify service {service}"));
                false
            }
        }
    }
}

/// Ready-replica count; query and parse failures count as zero.
async fn observe_ready<C: ControlPlaneClient>(client: &C, query: &FieldQuery) -> u32 {
    match client.get_field(query).await {
        Ok(raw) if raw.is_empty() => 0,
        Ok(raw) => raw.parse().unwrap_or_else(|e| {
            warn!(value = %raw, error = %e, "unparsable ready replica count");
            0
        }),
        Err(e) => {
            warn!(error = %e, "ready replica query failed");
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use gridrun_core::clock::ManualClock;
    use gridrun_core::reporter::{RecordingReporter, ReportEvent};

    use super::*;
    use crate::mock::{Call, MockControlPlane};

    const ONE_SEC: Duration = Duration::from_secs(1);
    const SERVICE: &str = "chrome-node-service";

    fn poller(
        client: MockControlPlane,
    ) -> (
        ReadinessPoller<MockControlPlane, ManualClock>,
        Arc<MockControlPlane>,
        Arc<ManualClock>,
        Arc<RecordingReporter>,
    ) {
        let client = Arc::new(client);
        let clock = Arc::new(ManualClock::default());
        let reporter = Arc::new(RecordingReporter::new());
        let poller = ReadinessPoller::new(
            Arc::clone(&client),
            Arc::clone(&clock),
            reporter.clone() as Arc<dyn Reporter>,
        );
        (poller, client, clock, reporter)
    }

    fn readiness_polls(client: &MockControlPlane) -> usize {
        client.count(|c| matches!(c, Call::GetField(p) if p == READY_REPLICAS_PATH))
    }

    #[tokio::test]
    async fn ready_after_three_polls() {
        let script = MockControlPlane::new()
            .with_field(READY_REPLICAS_PATH, &[Some("0"), Some("1"), Some("2")]);
        let (poller, client, clock, _) = poller(script);

        let ready = poller
            .wait_for_replica_readiness("chrome-node", "qa", 2, Duration::from_secs(60), ONE_SEC)
            .await;

        assert!(ready);
        assert_eq!(readiness_polls(&client), 3);
        assert_eq!(clock.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test]
    async fn times_out_when_desired_never_reached() {
        let script = MockControlPlane::new()
            .with_field(READY_REPLICAS_PATH, &[Some("0"), Some("1"), Some("2")]);
        let (poller, _, _, reporter) = poller(script);

        let deadline = Duration::from_millis(3500);
        let ready = poller
            .wait_for_replica_readiness("chrome-node", "qa", 3, deadline, ONE_SEC)
            .await;

        assert!(!ready);
        let failures = reporter.failures();
        assert_eq!(failures.len(), 1);
        assert!(failures[0].contains("2/3"));
    }

    #[tokio::test]
    async fn query_errors_count_as_zero_and_polling_continues() {
        let answers = [None, Some(""), Some("abc"), Some("2")];
        let script = MockControlPlane::new().with_field(READY_REPLICAS_PATH, &answers);
        let (poller, client, _, reporter) = poller(script);

        let ready = poller
            .wait_for_replica_readiness("chrome-node", "qa", 2, Duration::from_secs(60), ONE_SEC)
            .await;

        assert!(ready);
        assert_eq!(readiness_polls(&client), 4);
        let progress: Vec<_> = reporter
            .events()
            .into_iter()
            .filter(|e| matches!(e, ReportEvent::Info(msg) if msg.contains("0/2")))
            .collect();
        assert_eq!(progress.len(), 3);
    }

    #[tokio::test]
    async fn endpoints_present() {
        let script = MockControlPlane::new()
            .with_field(ENDPOINT_ADDRESSES_PATH, &[Some("10.0.0.4 10.0.0.5")]);
        let (poller, _, _, reporter) = poller(script);

        assert!(poller.wait_for_service_endpoints(SERVICE, "qa").await);
        assert!(matches!(
            reporter.events().last(),
            Some(ReportEvent::Success(msg)) if msg.contains("2 endpoints")
        ));
    }

    #[tokio::test]
    async fn endpoints_missing_is_single_shot_failure() {
        let (poller, client, clock, _) = poller(MockControlPlane::new());

        assert!(!poller.wait_for_service_endpoints(SERVICE, "qa").await);
        assert_eq!(client.calls().len(), 1);
        assert_eq!(clock.sleep_count(), 0);
    }

    #[tokio::test]
    async fn endpoint_query_error_is_failure() {
        let script = MockControlPlane::new().with_field(ENDPOINT_ADDRESSES_PATH, &[None]);
        let (poller, _, _, _) = poller(script);

        assert!(!poller.wait_for_service_endpoints(SERVICE, "qa").await);
    }
}
