//! Deployment pipeline -- preflight, ordered steps, and teardown.
//!
//! The [`Orchestrator`] drives a fixed sequence of [`Step`]s over a shared
//! [`RunContext`]. Each step either advances the [`PipelineState`] or moves
//! the run to `Failed`; nothing after a failed step executes.
//!
//! # Order
//!
//! 0. Preflight (client installed, cluster reachable) -- not a step
//! 1. Namespace
//! 2. ConfigMap (apply + node-count patch)
//! 3. Chrome Node Service
//! 4. Chrome Node Deployment (apply + scale)
//! 5. Chrome Node Readiness
//! 6. Service Verification
//! 7. Test Controller
//! 8. Test Execution (start-up delay + monitor)
//! 9. Save Reports (best-effort)
//!
//! Teardown is a separate entry point and shares nothing with the pipeline
//! except the client.

use std::fmt;
use std::sync::Arc;

use metrics::{counter, histogram};

use gridrun_core::clock::Clock;
use gridrun_core::config::DeploymentConfig;
use gridrun_core::metrics as m;
use gridrun_core::reporter::Reporter;
use gridrun_core::types::{JobOutcome, Manifest, ReportArtifact};

use crate::applier::ResourceApplier;
use crate::archive::ReportArchiver;
use crate::client::ControlPlaneClient;
use crate::error::DeployerError;
use crate::monitor::JobMonitor;
use crate::readiness::ReadinessPoller;

const BANNER_WIDTH: usize = 60;

/// Linear pipeline states. `Failed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Preflight,
    NamespaceReady,
    ConfigApplied,
    ServiceDeployed,
    WorkloadScaled,
    ReplicasReady,
    ServiceVerified,
    JobDeployed,
    JobMonitored,
    ReportSaved,
    Done,
    Failed,
}

/// One named pipeline step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Namespace,
    ConfigMap,
    ChromeNodeService,
    ChromeNodeDeployment,
    ChromeNodeReadiness,
    ServiceVerification,
    TestController,
    TestExecution,
    SaveReports,
}

impl Step {
    /// Execution order.
    pub const ALL: [Step; 9] = [
        Step::Namespace,
        Step::ConfigMap,
        Step::ChromeNodeService,
        Step::ChromeNodeDeployment,
        Step::ChromeNodeReadiness,
        Step::ServiceVerification,
        Step::TestController,
        Step::TestExecution,
        Step::SaveReports,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Namespace => "Namespace",
            Self::ConfigMap => "ConfigMap",
            Self::ChromeNodeService => "Chrome Node Service",
            Self::ChromeNodeDeployment => "Chrome Node Deployment",
            Self::ChromeNodeReadiness => "Chrome Node Readiness",
            Self::ServiceVerification => "Service Verification",
            Self::TestController => "Test Controller",
            Self::TestExecution => "Test Execution",
            Self::SaveReports => "Save Reports",
        }
    }

    /// State entered when this step succeeds.
    pub fn reached_state(&self) -> PipelineState {
        match self {
            Self::Namespace => PipelineState::NamespaceReady,
            Self::ConfigMap => PipelineState::ConfigApplied,
            Self::ChromeNodeService => PipelineState::ServiceDeployed,
            Self::ChromeNodeDeployment => PipelineState::WorkloadScaled,
            Self::ChromeNodeReadiness => PipelineState::ReplicasReady,
            Self::ServiceVerification => PipelineState::ServiceVerified,
            Self::TestController => PipelineState::JobDeployed,
            Self::TestExecution => PipelineState::JobMonitored,
            Self::SaveReports => PipelineState::ReportSaved,
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Why a run stopped early.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunFailure {
    /// Preflight check failed; no step ran.
    Prerequisite(String),
    /// The named step failed.
    Step(Step),
}

/// Mutable state shared by the steps of one run.
#[derive(Debug)]
pub struct RunContext {
    pub state: PipelineState,
    pub completed: Vec<Step>,
    pub outcome: Option<JobOutcome>,
    pub report: Option<ReportArtifact>,
}

impl RunContext {
    fn new() -> Self {
        Self {
            state: PipelineState::Preflight,
            completed: Vec::new(),
            outcome: None,
            report: None,
        }
    }
}

/// Final result of [`Orchestrator::run`].
#[derive(Debug)]
pub struct RunReport {
    pub state: PipelineState,
    pub completed: Vec<Step>,
    pub failure: Option<RunFailure>,
    pub outcome: Option<JobOutcome>,
    pub report: Option<ReportArtifact>,
}

impl RunReport {
    fn finish(ctx: RunContext, failure: Option<RunFailure>) -> Self {
        Self {
            state: ctx.state,
            completed: ctx.completed,
            failure,
            outcome: ctx.outcome,
            report: ctx.report,
        }
    }

    /// Every step ran to completion.
    pub fn pipeline_completed(&self) -> bool {
        self.state == PipelineState::Done
    }

    /// Pipeline completed and the job passed.
    pub fn succeeded(&self) -> bool {
        self.pipeline_completed() && self.outcome == Some(JobOutcome::Passed)
    }

    pub fn failed_step(&self) -> Option<Step> {
        match &self.failure {
            Some(RunFailure::Step(step)) => Some(*step),
            _ => None,
        }
    }
}

/// Drives preflight, the step sequence and teardown.
pub struct Orchestrator<C: ControlPlaneClient, K: Clock> {
    config: DeploymentConfig,
    client: Arc<C>,
    clock: Arc<K>,
    reporter: Arc<dyn Reporter>,
    applier: ResourceApplier<C>,
    readiness: ReadinessPoller<C, K>,
    monitor: JobMonitor<C, K>,
    archiver: ReportArchiver<C, K>,
}

impl<C: ControlPlaneClient, K: Clock> Orchestrator<C, K> {
    pub fn new(
        config: DeploymentConfig,
        client: Arc<C>,
        clock: Arc<K>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        let applier = ResourceApplier::new(Arc::clone(&client));
        let readiness = ReadinessPoller::new(
            Arc::clone(&client),
            Arc::clone(&clock),
            Arc::clone(&reporter),
        );
        let monitor = JobMonitor::new(
            Arc::clone(&client),
            Arc::clone(&clock),
            Arc::clone(&reporter),
            config.log_tail_lines(),
        );
        let archiver = ReportArchiver::new(
            Arc::clone(&client),
            Arc::clone(&clock),
            Arc::clone(&reporter),
        );

        Self {
            config,
            client,
            clock,
            reporter,
            applier,
            readiness,
            monitor,
            archiver,
        }
    }

    pub fn config(&self) -> &DeploymentConfig {
        &self.config
    }

    /// Runs preflight and then every step in order, stopping at the first
    /// failure.
    pub async fn run(&self) -> RunReport {
        let rule = "=".repeat(BANNER_WIDTH);
        self.reporter.banner(&rule);
        self.reporter.banner("Kubernetes Test Automation Deployment");
        self.reporter.banner(&rule);

        tracing::info!(
            namespace = self.config.namespace(),
            node_count = self.config.node_count(),
            manifests = %self.config.manifests_dir().display(),
            "deployment starting"
        );

        let mut ctx = RunContext::new();

        if let Err(e) = self.preflight().await {
            tracing::error!(error = %e, "preflight failed");
            self.reporter.error(&e.to_string());
            ctx.state = PipelineState::Failed;
            return RunReport::finish(ctx, Some(RunFailure::Prerequisite(e.to_string())));
        }

        for step in Step::ALL {
            self.reporter.step(step.name());
            let started = self.clock.now();

            let ok = self.execute(step, &mut ctx).await;

            let elapsed = self.clock.now().saturating_duration_since(started);
            histogram!(m::PIPELINE_STEP_DURATION_SECONDS, m::LABEL_STEP => step.name())
                .record(elapsed.as_secs_f64());
            let result = if ok { "success" } else { "failure" };
            counter!(
                m::PIPELINE_STEPS_TOTAL,
                m::LABEL_STEP => step.name(),
                m::LABEL_RESULT => result
            )
            .increment(1);

            if !ok {
                tracing::error!(step = step.name(), "pipeline step failed");
                self.reporter
                    .error(&format!("Deployment failed at step: {step}"));
                ctx.state = PipelineState::Failed;
                return RunReport::finish(ctx, Some(RunFailure::Step(step)));
            }

            tracing::info!(
                step = step.name(),
                elapsed_ms = elapsed.as_millis() as u64,
                "step complete"
            );
            ctx.state = step.reached_state();
            ctx.completed.push(step);
        }

        ctx.state = PipelineState::Done;
        self.reporter.banner(&rule);
        self.reporter.success("Deployment completed successfully!");
        self.reporter.banner(&rule);
        RunReport::finish(ctx, None)
    }

    /// Deletes the namespace. Issues exactly one request.
    pub async fn teardown(&self) -> bool {
        let namespace = self.config.namespace();
        self.reporter.step("Cleaning up resources");

        match self.client.delete_namespace(namespace).await {
            Ok(()) => {
                tracing::info!(namespace, "namespace deleted");
                self.reporter
                    .success(&format!("Namespace {namespace} deleted"));
                true
            }
            Err(e) => {
                tracing::error!(namespace, error = %e, "teardown failed");
                self.reporter.error(&format!("Cleanup failed: {e}"));
                false
            }
        }
    }

    async fn preflight(&self) -> Result<(), DeployerError> {
        let version = self.client.client_version().await.map_err(|e| {
            DeployerError::Prerequisite(format!("kubectl is not installed or not runnable: {e}"))
        })?;
        self.reporter.success(&format!("kubectl found: {version}"));

        self.client.cluster_info().await.map_err(|e| {
            DeployerError::Prerequisite(format!("cannot connect to the cluster: {e}"))
        })?;
        self.reporter.success("Cluster connection established");
        Ok(())
    }

    async fn execute(&self, step: Step, ctx: &mut RunContext) -> bool {
        let cfg = &self.config;
        let ns = cfg.namespace();

        match step {
            Step::Namespace => {
                self.apply_reported(Manifest::Namespace, &format!("Namespace {ns} ready"))
                    .await
            }
            Step::ConfigMap => {
                if !self
                    .apply_reported(Manifest::Config, "ConfigMap applied")
                    .await
                {
                    return false;
                }
                let patch = serde_json::json!({
                    "data": { cfg.config_key(): cfg.node_count().to_string() }
                });
                let patched = self
                    .applier
                    .patch_field("configmap", cfg.config_map(), ns, &patch)
                    .await;
                if patched {
                    let (key, count) = (cfg.config_key(), cfg.node_count());
                    self.reporter
                        .success(&format!("ConfigMap updated ({key} = {count})"));
                }
                patched
            }
            Step::ChromeNodeService => {
                self.apply_reported(Manifest::Service, "Chrome Node Service deployed")
                    .await
            }
            Step::ChromeNodeDeployment => {
                if !self
                    .apply_reported(Manifest::Workload, "Chrome Node Deployment applied")
                    .await
                {
                    return false;
                }
                let scaled = self
                    .applier
                    .scale_workload(cfg.workload(), ns, cfg.node_count())
                    .await;
                if scaled {
                    let replicas = cfg.node_count();
                    self.reporter
                        .success(&format!("{} scaled to {replicas} replicas", cfg.workload()));
                }
                scaled
            }
            Step::ChromeNodeReadiness => {
                self.readiness
                    .wait_for_replica_readiness(
                        cfg.workload(),
                        ns,
                        cfg.node_count(),
                        cfg.readiness_timeout(),
                        cfg.readiness_interval(),
                    )
                    .await
            }
            Step::ServiceVerification => {
                self.readiness
                    .wait_for_service_endpoints(cfg.service(), ns)
                    .await
            }
            Step::TestController => {
                self.apply_reported(Manifest::JobRunner, "Test Controller deployed")
                    .await
            }
            Step::TestExecution => {
                self.reporter.info("Waiting for the test pod to start");
                self.clock.sleep(cfg.job_startup_delay()).await;

                let outcome = self
                    .monitor
                    .monitor(
                        cfg.job_selector(),
                        ns,
                        cfg.job_timeout(),
                        cfg.job_poll_interval(),
                    )
                    .await;
                match outcome {
                    Ok(outcome) => {
                        ctx.outcome = Some(outcome);
                        true
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "job monitoring failed");
                        self.reporter.error(&e.to_string());
                        false
                    }
                }
            }
            Step::SaveReports => {
                match self
                    .archiver
                    .archive(cfg.job_selector(), ns, cfg.report_dir())
                    .await
                {
                    Ok(artifact) => ctx.report = Some(artifact),
                    Err(e) => {
                        tracing::warn!(error = %e, "report not saved");
                        self.reporter.warn(&e.to_string());
                    }
                }
                true
            }
        }
    }

    async fn apply_reported(&self, manifest: Manifest, success: &str) -> bool {
        let applied = self
            .applier
            .apply_manifest(&self.config.manifest_path(manifest))
            .await;
        if applied {
            self.reporter.success(success);
        } else {
            self.reporter
                .error(&format!("Failed to apply {}", manifest.file_name()));
        }
        applied
    }
}
