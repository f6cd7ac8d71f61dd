//! Control-plane abstraction for testability.
//!
//! The [`ControlPlaneClient`] trait is the only way deployer components talk
//! to the cluster. Production code uses [`KubectlClient`], which shells out to
//! `kubectl` through a [`CommandRunner`]; tests use a scripted fake.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │ Orchestrator │
//! └──────┬───────┘
//!        │ applier / pollers / monitor / archiver
//!        ▼
//! ┌────────────────────┐
//! │ ControlPlaneClient │ (trait)
//! └────────────────────┘
//!        │         │
//!        ▼         ▼
//!   ┌─────────┐ ┌────────┐
//!   │ Kubectl │ │ Fake   │
//!   └────┬────┘ └────────┘
//!        ▼
//!   CommandRunner → kubectl process
//! ```

use std::future::Future;
use std::path::Path;

use tracing::debug;

use crate::command::{CommandRunner, CommandSpec, ProcessRunner, RunOptions};
use crate::error::DeployerError;

/// A single-scalar read against the control plane.
///
/// Targets either one named resource or, through `selector`, the list of
/// resources matching a label selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldQuery {
    pub kind: String,
    pub name: Option<String>,
    pub namespace: String,
    pub selector: Option<String>,
    pub json_path: String,
}

impl FieldQuery {
    /// Reads `json_path` from the named resource.
    pub fn named(kind: &str, name: &str, namespace: &str, json_path: &str) -> Self {
        Self {
            kind: kind.to_owned(),
            name: Some(name.to_owned()),
            namespace: namespace.to_owned(),
            selector: None,
            json_path: json_path.to_owned(),
        }
    }

    /// Reads `json_path` from the list of resources matching `selector`.
    pub fn selected(kind: &str, selector: &str, namespace: &str, json_path: &str) -> Self {
        Self {
            kind: kind.to_owned(),
            name: None,
            namespace: namespace.to_owned(),
            selector: Some(selector.to_owned()),
            json_path: json_path.to_owned(),
        }
    }
}

/// Operations the orchestrator needs from a cluster control plane.
///
/// Every method issues exactly one request and never retries.
pub trait ControlPlaneClient: Send + Sync + 'static {
    /// Verifies the client tooling is installed.
    fn client_version(&self) -> impl Future<Output = Result<String, DeployerError>> + Send;

    /// Verifies a cluster is reachable.
    fn cluster_info(&self) -> impl Future<Output = Result<String, DeployerError>> + Send;

    /// Applies a declarative manifest. Re-applying an unchanged manifest succeeds.
    fn apply(&self, manifest: &Path) -> impl Future<Output = Result<(), DeployerError>> + Send;

    /// Merge-patches an existing resource.
    fn patch(
        &self,
        kind: &str,
        name: &str,
        namespace: &str,
        merge_patch: &serde_json::Value,
    ) -> impl Future<Output = Result<(), DeployerError>> + Send;

    /// Sets the replica count of an existing deployment.
    fn scale(
        &self,
        workload: &str,
        namespace: &str,
        replicas: u32,
    ) -> impl Future<Output = Result<(), DeployerError>> + Send;

    /// Reads one JSONPath expression; returns trimmed output, possibly empty.
    fn get_field(
        &self,
        query: &FieldQuery,
    ) -> impl Future<Output = Result<String, DeployerError>> + Send;

    /// Fetches a pod's log, optionally only the last `tail` lines.
    fn get_logs(
        &self,
        pod: &str,
        namespace: &str,
        tail: Option<u32>,
    ) -> impl Future<Output = Result<String, DeployerError>> + Send;

    /// Deletes a namespace and everything in it.
    fn delete_namespace(
        &self,
        namespace: &str,
    ) -> impl Future<Output = Result<(), DeployerError>> + Send;
}

/// [`ControlPlaneClient`] backed by the `kubectl` CLI.
#[derive(Debug, Clone)]
pub struct KubectlClient<R: CommandRunner = ProcessRunner> {
    binary: String,
    runner: R,
}

impl KubectlClient<ProcessRunner> {
    /// Uses `binary` (name on `PATH` or absolute path) with real processes.
    pub fn new(binary: impl Into<String>) -> Self {
        Self::with_runner(binary, ProcessRunner)
    }
}

impl<R: CommandRunner> KubectlClient<R> {
    pub fn with_runner(binary: impl Into<String>, runner: R) -> Self {
        Self {
            binary: binary.into(),
            runner,
        }
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    fn command(&self) -> CommandSpec {
        CommandSpec::new(&self.binary)
    }

    async fn run_checked(&self, spec: CommandSpec) -> Result<String, DeployerError> {
        let result = self.runner.run(&spec, RunOptions::CHECKED).await?;
        Ok(result.stdout)
    }
}

impl<R: CommandRunner> ControlPlaneClient for KubectlClient<R> {
    async fn client_version(&self) -> Result<String, DeployerError> {
        let spec = self.command().args(["version", "--client"]);
        let out = self.run_checked(spec).await?;
        Ok(out.trim().to_owned())
    }

    async fn cluster_info(&self) -> Result<String, DeployerError> {
        let spec = self.command().arg("cluster-info");
        let out = self.run_checked(spec).await?;
        Ok(out.trim().to_owned())
    }

    async fn apply(&self, manifest: &Path) -> Result<(), DeployerError> {
        let spec = self
            .command()
            .args(["apply", "-f"])
            .arg(manifest.display().to_string());
        self.run_checked(spec).await?;
        Ok(())
    }

    async fn patch(
        &self,
        kind: &str,
        name: &str,
        namespace: &str,
        merge_patch: &serde_json::Value,
    ) -> Result<(), DeployerError> {
        let spec = self
            .command()
            .args(["patch", kind, name, "-n", namespace])
            .args(["--type", "merge", "-p"])
            .arg(merge_patch.to_string());
        self.run_checked(spec).await?;
        Ok(())
    }

    async fn scale(
        &self,
        workload: &str,
        namespace: &str,
        replicas: u32,
    ) -> Result<(), DeployerError> {
        let spec = self
            .command()
            .args(["scale", "deployment", workload, "-n", namespace])
            .arg(format!("--replicas={replicas}"));
        self.run_checked(spec).await?;
        Ok(())
    }

    async fn get_field(&self, query: &FieldQuery) -> Result<String, DeployerError> {
        let mut spec = self.command().args(["get", query.kind.as_str()]);
        if let Some(name) = &query.name {
            spec = spec.arg(name.as_str());
        }
        spec = spec.args(["-n", query.namespace.as_str()]);
        if let Some(selector) = &query.selector {
            spec = spec.args(["-l", selector.as_str()]);
        }
        spec = spec.args(["-o".to_owned(), format!("jsonpath={}", query.json_path)]);

        let out = self.run_checked(spec).await?;
        debug!(kind = %query.kind, path = %query.json_path, value = out.trim(), "field read");
        Ok(out.trim().to_owned())
    }

    async fn get_logs(
        &self,
        pod: &str,
        namespace: &str,
        tail: Option<u32>,
    ) -> Result<String, DeployerError> {
        let mut spec = self.command().args(["logs", pod, "-n", namespace]);
        if let Some(lines) = tail {
            spec = spec.arg(format!("--tail={lines}"));
        }
        self.run_checked(spec).await
    }

    async fn delete_namespace(&self, namespace: &str) -> Result<(), DeployerError> {
        let spec = self.command().args(["delete", "namespace", namespace]);
        self.run_checked(spec).await?;
        Ok(())
    }
}
