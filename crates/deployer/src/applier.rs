//! Declarative resource mutation.
//!
//! Every call issues one control-plane request and collapses the outcome into
//! a `bool`. The failure detail goes to the log only; the orchestrator just
//! decides whether to short-circuit.

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info};

use crate::client::ControlPlaneClient;
use crate::error::DeployerError;

/// Applies manifests and patches or scales existing resources.
pub struct ResourceApplier<C: ControlPlaneClient> {
    client: Arc<C>,
}

impl<C: ControlPlaneClient> ResourceApplier<C> {
    pub fn new(client: Arc<C>) -> Self {
        Self { client }
    }

    /// Applies a manifest file. Re-applying an existing resource succeeds.
    pub async fn apply_manifest(&self, manifest: &Path) -> bool {
        match self.client.apply(manifest).await {
            Ok(()) => {
                info!(manifest = %manifest.display(), "manifest applied");
                true
            }
            Err(e) => {
                log_failure("apply", manifest.display().to_string(), e);
                false
            }
        }
    }

    /// Merge-patches an existing resource.
    pub async fn patch_field(
        &self,
        kind: &str,
        name: &str,
        namespace: &str,
        merge_patch: &serde_json::Value,
    ) -> bool {
        match self.client.patch(kind, name, namespace, merge_patch).await {
            Ok(()) => {
                info!(kind, name, namespace, patch = %merge_patch, "resource patched");
                true
            }
            Err(e) => {
                log_failure("patch", format!("{kind}/{name}"), e);
                false
            }
        }
    }

    /// Sets the replica count of an existing deployment.
    pub async fn scale_workload(&self, workload: &str, namespace: &str, replicas: u32) -> bool {
        match self.client.scale(workload, namespace, replicas).await {
            Ok(()) => {
                info!(workload, namespace, replicas, "workload scaled");
                true
            }
            Err(e) => {
                log_failure("scale", format!("deployment/{workload}"), e);
                false
            }
        }
    }
}

fn log_failure(action: &'static str, target: String, source: DeployerError) {
    let err = DeployerError::Apply {
        action,
        target,
        reason: source.to_string(),
    };
    error!(error = %err, "resource mutation failed");
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::mock::{Call, MockControlPlane};

    #[tokio::test]
    async fn apply_reports_success_and_is_repeatable() {
        let client = Arc::new(MockControlPlane::new());
        let applier = ResourceApplier::new(Arc::clone(&client));
        let path = PathBuf::from("k8s/manifests/01-namespace.yaml");

        assert!(applier.apply_manifest(&path).await);
        assert!(applier.apply_manifest(&path).await);
        let applied = client.applied();
        assert_eq!(applied, ["01-namespace.yaml", "01-namespace.yaml"]);
    }

    #[tokio::test]
    async fn apply_failure_is_false() {
        let client = Arc::new(MockControlPlane::new().with_failing_apply("02-configmap.yaml"));
        let applier = ResourceApplier::new(Arc::clone(&client));
        let (failing, healthy) = (Path::new("m/02-configmap.yaml"), Path::new("m/ns.yaml"));

        assert!(!applier.apply_manifest(failing).await);
        assert!(applier.apply_manifest(healthy).await);
    }

    #[tokio::test]
    async fn patch_forwards_merge_body() {
        let client = Arc::new(MockControlPlane::new());
        let applier = ResourceApplier::new(Arc::clone(&client));
        let body = serde_json::json!({"data": {"node_count": "2"}});

        let patched = applier
            .patch_field("configmap", "test-automation-config", "qa", &body)
            .await;
        assert!(patched);
        assert_eq!(
            client.calls(),
            vec![Call::Patch {
                kind: "configmap".to_owned(),
                name: "test-automation-config".to_owned(),
                body: r#"{"data":{"node_count":"2"}}"#.to_owned(),
            }]
        );
    }

    #[tokio::test]
    async fn patch_and_scale_failures_are_false() {
        let script = MockControlPlane::new()
            .with_failing_patch()
            .with_failing_scale();
        let applier = ResourceApplier::new(Arc::new(script));

        let body = serde_json::json!({});
        assert!(!applier.patch_field("configmap", "cm", "qa", &body).await);
        assert!(!applier.scale_workload("chrome-node", "qa", 3).await);
    }

    #[tokio::test]
    async fn scale_records_replicas() {
        let client = Arc::new(MockControlPlane::new());
        let applier = ResourceApplier::new(Arc::clone(&client));

        assert!(applier.scale_workload("chrome-node", "qa", 3).await);
        assert_eq!(
            client.calls(),
            vec![Call::Scale {
                workload: "chrome-node".to_owned(),
                replicas: 3,
            }]
        );
    }
}
