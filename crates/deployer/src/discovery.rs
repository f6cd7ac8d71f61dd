//! Pod lookup by label selector.

use tracing::{debug, warn};

use crate::client::{ControlPlaneClient, FieldQuery};
use crate::error::DeployerError;

const POD_NAME_PATH: &str = "{.items[0].metadata.name}";

/// Resolves the first pod matching `selector`. Single shot, no retry.
pub async fn find_pod<C: ControlPlaneClient>(
    client: &C,
    selector: &str,
    namespace: &str,
) -> Result<String, DeployerError> {
    let query = FieldQuery::selected("pods", selector, namespace, POD_NAME_PATH);
    let name = match client.get_field(&query).await {
        Ok(name) => name,
        Err(e) => {
            warn!(selector, namespace, error = %e, "pod lookup failed");
            String::new()
        }
    };

    if name.is_empty() {
        return Err(DeployerError::Discovery {
            selector: selector.to_owned(),
            namespace: namespace.to_owned(),
        });
    }

    debug!(selector, pod = %name, "pod resolved");
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockControlPlane;

    #[tokio::test]
    async fn resolves_pod_name() {
        let client = MockControlPlane::new().with_field(POD_NAME_PATH, &[Some("runner-7f9c")]);
        let pod = find_pod(&client, "component=test-controller", "qa")
            .await
            .unwrap();
        assert_eq!(pod, "runner-7f9c");
    }

    #[tokio::test]
    async fn empty_answer_is_discovery_error() {
        let client = MockControlPlane::new();
        let err = find_pod(&client, "component=test-controller", "qa")
            .await
            .unwrap_err();
        assert!(matches!(err, DeployerError::Discovery { .. }));
    }

    #[tokio::test]
    async fn query_failure_is_discovery_error() {
        let client = MockControlPlane::new().with_field(POD_NAME_PATH, &[None]);
        let err = find_pod(&client, "component=test-controller", "qa")
            .await
            .unwrap_err();
        assert!(matches!(err, DeployerError::Discovery { .. }));
    }
}
