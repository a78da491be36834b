//! Workload driver: one scale mutation, no waiting

use tracing::info;

use crate::cluster::{ClusterClient, ObservableTarget};
use crate::error::ScaleError;

/// Set the desired replica count of `target`.
///
/// Returns as soon as the cluster accepts the mutation; convergence is the
/// poller's job. Setting the current value again is not an error.
pub async fn set_replicas(
    client: &dyn ClusterClient,
    target: &ObservableTarget,
    replicas: u32,
) -> Result<(), ScaleError> {
    info!(workload = %target, replicas, "scaling workload");

    client
        .set_replica_count(target, replicas)
        .await
        .map_err(|e| {
            if e.is_not_found() {
                ScaleError::TargetNotFound {
                    target: target.to_string(),
                }
            } else {
                ScaleError::Rejected {
                    target: target.to_string(),
                    replicas,
                    source: e,
                }
            }
        })
}
