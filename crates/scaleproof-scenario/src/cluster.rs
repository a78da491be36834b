//! Cluster capability consumed by the scenario engine
//!
//! The engine only needs five operations from a cluster. They sit behind the
//! [`ClusterClient`] trait so the orchestrator, lifecycle manager, driver, and
//! poller can be exercised against mocks; [`KubeClusterClient`] is the
//! kube-rs backed implementation used against real clusters.

use std::fmt;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use kube::api::{Api, DeleteParams, DynamicObject, Patch, PatchParams};
use kube::Client;
#[cfg(test)]
use mockall::automock;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use scaleproof_common::kube_utils::{parse_manifest, ManifestMetadata};
use scaleproof_common::template::RenderedResource;
use scaleproof_common::{Error, FIELD_MANAGER};

/// Kind of workload whose replica count is read or mutated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkloadKind {
    /// `apps/v1` Deployment
    #[default]
    Deployment,
    /// `apps/v1` StatefulSet
    StatefulSet,
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deployment => write!(f, "Deployment"),
            Self::StatefulSet => write!(f, "StatefulSet"),
        }
    }
}

/// A workload addressed by name within a namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObservableTarget {
    /// Workload name
    pub name: String,
    /// Namespace the workload lives in
    pub namespace: String,
    /// Workload kind
    pub kind: WorkloadKind,
}

impl ObservableTarget {
    /// Address a Deployment
    pub fn deployment(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            kind: WorkloadKind::Deployment,
        }
    }

    /// Address a StatefulSet
    pub fn stateful_set(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            kind: WorkloadKind::StatefulSet,
        }
    }
}

impl fmt::Display for ObservableTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}/{}", self.kind, self.namespace, self.name)
    }
}

/// Result of a delete request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The resource existed and deletion was accepted
    Deleted,
    /// The resource was already gone
    AlreadyAbsent,
}

/// Cluster operations the scenario engine depends on
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Create the resource, or update it if it already exists
    async fn create_or_update(&self, resource: &RenderedResource) -> Result<(), Error>;

    /// Request deletion of the resource
    async fn delete(&self, resource: &RenderedResource) -> Result<DeleteOutcome, Error>;

    /// Whether the resource is still present
    async fn exists(&self, resource: &RenderedResource) -> Result<bool, Error>;

    /// Current replica count from the workload's status
    async fn get_replica_count(&self, target: &ObservableTarget) -> Result<u32, Error>;

    /// Set desired replicas through the scale subresource
    async fn set_replica_count(&self, target: &ObservableTarget, replicas: u32)
        -> Result<(), Error>;
}

/// [`ClusterClient`] backed by a kube-rs [`Client`]
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    /// Wrap an existing kube client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn dynamic_api(&self, metadata: &ManifestMetadata) -> Api<DynamicObject> {
        match &metadata.namespace {
            Some(ns) => Api::namespaced_with(self.client.clone(), ns, &metadata.api_resource),
            None => Api::all_with(self.client.clone(), &metadata.api_resource),
        }
    }
}

fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404)
}

/// Keep the API status so callers can tell a rejection from an outage
fn apply_failed(metadata: &ManifestMetadata, err: kube::Error) -> Error {
    warn!(resource = %metadata.display_name(), error = %err, "apply failed");
    err.into()
}

fn not_found(target: &ObservableTarget) -> Error {
    Error::not_found(target.kind.to_string(), &target.name, &target.namespace)
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn create_or_update(&self, resource: &RenderedResource) -> Result<(), Error> {
        let metadata = parse_manifest(resource.manifest())?;
        let params = PatchParams::apply(FIELD_MANAGER).force();

        self.dynamic_api(&metadata)
            .patch(&metadata.name, &params, &Patch::Apply(&metadata.value))
            .await
            .map_err(|e| apply_failed(&metadata, e))?;

        debug!(resource = %metadata.display_name(), "applied");
        Ok(())
    }

    async fn delete(&self, resource: &RenderedResource) -> Result<DeleteOutcome, Error> {
        let metadata = parse_manifest(resource.manifest())?;

        match self
            .dynamic_api(&metadata)
            .delete(&metadata.name, &DeleteParams::background())
            .await
        {
            Ok(_) => {
                debug!(resource = %metadata.display_name(), "deletion requested");
                Ok(DeleteOutcome::Deleted)
            }
            Err(e) if is_not_found(&e) => {
                trace!(resource = %metadata.display_name(), "already absent");
                Ok(DeleteOutcome::AlreadyAbsent)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, resource: &RenderedResource) -> Result<bool, Error> {
        let metadata = parse_manifest(resource.manifest())?;
        let found = self.dynamic_api(&metadata).get_opt(&metadata.name).await?;
        Ok(found.is_some())
    }

    async fn get_replica_count(&self, target: &ObservableTarget) -> Result<u32, Error> {
        let replicas = match target.kind {
            WorkloadKind::Deployment => {
                let api: Api<Deployment> = Api::namespaced(self.client.clone(), &target.namespace);
                api.get_opt(&target.name)
                    .await?
                    .ok_or_else(|| not_found(target))?
                    .status
                    .and_then(|s| s.replicas)
                    .unwrap_or(0)
            }
            WorkloadKind::StatefulSet => {
                let api: Api<StatefulSet> =
                    Api::namespaced(self.client.clone(), &target.namespace);
                api.get_opt(&target.name)
                    .await?
                    .ok_or_else(|| not_found(target))?
                    .status
                    .map(|s| s.replicas)
                    .unwrap_or(0)
            }
        };

        // Status counts are never negative in practice; clamp rather than wrap
        Ok(u32::try_from(replicas).unwrap_or(0))
    }

    async fn set_replica_count(
        &self,
        target: &ObservableTarget,
        replicas: u32,
    ) -> Result<(), Error> {
        let patch = serde_json::json!({ "spec": { "replicas": replicas } });
        let params = PatchParams::default();

        let result = match target.kind {
            WorkloadKind::Deployment => {
                let api: Api<Deployment> = Api::namespaced(self.client.clone(), &target.namespace);
                api.patch_scale(&target.name, &params, &Patch::Merge(&patch))
                    .await
            }
            WorkloadKind::StatefulSet => {
                let api: Api<StatefulSet> =
                    Api::namespaced(self.client.clone(), &target.namespace);
                api.patch_scale(&target.name, &params, &Patch::Merge(&patch))
                    .await
            }
        };

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_not_found(&e) => Err(not_found(target)),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_display() {
        let target = ObservableTarget::deployment("sut-deployment", "workload-ns");
        assert_eq!(target.to_string(), "Deployment workload-ns/sut-deployment");

        let target = ObservableTarget::stateful_set("db", "workload-ns");
        assert_eq!(target.to_string(), "StatefulSet workload-ns/db");
    }

    fn api_error(code: u16, reason: &str) -> kube::Error {
        kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: "denied".to_string(),
            reason: reason.to_string(),
            code,
        })
    }

    #[test]
    fn test_apply_failure_keeps_api_status() {
        let metadata = parse_manifest(
            "apiVersion: keda.sh/v1alpha1\nkind: ScaledObject\nmetadata:\n  name: so\n  namespace: gone\n",
        )
        .unwrap();

        let rejected = apply_failed(&metadata, api_error(422, "Invalid"));
        assert!(!rejected.is_retryable());
        assert!(!rejected.is_not_found());

        let missing_ns = apply_failed(&metadata, api_error(404, "NotFound"));
        assert!(missing_ns.is_not_found());

        let outage = apply_failed(&metadata, api_error(503, "ServiceUnavailable"));
        assert!(outage.is_retryable());
    }

    #[test]
    fn test_workload_kind_defaults_to_deployment() {
        assert_eq!(WorkloadKind::default(), WorkloadKind::Deployment);
    }

    #[test]
    fn test_workload_kind_deserializes() {
        let kind: WorkloadKind = serde_json::from_str("\"StatefulSet\"").unwrap();
        assert_eq!(kind, WorkloadKind::StatefulSet);
    }

    #[test]
    fn test_is_not_found() {
        let err = kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: "deployments.apps \"x\" not found".to_string(),
            reason: "NotFound".to_string(),
            code: 404,
        });
        assert!(is_not_found(&err));

        let err = kube::Error::Api(kube::core::ErrorResponse {
            status: "Failure".to_string(),
            message: "forbidden".to_string(),
            reason: "Forbidden".to_string(),
            code: 403,
        });
        assert!(!is_not_found(&err));
    }
}
