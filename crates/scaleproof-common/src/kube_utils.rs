//! Shared Kubernetes utilities using kube-rs
//!
//! Client construction, manifest parsing, and dynamic resource resolution.
//! Manifests are applied through the dynamic API, so any kind the cluster
//! serves (including KEDA's ScaledObject) can be templated.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use k8s_openapi::api::core::v1::Namespace;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::core::ObjectMeta;
use kube::discovery::ApiResource;
use kube::{Client, Config};
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::debug;

use crate::{Error, LABEL_MANAGED_BY, LABEL_MANAGED_BY_SCALEPROOF};

/// Default connection timeout for kube clients
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for kube clients
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Create a kube client from optional kubeconfig path with default timeouts
pub async fn create_client(kubeconfig: Option<&Path>) -> Result<Client, Error> {
    create_client_with_timeout(kubeconfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT).await
}

/// Create a kube client from optional kubeconfig path with custom timeouts.
///
/// Without a path the config is inferred (`KUBECONFIG`, `~/.kube/config`,
/// then in-cluster).
pub async fn create_client_with_timeout(
    kubeconfig: Option<&Path>,
    connect_timeout: Duration,
    read_timeout: Duration,
) -> Result<Client, Error> {
    let mut config = match kubeconfig {
        Some(path) => {
            debug!(path = %path.display(), "loading kubeconfig");
            // A missing or malformed file will not fix itself; fail without retries
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
                Error::validation(format!("failed to read kubeconfig {}: {}", path.display(), e))
            })?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| {
                    Error::internal_with_context(
                        "create_client",
                        format!("failed to load kubeconfig: {}", e),
                    )
                })?
        }
        None => Config::infer().await.map_err(|e| {
            Error::internal_with_context("create_client", format!("failed to infer config: {}", e))
        })?,
    };

    config.connect_timeout = Some(connect_timeout);
    config.read_timeout = Some(read_timeout);
    Client::try_from(config).map_err(|e| {
        Error::internal_with_context("create_client", format!("failed to create client: {}", e))
    })
}

/// Parsed manifest metadata for applying to Kubernetes
#[derive(Debug, Clone)]
pub struct ManifestMetadata {
    /// The parsed JSON value
    pub value: serde_json::Value,
    /// Resource kind
    pub kind: String,
    /// Resource name
    pub name: String,
    /// Optional namespace
    pub namespace: Option<String>,
    /// API resource definition
    pub api_resource: ApiResource,
}

impl ManifestMetadata {
    /// `Kind/name` or `Kind/namespace/name`, for logs and errors
    pub fn display_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{}/{}/{}", self.kind, ns, self.name),
            None => format!("{}/{}", self.kind, self.name),
        }
    }
}

/// Parse a YAML or JSON manifest and extract its metadata
pub fn parse_manifest(manifest: &str) -> Result<ManifestMetadata, Error> {
    let value: serde_json::Value = if manifest.trim_start().starts_with('{') {
        serde_json::from_str(manifest)
            .map_err(|e| Error::serialization(format!("manifest is not valid JSON: {}", e)))?
    } else {
        crate::yaml::parse_yaml(manifest)
            .map_err(|e| Error::serialization(format!("manifest is not valid YAML: {}", e)))?
    };

    let api_version = value
        .get("apiVersion")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::validation_for_field("apiVersion", "manifest missing apiVersion"))?
        .to_string();

    let kind = value
        .get("kind")
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::validation_for_field("kind", "manifest missing kind"))?
        .to_string();

    let name = value
        .pointer("/metadata/name")
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            Error::validation_for_field("metadata.name", format!("{} manifest missing name", kind))
        })?
        .to_string();

    let namespace = value
        .pointer("/metadata/namespace")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    let api_resource = build_api_resource(&api_version, &kind);

    Ok(ManifestMetadata {
        value,
        kind,
        name,
        namespace,
        api_resource,
    })
}

/// Parse apiVersion into (group, version)
///
/// # Examples
/// ```
/// use scaleproof_common::kube_utils::parse_api_version;
///
/// assert_eq!(parse_api_version("keda.sh/v1alpha1"), ("keda.sh".to_string(), "v1alpha1".to_string()));
/// assert_eq!(parse_api_version("v1"), (String::new(), "v1".to_string()));
/// ```
pub fn parse_api_version(api_version: &str) -> (String, String) {
    match api_version.split_once('/') {
        Some((group, version)) => (group.to_string(), version.to_string()),
        None => (String::new(), api_version.to_string()),
    }
}

/// Build an `ApiResource` from apiVersion and kind without discovery
pub fn build_api_resource(api_version: &str, kind: &str) -> ApiResource {
    let (group, version) = parse_api_version(api_version);
    ApiResource {
        group,
        version,
        kind: kind.to_string(),
        api_version: api_version.to_string(),
        plural: pluralize_kind(kind),
    }
}

/// Pluralizations the suffix rules get wrong or that are worth pinning
const KIND_PLURALS: &[(&str, &str)] = &[
    // KEDA
    ("scaledobject", "scaledobjects"),
    ("scaledjob", "scaledjobs"),
    ("triggerauthentication", "triggerauthentications"),
    (
        "clustertriggerauthentication",
        "clustertriggerauthentications",
    ),
    // Core and apps
    ("endpoints", "endpoints"),
    ("ingress", "ingresses"),
    ("networkpolicy", "networkpolicies"),
    ("horizontalpodautoscaler", "horizontalpodautoscalers"),
];

/// Pluralize a Kubernetes resource kind
///
/// Uses a lookup table for known types, falling back to simple English
/// pluralization rules.
pub fn pluralize_kind(kind: &str) -> String {
    let lower = kind.to_lowercase();

    if let Some((_, plural)) = KIND_PLURALS.iter().find(|(singular, _)| *singular == lower) {
        return (*plural).to_string();
    }

    if lower.ends_with('s') || lower.ends_with("ch") || lower.ends_with("sh") {
        format!("{}es", lower)
    } else if lower.ends_with('y') && !lower.ends_with("ay") && !lower.ends_with("ey") {
        format!("{}ies", &lower[..lower.len() - 1])
    } else {
        format!("{}s", lower)
    }
}

/// Build a Namespace object labelled as managed by scaleproof
pub fn build_namespace(name: &str, extra_labels: &BTreeMap<String, String>) -> Namespace {
    let mut labels = extra_labels.clone();
    labels.insert(
        LABEL_MANAGED_BY.to_string(),
        LABEL_MANAGED_BY_SCALEPROOF.to_string(),
    );
    Namespace {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            labels: Some(labels),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Generate a short lowercase run identifier, safe for DNS-1123 names
pub fn generate_run_id() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| (b as char).to_ascii_lowercase())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Deployment", "deployments")]
    #[case("StatefulSet", "statefulsets")]
    #[case("ScaledObject", "scaledobjects")]
    #[case("Namespace", "namespaces")]
    #[case("NetworkPolicy", "networkpolicies")]
    #[case("Ingress", "ingresses")]
    #[case("Gateway", "gateways")]
    fn test_pluralize_kind(#[case] kind: &str, #[case] plural: &str) {
        assert_eq!(pluralize_kind(kind), plural);
    }

    #[test]
    fn test_parse_yaml_manifest() {
        let manifest = r#"
apiVersion: keda.sh/v1alpha1
kind: ScaledObject
metadata:
  name: workload-test-so
  namespace: workload-ns
spec:
  maxReplicaCount: 10
"#;
        let meta = parse_manifest(manifest).unwrap();
        assert_eq!(meta.kind, "ScaledObject");
        assert_eq!(meta.name, "workload-test-so");
        assert_eq!(meta.namespace.as_deref(), Some("workload-ns"));
        assert_eq!(meta.api_resource.group, "keda.sh");
        assert_eq!(meta.api_resource.version, "v1alpha1");
        assert_eq!(meta.api_resource.plural, "scaledobjects");
        assert_eq!(meta.display_name(), "ScaledObject/workload-ns/workload-test-so");
    }

    #[test]
    fn test_parse_json_manifest() {
        let manifest = r#"{"apiVersion":"v1","kind":"Namespace","metadata":{"name":"ns"}}"#;
        let meta = parse_manifest(manifest).unwrap();
        assert_eq!(meta.api_resource.group, "");
        assert_eq!(meta.namespace, None);
        assert_eq!(meta.display_name(), "Namespace/ns");
    }

    #[test]
    fn test_parse_manifest_missing_fields() {
        let err = parse_manifest("kind: Deployment\nmetadata:\n  name: x\n").unwrap_err();
        assert!(err.to_string().contains("apiVersion"));

        let err = parse_manifest("apiVersion: v1\nkind: ConfigMap\n").unwrap_err();
        assert!(err.to_string().contains("name"));
    }

    #[test]
    fn test_parse_manifest_invalid_yaml() {
        let err = parse_manifest("apiVersion: [unclosed").unwrap_err();
        assert!(matches!(err, Error::Serialization { .. }));
    }

    #[test]
    fn test_build_namespace_is_labelled() {
        let ns = build_namespace("workload-ns", &BTreeMap::new());
        assert_eq!(ns.metadata.name.as_deref(), Some("workload-ns"));
        let labels = ns.metadata.labels.unwrap();
        assert_eq!(
            labels.get(LABEL_MANAGED_BY).map(String::as_str),
            Some(LABEL_MANAGED_BY_SCALEPROOF)
        );
    }

    #[test]
    fn test_generate_run_id() {
        let id = generate_run_id();
        assert_eq!(id.len(), 6);
        assert!(id
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        assert_ne!(generate_run_id(), generate_run_id());
    }
}
