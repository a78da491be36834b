//! Scenario files and kubeconfig resolution
//!
//! A scenario file is YAML:
//!
//! ```yaml
//! name: kubernetes-workload
//! namespaceField: TestNamespace
//! context:
//!   TestNamespace: kubernetes-workload-test-ns
//!   SutDeploymentName: sut-deployment
//! templates:
//!   - name: sutDeploymentTemplate
//!     body: |
//!       apiVersion: apps/v1
//!       ...
//! steps:
//!   - description: replica count should be 5 after a minute
//!     drive:
//!       target: { name: "{{MonitoredDeploymentName}}" }
//!       replicas: 5
//!     verify:
//!       target: { name: "{{SutDeploymentName}}" }
//!       expected: 5
//!       maxAttempts: 60
//!       intervalSeconds: 2
//! ```
//!
//! Target names and namespaces are rendered against the context. A target
//! without a namespace uses the scenario namespace.
//!
//! The kubeconfig resolution chain (highest priority first):
//! 1. Explicit `--kubeconfig` flag
//! 2. `SCALEPROOF_KUBECONFIG` environment variable
//! 3. Fall back to kube default (`KUBECONFIG` env / `~/.kube/config` / in-cluster)

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use scaleproof_common::template::{ResourceTemplate, ScenarioContext, TemplateEngine, TemplateSet};
use scaleproof_common::yaml::from_yaml_str;
use scaleproof_scenario::{ObservableTarget, PollExpectation, Step, WorkloadKind};

use crate::{Error, Result};

const SCALEPROOF_KUBECONFIG_ENV: &str = "SCALEPROOF_KUBECONFIG";

fn default_max_attempts() -> u32 {
    60
}

fn default_interval_seconds() -> u64 {
    2
}

/// Workload reference as written in a scenario file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetSpec {
    /// Workload name; may contain placeholders
    pub name: String,
    /// Namespace; defaults to the scenario namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    /// Workload kind
    #[serde(default)]
    pub kind: WorkloadKind,
}

/// Scale action as written in a scenario file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveSpec {
    pub target: TargetSpec,
    pub replicas: u32,
}

/// Convergence check as written in a scenario file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifySpec {
    pub target: TargetSpec,
    pub expected: u32,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_interval_seconds")]
    pub interval_seconds: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_timeout_seconds: Option<u64>,
}

/// One step as written in a scenario file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepSpec {
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drive: Option<DriveSpec>,
    pub verify: VerifySpec,
}

/// A complete scenario definition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioFile {
    pub name: String,
    /// Context field that names the scenario namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace_field: Option<String>,
    /// Substitution values; scalars are converted to strings
    #[serde(default)]
    pub context: BTreeMap<String, serde_json::Value>,
    pub templates: Vec<ResourceTemplate>,
    #[serde(default)]
    pub steps: Vec<StepSpec>,
}

/// A scenario ready to hand to the runner
#[derive(Debug, Clone)]
pub struct ScenarioPlan {
    pub name: String,
    pub context: ScenarioContext,
    pub templates: TemplateSet,
    pub steps: Vec<Step>,
}

impl ScenarioFile {
    /// Parse a scenario from YAML text
    pub fn from_yaml(input: &str) -> Result<Self> {
        from_yaml_str(input).map_err(|e| Error::invalid_scenario(e.to_string()))
    }

    /// Read and parse a scenario file
    pub fn load(path: &Path) -> Result<Self> {
        debug!(path = %path.display(), "loading scenario file");
        let data = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&data)
    }

    /// Current value of the namespace field, if one is designated
    pub fn namespace(&self) -> Option<String> {
        let field = self.namespace_field.as_ref()?;
        self.context.get(field).and_then(scalar_to_string)
    }

    /// Replace the namespace and/or append a run id to it.
    ///
    /// Concurrent runs of one scenario need distinct namespaces; the suffix
    /// provides that.
    pub fn customize_namespace(
        &mut self,
        namespace: Option<&str>,
        run_id: Option<&str>,
    ) -> Result<()> {
        if namespace.is_none() && run_id.is_none() {
            return Ok(());
        }
        let field = self.namespace_field.clone().ok_or_else(|| {
            Error::validation("scenario has no namespaceField; cannot set its namespace")
        })?;

        let base = match namespace {
            Some(ns) => ns.to_string(),
            None => self.namespace().ok_or_else(|| {
                Error::invalid_scenario(format!("namespace field '{}' has no value", field))
            })?,
        };
        let value = match run_id {
            Some(id) => format!("{}-{}", base, id),
            None => base,
        };
        self.context.insert(field, serde_json::Value::String(value));
        Ok(())
    }

    /// Build the context, template set, and concrete steps
    pub fn into_plan(self, engine: &TemplateEngine) -> Result<ScenarioPlan> {
        let mut builder = ScenarioContext::builder();
        for (key, value) in &self.context {
            let value = scalar_to_string(value).ok_or_else(|| {
                Error::invalid_scenario(format!("context field '{}' must be a scalar", key))
            })?;
            builder = builder.field(key, value);
        }
        if let Some(field) = &self.namespace_field {
            let value = self
                .context
                .get(field)
                .and_then(scalar_to_string)
                .ok_or_else(|| {
                    Error::invalid_scenario(format!(
                        "namespaceField '{}' is not defined in context",
                        field
                    ))
                })?;
            builder = builder.namespace(field, value);
        }
        let context = builder.build();

        let steps = self
            .steps
            .iter()
            .enumerate()
            .map(|(index, spec)| build_step(index, spec, &context, engine))
            .collect::<Result<Vec<_>>>()?;

        Ok(ScenarioPlan {
            name: self.name,
            context,
            templates: self.templates.into_iter().collect(),
            steps,
        })
    }
}

fn scalar_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn build_target(
    label: &str,
    spec: &TargetSpec,
    context: &ScenarioContext,
    engine: &TemplateEngine,
) -> Result<ObservableTarget> {
    let render = |value: &str| -> Result<String> {
        if TemplateEngine::has_template_syntax(value) {
            Ok(engine.render_str(label, value, context)?)
        } else {
            Ok(value.to_string())
        }
    };
    let name = render(&spec.name)?;
    let namespace = match &spec.namespace {
        Some(ns) => render(ns)?,
        None => context
            .namespace()
            .map(str::to_string)
            .ok_or_else(|| {
                Error::invalid_scenario(format!(
                    "{} has no namespace and the scenario designates none",
                    label
                ))
            })?,
    };
    Ok(ObservableTarget {
        name,
        namespace,
        kind: spec.kind,
    })
}

fn build_step(
    index: usize,
    spec: &StepSpec,
    context: &ScenarioContext,
    engine: &TemplateEngine,
) -> Result<Step> {
    let verify = &spec.verify;
    let target = build_target(
        &format!("steps[{}].verify.target", index),
        &verify.target,
        context,
        engine,
    )?;
    let mut expectation = PollExpectation::new(
        verify.expected,
        verify.max_attempts,
        Duration::from_secs(verify.interval_seconds),
    );
    if let Some(secs) = verify.read_timeout_seconds {
        expectation = expectation.with_read_timeout(Duration::from_secs(secs));
    }

    let mut step = Step::verify(&spec.description, target, expectation);
    if let Some(drive) = &spec.drive {
        let target = build_target(
            &format!("steps[{}].drive.target", index),
            &drive.target,
            context,
            engine,
        )?;
        step = step.with_drive(target, drive.replicas);
    }
    Ok(step)
}

/// Resolve the kubeconfig path using the resolution chain.
///
/// Returns `None` when kube's own inference should be used.
pub fn resolve_kubeconfig(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    match std::env::var(SCALEPROOF_KUBECONFIG_ENV) {
        Ok(path) if !path.is_empty() => Some(PathBuf::from(path)),
        _ => None,
    }
}
