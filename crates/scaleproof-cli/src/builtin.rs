//! Built-in scenarios
//!
//! `kubernetes-workload` checks KEDA's `kubernetes-workload` trigger: a
//! ScaledObject scales `sut-deployment` to track the number of pods matching
//! `pod=workload-test`, which belong to `monitored-deployment`. Scaling the
//! monitored deployment must be mirrored by the SUT.

use std::collections::BTreeMap;

use clap::ValueEnum;
use serde_json::Value;

use scaleproof_common::template::ResourceTemplate;
use scaleproof_scenario::WorkloadKind;

use crate::config::{DriveSpec, ScenarioFile, StepSpec, TargetSpec, VerifySpec};

/// Scenarios shipped with the binary
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BuiltinScenario {
    /// KEDA kubernetes-workload scaler: SUT tracks monitored pod count
    KubernetesWorkload,
}

impl BuiltinScenario {
    /// Materialize the scenario definition
    pub fn scenario(self) -> ScenarioFile {
        match self {
            Self::KubernetesWorkload => kubernetes_workload(),
        }
    }
}

const TEST_NAME: &str = "kubernetes-workload-test";

const MONITORED_DEPLOYMENT_TEMPLATE: &str = r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: {{.MonitoredDeploymentName}}
  namespace: {{.TestNamespace}}
  labels:
    deploy: workload-test
spec:
  replicas: 0
  selector:
    matchLabels:
      pod: workload-test
  template:
    metadata:
      labels:
        pod: workload-test
    spec:
      containers:
        - name: nginx
          image: 'nginx'
"#;

const SUT_DEPLOYMENT_TEMPLATE: &str = r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: {{.SutDeploymentName}}
  namespace: {{.TestNamespace}}
  labels:
    deploy: workload-sut
spec:
  replicas: 0
  selector:
    matchLabels:
      pod: workload-sut
  template:
    metadata:
      labels:
        pod: workload-sut
    spec:
      containers:
        - name: nginx
          image: 'nginx'
"#;

const SCALED_OBJECT_TEMPLATE: &str = r#"apiVersion: keda.sh/v1alpha1
kind: ScaledObject
metadata:
  name: {{.ScaledObjectName}}
  namespace: {{.TestNamespace}}
spec:
  scaleTargetRef:
    name: {{.SutDeploymentName}}
  pollingInterval: 5
  cooldownPeriod: 5
  minReplicaCount: 0
  maxReplicaCount: 10
  advanced:
    horizontalPodAutoscalerConfig:
      behavior:
        scaleDown:
          stabilizationWindowSeconds: 5
  triggers:
    - type: kubernetes-workload
      metadata:
        podSelector: 'pod=workload-test'
        value: '1'
"#;

fn target(name_field: &str) -> TargetSpec {
    TargetSpec {
        name: format!("{{{{{}}}}}", name_field),
        namespace: None,
        kind: WorkloadKind::Deployment,
    }
}

fn baseline(label: &str, name_field: &str) -> StepSpec {
    StepSpec {
        description: format!("{} replica count should be 0 after a minute", label),
        drive: None,
        verify: VerifySpec {
            target: target(name_field),
            expected: 0,
            max_attempts: 60,
            interval_seconds: 1,
            read_timeout_seconds: None,
        },
    }
}

fn mirror(replicas: u32) -> StepSpec {
    StepSpec {
        description: format!("replica count should be {} after a minute", replicas),
        drive: Some(DriveSpec {
            target: target("MonitoredDeploymentName"),
            replicas,
        }),
        verify: VerifySpec {
            target: target("SutDeploymentName"),
            expected: replicas,
            max_attempts: 60,
            interval_seconds: 2,
            read_timeout_seconds: None,
        },
    }
}

/// The kubernetes-workload scenario: baseline at zero, up to 5 and 10, back
/// down to 5 and 0.
pub fn kubernetes_workload() -> ScenarioFile {
    let context: BTreeMap<String, Value> = [
        ("TestNamespace", format!("{}-ns", TEST_NAME)),
        ("MonitoredDeploymentName", "monitored-deployment".to_string()),
        ("SutDeploymentName", "sut-deployment".to_string()),
        ("ScaledObjectName", format!("{}-so", TEST_NAME)),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), Value::String(v)))
    .collect();

    ScenarioFile {
        name: "kubernetes-workload".to_string(),
        namespace_field: Some("TestNamespace".to_string()),
        context,
        templates: vec![
            ResourceTemplate::new("monitoredDeploymentTemplate", MONITORED_DEPLOYMENT_TEMPLATE),
            ResourceTemplate::new("sutDeploymentTemplate", SUT_DEPLOYMENT_TEMPLATE),
            ResourceTemplate::new("scaledObjectTemplate", SCALED_OBJECT_TEMPLATE),
        ],
        steps: vec![
            baseline("monitored", "MonitoredDeploymentName"),
            baseline("sut", "SutDeploymentName"),
            mirror(5),
            mirror(10),
            mirror(5),
            mirror(0),
        ],
    }
}
