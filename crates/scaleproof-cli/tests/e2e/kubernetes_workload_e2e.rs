//! E2E test: KEDA kubernetes-workload scaler
//!
//! Deploys a monitored deployment, a SUT deployment, and a ScaledObject whose
//! `kubernetes-workload` trigger counts the monitored pods. Scaling the
//! monitored deployment to 5, 10, 5, 0 must be mirrored by the SUT.
//!
//! ```bash
//! cargo test -p scaleproof-cli --features cluster-e2e --test e2e test_kubernetes_workload_e2e -- --nocapture
//! ```

#![cfg(feature = "cluster-e2e")]

use std::time::Duration;

use tracing::info;

use scaleproof_cli::builtin::BuiltinScenario;
use scaleproof_cli::commands::connect;
use scaleproof_common::kube_utils::generate_run_id;
use scaleproof_common::template::TemplateEngine;
use scaleproof_scenario::{RemovalWait, ScenarioRunner, StepStatus};

use super::context::{init_e2e_test, E2eContext};

/// Baseline (2 x 60s) plus four mirrored steps (4 x 120s) plus teardown
const E2E_TIMEOUT: Duration = Duration::from_secs(900);

#[tokio::test]
async fn test_kubernetes_workload_e2e() {
    init_e2e_test();
    info!("Starting E2E test: kubernetes-workload");

    if let Err(e) = run(E2eContext::from_env()).await {
        panic!("kubernetes-workload E2E failed: {}", e);
    }
    info!("TEST PASSED: kubernetes-workload");
}

#[tokio::test]
#[ignore]
async fn test_kubernetes_workload_standalone() {
    init_e2e_test();
    let ctx = match E2eContext::require_kubeconfig() {
        Ok(ctx) => ctx,
        Err(e) => panic!("{}", e),
    };
    if let Err(e) = run(ctx).await {
        panic!("kubernetes-workload standalone failed: {}", e);
    }
}

async fn run(ctx: E2eContext) -> Result<(), String> {
    let mut scenario = BuiltinScenario::KubernetesWorkload.scenario();
    let run_id = generate_run_id();
    scenario
        .customize_namespace(ctx.namespace.as_deref(), Some(&run_id))
        .map_err(|e| e.to_string())?;

    let plan = scenario
        .into_plan(&TemplateEngine::new())
        .map_err(|e| e.to_string())?;
    let client = connect(ctx.kubeconfig.as_deref())
        .await
        .map_err(|e| e.to_string())?;

    let runner = ScenarioRunner::new(&plan.name, client)
        .with_removal_wait(RemovalWait::default())
        .with_deadline(E2E_TIMEOUT);

    let report = runner.run(&plan.context, &plan.templates, &plan.steps).await;
    report.log_summary();

    for step in &report.steps {
        if step.status != StepStatus::Passed {
            return Err(format!("step '{}' ended as {:?}", step.description, step.status));
        }
    }
    if let Some(teardown) = &report.teardown_error {
        // Leaked resources poison later runs in the same cluster
        return Err(format!("teardown incomplete: {}", teardown));
    }

    report.into_result().map(|_| ()).map_err(|e| e.to_string())
}
