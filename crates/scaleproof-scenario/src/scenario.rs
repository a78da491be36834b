//! Scenario orchestration
//!
//! A run renders every template, applies the results, then executes its steps
//! in order. Each step optionally drives one workload and then polls another
//! until it converges. The first failing step ends the run. Whatever happened,
//! every rendered resource is torn down before the report is returned.
//!
//! ```text
//! render ──▶ apply ──▶ step 1 ──▶ step 2 ──▶ ... ──▶ teardown
//!   │          │          │          │                  ▲
//!   │          └──────────┴──────────┴── on failure ────┤
//!   └── on failure: nothing applied, nothing removed    │
//!                                   deadline fired ─────┘
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{error, info, warn};

use scaleproof_common::kube_utils::build_namespace;
use scaleproof_common::template::{
    RenderError, RenderedResource, ScenarioContext, TemplateEngine, TemplateSet,
};

use crate::cluster::{ClusterClient, ObservableTarget};
use crate::driver;
use crate::error::ScenarioError;
use crate::lifecycle::{LifecycleManager, RemovalWait};
use crate::poller::{self, PollExpectation};
use crate::report::{ScenarioReport, StepReport, StepStatus};

/// Template id given to the generated namespace definition
pub const NAMESPACE_RESOURCE: &str = "scenario-namespace";

/// Scale mutation performed at the start of a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveAction {
    /// Workload to scale
    pub target: ObservableTarget,
    /// Desired replicas
    pub replicas: u32,
}

/// Convergence check performed by a step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    /// Workload to observe
    pub target: ObservableTarget,
    /// Expected count and polling budget
    pub expectation: PollExpectation,
}

/// One drive-and-verify step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Human-readable description, shown in reports
    pub description: String,
    /// Optional drive action; baseline checks have none
    pub drive: Option<DriveAction>,
    /// What must converge for the step to pass
    pub verify: Verification,
}

impl Step {
    /// A verification-only step
    pub fn verify(
        description: impl Into<String>,
        target: ObservableTarget,
        expectation: PollExpectation,
    ) -> Self {
        Self {
            description: description.into(),
            drive: None,
            verify: Verification {
                target,
                expectation,
            },
        }
    }

    /// Scale `target` to `replicas` before verifying
    pub fn with_drive(mut self, target: ObservableTarget, replicas: u32) -> Self {
        self.drive = Some(DriveAction { target, replicas });
        self
    }
}

/// Render every definition of a scenario, in apply order.
///
/// When the context designates a namespace it comes first, ahead of every
/// templated resource.
pub fn render_resources(
    engine: &TemplateEngine,
    ctx: &ScenarioContext,
    templates: &TemplateSet,
) -> Result<Vec<RenderedResource>, RenderError> {
    let mut resources = Vec::with_capacity(templates.len() + 1);
    if let Some(namespace) = ctx.namespace() {
        let ns = build_namespace(namespace, &BTreeMap::new());
        resources.push(RenderedResource::from_typed(NAMESPACE_RESOURCE, &ns)?);
    }
    resources.extend(engine.render_all(templates, ctx)?);
    Ok(resources)
}

/// Runs scenarios against one cluster
pub struct ScenarioRunner {
    name: String,
    client: Arc<dyn ClusterClient>,
    engine: TemplateEngine,
    lifecycle: LifecycleManager,
    deadline: Option<Duration>,
}

impl ScenarioRunner {
    /// Create a runner with no deadline and no removal wait
    pub fn new(name: impl Into<String>, client: Arc<dyn ClusterClient>) -> Self {
        Self {
            name: name.into(),
            lifecycle: LifecycleManager::new(client.clone()),
            client,
            engine: TemplateEngine::new(),
            deadline: None,
        }
    }

    /// Wait for removed resources to disappear during teardown
    pub fn with_removal_wait(mut self, wait: RemovalWait) -> Self {
        self.lifecycle = LifecycleManager::new(self.client.clone()).with_removal_wait(wait);
        self
    }

    /// Abort setup and steps once `deadline` has elapsed; teardown still runs
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Scenario name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Render the definitions a run would apply, in apply order
    pub fn prepare(
        &self,
        ctx: &ScenarioContext,
        templates: &TemplateSet,
    ) -> Result<Vec<RenderedResource>, RenderError> {
        render_resources(&self.engine, ctx, templates)
    }

    /// Execute the scenario and report the outcome.
    ///
    /// Once rendering succeeds, never returns without tearing down every
    /// rendered resource, including one whose apply call failed. Use
    /// [`ScenarioReport::into_result`] for a pass/fail `Result`.
    pub async fn run(
        &self,
        ctx: &ScenarioContext,
        templates: &TemplateSet,
        steps: &[Step],
    ) -> ScenarioReport {
        let start = Instant::now();
        let mut report = ScenarioReport::new(
            &self.name,
            steps
                .iter()
                .map(|s| StepReport::pending(&s.description))
                .collect(),
        );

        info!(scenario = %self.name, steps = steps.len(), "starting scenario");

        let resources = match self.prepare(ctx, templates) {
            Ok(resources) => resources,
            Err(e) => {
                error!(scenario = %self.name, error = %e, "render failed, nothing applied");
                report.failure = Some(e.into());
                report.elapsed = start.elapsed();
                return report;
            }
        };

        let execution = self.execute(&resources, steps, &mut report.steps);
        let result = match self.deadline {
            Some(deadline) => tokio::time::timeout(deadline, execution)
                .await
                .unwrap_or(Err(ScenarioError::DeadlineExceeded { deadline })),
            None => execution.await,
        };

        if let Err(e) = result {
            error!(scenario = %self.name, error = %e, "scenario failed");
            report.failure = Some(e);
        }

        // A failed create may still have been persisted; deleting the never
        // applied rest is a no-op
        if let Err(e) = self.lifecycle.teardown(&resources).await {
            warn!(scenario = %self.name, error = %e, "teardown incomplete");
            report.teardown_error = Some(e);
        }

        report.elapsed = start.elapsed();
        info!(
            scenario = %self.name,
            success = report.is_success(),
            elapsed_secs = report.elapsed.as_secs(),
            "scenario finished"
        );
        report
    }

    async fn execute(
        &self,
        resources: &[RenderedResource],
        steps: &[Step],
        reports: &mut [StepReport],
    ) -> Result<(), ScenarioError> {
        self.lifecycle.apply(resources).await?;

        for (index, (step, report)) in steps.iter().zip(reports.iter_mut()).enumerate() {
            info!(
                step = index + 1,
                total = steps.len(),
                description = %step.description,
                "running step"
            );

            if let Some(drive) = &step.drive {
                if let Err(source) =
                    driver::set_replicas(self.client.as_ref(), &drive.target, drive.replicas).await
                {
                    report.status = StepStatus::ScaleFailed {
                        message: source.to_string(),
                    };
                    return Err(ScenarioError::Scale {
                        step: step.description.clone(),
                        source,
                    });
                }
            }

            let verify = &step.verify;
            let outcome =
                poller::wait_for_replica_count(self.client.as_ref(), &verify.target, &verify.expectation)
                    .await;
            report.outcome = Some(outcome.clone());

            if outcome.success {
                report.status = StepStatus::Passed;
            } else {
                report.status = StepStatus::TimedOut;
                return Err(ScenarioError::PollTimeout {
                    step: step.description.clone(),
                    target: verify.target.to_string(),
                    expected: verify.expectation.expected(),
                    last_value: outcome.last_value,
                    attempts: outcome.attempts,
                    last_error: outcome.last_error,
                });
            }
        }

        Ok(())
    }
}
