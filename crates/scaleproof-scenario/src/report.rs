//! Run results

use std::time::Duration;

use tracing::{info, warn};

use crate::error::{ScenarioError, TeardownError};
use crate::poller::PollOutcome;

/// How far a step got
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepStatus {
    /// Not reached (an earlier phase failed or the deadline fired)
    NotRun,
    /// Verification converged
    Passed,
    /// The drive action failed; verification was skipped
    ScaleFailed {
        /// Why the scale mutation failed
        message: String,
    },
    /// Verification exhausted its attempt budget
    TimedOut,
}

/// Result of one drive-and-verify step
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepReport {
    /// Human-readable step description
    pub description: String,
    /// Final status
    pub status: StepStatus,
    /// Poll details, when verification ran
    pub outcome: Option<PollOutcome>,
}

impl StepReport {
    pub(crate) fn pending(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            status: StepStatus::NotRun,
            outcome: None,
        }
    }

    /// Whether the step passed
    pub fn passed(&self) -> bool {
        self.status == StepStatus::Passed
    }
}

/// Everything a run produced: per-step results, teardown problems, verdict
#[derive(Debug)]
pub struct ScenarioReport {
    /// Scenario name
    pub name: String,
    /// One entry per step, in order
    pub steps: Vec<StepReport>,
    /// The failure that decided the verdict, if any
    pub failure: Option<ScenarioError>,
    /// Resources teardown could not remove (does not affect the verdict)
    pub teardown_error: Option<TeardownError>,
    /// Wall time of the whole run including teardown
    pub elapsed: Duration,
}

impl ScenarioReport {
    pub(crate) fn new(name: impl Into<String>, steps: Vec<StepReport>) -> Self {
        Self {
            name: name.into(),
            steps,
            failure: None,
            teardown_error: None,
            elapsed: Duration::ZERO,
        }
    }

    /// Overall verdict: setup and every verification succeeded
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Number of steps that passed
    pub fn passed_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.passed()).count()
    }

    /// Log a PASS/FAIL summary block
    pub fn log_summary(&self) {
        info!("========================================");
        info!("  {}", self.name.to_uppercase());
        info!("========================================");
        for step in &self.steps {
            let tag = match &step.status {
                StepStatus::Passed => "PASS",
                StepStatus::NotRun => "SKIP",
                StepStatus::ScaleFailed { .. } | StepStatus::TimedOut => "FAIL",
            };
            match &step.outcome {
                Some(outcome) => info!(
                    "  {tag}  {:50} attempts={} last={} {:.1}s",
                    step.description,
                    outcome.attempts,
                    outcome
                        .last_value
                        .map_or_else(|| "-".to_string(), |v| v.to_string()),
                    outcome.elapsed.as_secs_f64()
                ),
                None => info!("  {tag}  {}", step.description),
            }
            if let StepStatus::ScaleFailed { message } = &step.status {
                info!("        -> {message}");
            }
        }
        info!("----------------------------------------");
        info!(
            "  {} of {} steps passed ({:.1}s total)",
            self.passed_steps(),
            self.steps.len(),
            self.elapsed.as_secs_f64()
        );
        if let Some(failure) = &self.failure {
            info!("  FAILED: {failure}");
        }
        if let Some(teardown) = &self.teardown_error {
            warn!("  teardown incomplete: {teardown}");
        }
        info!("========================================");
    }

    /// Convert into a `Result`, yielding the deciding failure on a failed run.
    ///
    /// Teardown problems never turn a passing run into an error.
    pub fn into_result(mut self) -> Result<ScenarioReport, ScenarioError> {
        match self.failure.take() {
            Some(failure) => Err(failure),
            None => Ok(self),
        }
    }
}
