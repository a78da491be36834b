//! Scenario error taxonomy
//!
//! Render failures stop a run before the cluster is touched. Apply, scale,
//! poll, and deadline failures end the active phase but teardown still runs.
//! Teardown failures are reported alongside the verdict and never change it.

use std::fmt;
use std::time::Duration;

use scaleproof_common::template::RenderError;
use thiserror::Error;

/// A resource could not be submitted to the cluster
#[derive(Debug, Error)]
#[error("failed to apply '{resource}' ({applied} applied before it): {source}")]
pub struct ApplyError {
    /// Template id of the first failing resource
    pub resource: String,
    /// Number of resources applied successfully before the failure
    pub applied: usize,
    /// Underlying cluster error
    #[source]
    pub source: scaleproof_common::Error,
}

/// A scale mutation was not accepted
#[derive(Debug, Error)]
pub enum ScaleError {
    /// The workload to scale does not exist
    #[error("cannot scale {target}: not found")]
    TargetNotFound {
        /// Workload description (`Kind namespace/name`)
        target: String,
    },

    /// The cluster rejected the mutation
    #[error("scaling {target} to {replicas} was rejected: {source}")]
    Rejected {
        /// Workload description (`Kind namespace/name`)
        target: String,
        /// Requested replica count
        replicas: u32,
        /// Underlying cluster error
        #[source]
        source: scaleproof_common::Error,
    },
}

/// One resource that could not be removed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeardownFailure {
    /// Template id of the resource
    pub resource: String,
    /// What went wrong
    pub message: String,
}

impl fmt::Display for TeardownFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.resource, self.message)
    }
}

/// Every removal failure from one teardown pass
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("teardown left {} resource(s) behind: {}", .failures.len(), join(.failures))]
pub struct TeardownError {
    /// Failures in removal order
    pub failures: Vec<TeardownFailure>,
}

fn join(failures: &[TeardownFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Why a scenario run failed
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// A template could not be rendered; nothing was applied
    #[error(transparent)]
    Render(#[from] RenderError),

    /// Setup failed while applying resources
    #[error(transparent)]
    Apply(#[from] ApplyError),

    /// A step's drive action failed
    #[error("step '{step}': {source}")]
    Scale {
        /// Description of the failing step
        step: String,
        /// The scale failure
        #[source]
        source: ScaleError,
    },

    /// A verification did not converge within its attempt budget
    #[error(
        "step '{step}': {target} did not reach {expected} replicas after {attempts} attempts (last observed: {})",
        describe_last(.last_value, .last_error)
    )]
    PollTimeout {
        /// Description of the failing step
        step: String,
        /// Workload that was observed
        target: String,
        /// Replica count that was expected
        expected: u32,
        /// Last successfully read value, if any read succeeded
        last_value: Option<u32>,
        /// Attempts consumed
        attempts: u32,
        /// Most recent read failure, if any
        last_error: Option<String>,
    },

    /// The run exceeded its overall deadline
    #[error("scenario exceeded its {}s deadline", .deadline.as_secs())]
    DeadlineExceeded {
        /// Configured deadline
        deadline: Duration,
    },
}

fn describe_last(last_value: &Option<u32>, last_error: &Option<String>) -> String {
    match (last_value, last_error) {
        (Some(value), _) => value.to_string(),
        (None, Some(error)) => format!("no successful read, last error: {}", error),
        (None, None) => "nothing".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_timeout_message_with_value() {
        let err = ScenarioError::PollTimeout {
            step: "replica count should be 5 after a minute".to_string(),
            target: "Deployment ns/sut-deployment".to_string(),
            expected: 5,
            last_value: Some(3),
            attempts: 60,
            last_error: None,
        };
        let msg = err.to_string();
        assert!(msg.contains("did not reach 5 replicas after 60 attempts"));
        assert!(msg.contains("last observed: 3"));
    }

    #[test]
    fn test_poll_timeout_message_without_reads() {
        let err = ScenarioError::PollTimeout {
            step: "baseline".to_string(),
            target: "Deployment ns/sut".to_string(),
            expected: 0,
            last_value: None,
            attempts: 3,
            last_error: Some("connection refused".to_string()),
        };
        assert!(err
            .to_string()
            .contains("no successful read, last error: connection refused"));
    }

    #[test]
    fn test_teardown_error_lists_every_failure() {
        let err = TeardownError {
            failures: vec![
                TeardownFailure {
                    resource: "scaledObjectTemplate".to_string(),
                    message: "forbidden".to_string(),
                },
                TeardownFailure {
                    resource: "scenario-namespace".to_string(),
                    message: "still present".to_string(),
                },
            ],
        };
        assert_eq!(
            err.to_string(),
            "teardown left 2 resource(s) behind: scaledObjectTemplate: forbidden; scenario-namespace: still present"
        );
    }
}
