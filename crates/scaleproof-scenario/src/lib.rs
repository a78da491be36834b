//! Scenario engine for autoscaling verification
//!
//! Provisions rendered resources, drives one workload's scale, and polls a
//! second workload until its replica count converges. Everything talks to the
//! cluster through [`ClusterClient`], so the engine runs the same against a
//! live cluster ([`KubeClusterClient`]) or a test double.
//!
//! # Modules
//!
//! - [`cluster`] - Cluster capability trait and kube-backed implementation
//! - [`lifecycle`] - Ordered apply, reverse teardown
//! - [`driver`] - Scale mutations
//! - [`poller`] - Bounded fixed-interval replica polling
//! - [`scenario`] - Orchestration of a full run
//! - [`report`] - Per-step results and verdict

#![deny(missing_docs)]

pub mod cluster;
pub mod driver;
pub mod error;
pub mod lifecycle;
pub mod poller;
pub mod report;
pub mod scenario;

pub use cluster::{ClusterClient, DeleteOutcome, KubeClusterClient, ObservableTarget, WorkloadKind};
pub use error::{ApplyError, ScaleError, ScenarioError, TeardownError, TeardownFailure};
pub use lifecycle::{LifecycleManager, RemovalWait};
pub use poller::{wait_for_replica_count, PollExpectation, PollOutcome};
pub use report::{ScenarioReport, StepReport, StepStatus};
pub use scenario::{render_resources, DriveAction, ScenarioRunner, Step, Verification};
