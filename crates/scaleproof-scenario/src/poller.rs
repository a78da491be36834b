//! Condition poller
//!
//! Samples a workload's replica count at a fixed interval until it equals the
//! expectation or the attempt budget runs out. There is no backoff: the
//! interval is the contract, so a budget of N attempts costs N reads and N-1
//! sleeps. A failed read (API error or read timeout) is just a failed attempt.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use scaleproof_common::Error;

use crate::cluster::{ClusterClient, ObservableTarget};

/// Upper bound on a single replica-count read
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// What a poll waits for and how long it may try
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollExpectation {
    expected: u32,
    max_attempts: u32,
    interval: Duration,
    read_timeout: Duration,
}

impl PollExpectation {
    /// Wait for `expected` replicas, reading up to `max_attempts` times
    /// `interval` apart. A budget of zero attempts is raised to one.
    pub fn new(expected: u32, max_attempts: u32, interval: Duration) -> Self {
        Self {
            expected,
            max_attempts: max_attempts.max(1),
            interval,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }

    /// Override the per-read timeout
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Replica count that counts as success
    pub fn expected(&self) -> u32 {
        self.expected
    }

    /// Attempt budget (always at least 1)
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Sleep between attempts
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Bound on each read
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }
}

/// Result of one poll
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollOutcome {
    /// Whether the expected count was observed
    pub success: bool,
    /// Last successfully read count; `None` if every read failed
    pub last_value: Option<u32>,
    /// Reads performed, including failed ones
    pub attempts: u32,
    /// Most recent read failure, if any occurred
    pub last_error: Option<String>,
    /// Wall time spent polling
    pub elapsed: Duration,
}

/// Poll `target` until its replica count equals `expectation.expected()`.
///
/// Never returns an error: read failures are folded into the outcome.
pub async fn wait_for_replica_count(
    client: &dyn ClusterClient,
    target: &ObservableTarget,
    expectation: &PollExpectation,
) -> PollOutcome {
    let start = Instant::now();
    let mut attempts = 0u32;
    let mut last_value = None;
    let mut last_error = None;

    loop {
        attempts += 1;

        let read =
            tokio::time::timeout(expectation.read_timeout, client.get_replica_count(target)).await;

        match read {
            Ok(Ok(value)) => {
                last_value = Some(value);
                if value == expectation.expected {
                    info!(
                        workload = %target,
                        replicas = value,
                        attempts,
                        "replica count reached"
                    );
                    return PollOutcome {
                        success: true,
                        last_value,
                        attempts,
                        last_error,
                        elapsed: start.elapsed(),
                    };
                }
                debug!(
                    workload = %target,
                    observed = value,
                    expected = expectation.expected,
                    attempt = attempts,
                    "replica count not yet reached"
                );
            }
            Ok(Err(e)) => {
                debug!(
                    workload = %target,
                    attempt = attempts,
                    retryable = e.is_retryable(),
                    error = %e,
                    "replica read failed"
                );
                last_error = Some(e.to_string());
            }
            Err(_) => {
                let e = Error::timeout("get_replica_count", expectation.read_timeout);
                debug!(workload = %target, attempt = attempts, error = %e, "replica read timed out");
                last_error = Some(e.to_string());
            }
        }

        if attempts >= expectation.max_attempts {
            warn!(
                workload = %target,
                expected = expectation.expected,
                last_value = ?last_value,
                attempts,
                "replica count not reached within attempt budget"
            );
            return PollOutcome {
                success: false,
                last_value,
                attempts,
                last_error,
                elapsed: start.elapsed(),
            };
        }

        tokio::time::sleep(expectation.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{DeleteOutcome, MockClusterClient};
    use async_trait::async_trait;
    use rstest::rstest;
    use scaleproof_common::template::RenderedResource;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    /// Paused-clock timers fire on millisecond ticks
    fn assert_elapsed(actual: Duration, expected: Duration) {
        let slack = Duration::from_millis(100);
        assert!(
            actual >= expected && actual <= expected + slack,
            "elapsed {actual:?}, expected {expected:?}"
        );
    }

    fn sut() -> ObservableTarget {
        ObservableTarget::deployment("sut-deployment", "workload-ns")
    }

    /// Mock whose reads replay `script`; `None` entries fail the read.
    /// Once the script is exhausted the final entry repeats.
    fn scripted(script: Vec<Option<u32>>) -> (MockClusterClient, Arc<Mutex<u32>>) {
        let calls = Arc::new(Mutex::new(0u32));
        let counter = calls.clone();
        let mut queue = VecDeque::from(script);
        let mut mock = MockClusterClient::new();
        mock.expect_get_replica_count().returning(move |_| {
            *counter.lock().unwrap() += 1;
            let next = if queue.len() > 1 {
                queue.pop_front().flatten()
            } else {
                queue.front().copied().flatten()
            };
            next.ok_or_else(|| Error::internal("connection refused"))
        });
        (mock, calls)
    }

    #[tokio::test(start_paused = true)]
    async fn immediate_match_uses_one_attempt_and_no_sleep() {
        let (mock, calls) = scripted(vec![Some(0)]);
        let expectation = PollExpectation::new(0, 60, Duration::from_secs(1));

        let outcome = wait_for_replica_count(&mock, &sut(), &expectation).await;

        assert!(outcome.success);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.last_value, Some(0));
        assert_eq!(outcome.elapsed, Duration::ZERO);
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn converges_after_some_attempts() {
        let (mock, _) = scripted(vec![Some(0), Some(3), Some(5)]);
        let expectation = PollExpectation::new(5, 60, Duration::from_secs(2));

        let outcome = wait_for_replica_count(&mock, &sut(), &expectation).await;

        assert!(outcome.success);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.last_value, Some(5));
        assert_elapsed(outcome.elapsed, Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn lagging_sequence_succeeds_on_fourth_read() {
        let (mock, calls) = scripted(vec![Some(0), Some(0), Some(3), Some(5), Some(5)]);
        let expectation = PollExpectation::new(5, 10, Duration::from_secs(1));

        let outcome = wait_for_replica_count(&mock, &sut(), &expectation).await;

        assert!(outcome.success);
        assert_eq!(outcome.attempts, 4);
        assert_eq!(*calls.lock().unwrap(), 4);
        assert_elapsed(outcome.elapsed, Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn constant_mismatch_fails_with_last_value() {
        let (mock, _) = scripted(vec![Some(2)]);
        let expectation = PollExpectation::new(5, 3, Duration::from_secs(1));

        let outcome = wait_for_replica_count(&mock, &sut(), &expectation).await;

        assert!(!outcome.success);
        assert_eq!(outcome.last_value, Some(2));
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.last_error, None);
    }

    #[rstest]
    #[case(1)]
    #[case(3)]
    #[case(60)]
    #[tokio::test(start_paused = true)]
    async fn budget_exhaustion_costs_n_reads_and_n_minus_1_sleeps(#[case] max_attempts: u32) {
        let (mock, calls) = scripted(vec![Some(2)]);
        let interval = Duration::from_secs(2);
        let expectation = PollExpectation::new(5, max_attempts, interval);

        let outcome = wait_for_replica_count(&mock, &sut(), &expectation).await;

        assert!(!outcome.success);
        assert_eq!(outcome.attempts, max_attempts);
        assert_eq!(outcome.last_value, Some(2));
        assert_eq!(*calls.lock().unwrap(), max_attempts);
        assert_elapsed(outcome.elapsed, interval * (max_attempts - 1));
    }

    #[tokio::test(start_paused = true)]
    async fn read_errors_count_as_attempts_and_never_abort() {
        let (mock, _) = scripted(vec![None, None, Some(5)]);
        let expectation = PollExpectation::new(5, 10, Duration::from_secs(1));

        let outcome = wait_for_replica_count(&mock, &sut(), &expectation).await;

        assert!(outcome.success);
        assert_eq!(outcome.attempts, 3);
        assert!(outcome
            .last_error
            .as_deref()
            .is_some_and(|e| e.contains("connection refused")));
    }

    #[tokio::test(start_paused = true)]
    async fn every_read_failing_is_a_timeout_without_value() {
        let (mock, _) = scripted(vec![None]);
        let expectation = PollExpectation::new(0, 3, Duration::from_secs(1));

        let outcome = wait_for_replica_count(&mock, &sut(), &expectation).await;

        assert!(!outcome.success);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(outcome.last_value, None);
        assert!(outcome.last_error.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn expected_zero_is_not_special() {
        let (mock, _) = scripted(vec![Some(2), Some(1), Some(0)]);
        let expectation = PollExpectation::new(0, 60, Duration::from_secs(2));

        let outcome = wait_for_replica_count(&mock, &sut(), &expectation).await;

        assert!(outcome.success);
        assert_eq!(outcome.attempts, 3);
    }

    #[test]
    fn zero_attempt_budget_is_raised_to_one() {
        let expectation = PollExpectation::new(0, 0, Duration::from_secs(1));
        assert_eq!(expectation.max_attempts(), 1);
        assert_eq!(expectation.read_timeout(), DEFAULT_READ_TIMEOUT);
    }

    /// Reads that hang longer than any sensible read timeout
    struct HangingReads;

    #[async_trait]
    impl ClusterClient for HangingReads {
        async fn create_or_update(&self, _: &RenderedResource) -> Result<(), Error> {
            Ok(())
        }
        async fn delete(&self, _: &RenderedResource) -> Result<DeleteOutcome, Error> {
            Ok(DeleteOutcome::AlreadyAbsent)
        }
        async fn exists(&self, _: &RenderedResource) -> Result<bool, Error> {
            Ok(false)
        }
        async fn get_replica_count(&self, _: &ObservableTarget) -> Result<u32, Error> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(0)
        }
        async fn set_replica_count(&self, _: &ObservableTarget, _: u32) -> Result<(), Error> {
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn hung_read_is_bounded_and_counted() {
        let expectation = PollExpectation::new(0, 2, Duration::from_secs(1))
            .with_read_timeout(Duration::from_secs(5));

        let outcome = wait_for_replica_count(&HangingReads, &sut(), &expectation).await;

        assert!(!outcome.success);
        assert_eq!(outcome.attempts, 2);
        assert_eq!(outcome.last_value, None);
        assert!(outcome
            .last_error
            .as_deref()
            .is_some_and(|e| e.contains("timed out")));
        // two bounded reads plus one interval
        assert_elapsed(outcome.elapsed, Duration::from_secs(11));
    }
}
