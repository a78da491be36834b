//! Resource lifecycle: apply in order, remove in reverse
//!
//! Neither direction retries. Apply stops at the first failure and reports how
//! far it got. A failed create may still have landed, so callers tear down the
//! whole list, not just the applied prefix. Teardown keeps going after a
//! failure so one stuck resource does not leak the rest.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use scaleproof_common::template::RenderedResource;

use crate::cluster::{ClusterClient, DeleteOutcome};
use crate::error::{ApplyError, TeardownError, TeardownFailure};

/// Budget for waiting until deleted resources are gone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemovalWait {
    /// Existence checks per resource
    pub max_attempts: u32,
    /// Sleep between checks
    pub interval: Duration,
}

impl Default for RemovalWait {
    fn default() -> Self {
        Self {
            max_attempts: 120,
            interval: Duration::from_secs(1),
        }
    }
}

/// Applies and removes rendered resources against a cluster
pub struct LifecycleManager {
    client: Arc<dyn ClusterClient>,
    removal_wait: Option<RemovalWait>,
}

impl LifecycleManager {
    /// Create a manager that returns as soon as deletions are accepted
    pub fn new(client: Arc<dyn ClusterClient>) -> Self {
        Self {
            client,
            removal_wait: None,
        }
    }

    /// After deleting, wait until each removed resource reports absent
    pub fn with_removal_wait(mut self, wait: RemovalWait) -> Self {
        self.removal_wait = Some(wait);
        self
    }

    /// Submit resources in order.
    ///
    /// Returns the number applied (always `resources.len()` on success).
    pub async fn apply(&self, resources: &[RenderedResource]) -> Result<usize, ApplyError> {
        for (applied, resource) in resources.iter().enumerate() {
            debug!(resource = resource.template(), "applying");
            self.client
                .create_or_update(resource)
                .await
                .map_err(|source| ApplyError {
                    resource: resource.template().to_string(),
                    applied,
                    source,
                })?;
        }
        info!(count = resources.len(), "resources applied");
        Ok(resources.len())
    }

    /// Remove resources in reverse order.
    ///
    /// A resource that is already gone counts as removed, so calling this twice
    /// is harmless. Every resource is attempted; all failures are returned
    /// together.
    pub async fn teardown(&self, resources: &[RenderedResource]) -> Result<(), TeardownError> {
        let mut failures = Vec::new();
        let mut deleted = Vec::new();

        for resource in resources.iter().rev() {
            match self.client.delete(resource).await {
                Ok(DeleteOutcome::Deleted) => {
                    debug!(resource = resource.template(), "deleted");
                    deleted.push(resource);
                }
                Ok(DeleteOutcome::AlreadyAbsent) => {
                    debug!(resource = resource.template(), "already absent");
                }
                Err(e) => {
                    warn!(resource = resource.template(), error = %e, "failed to delete");
                    failures.push(TeardownFailure {
                        resource: resource.template().to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }

        if let Some(wait) = self.removal_wait {
            for resource in deleted {
                if let Err(failure) = self.wait_for_removal(resource, wait).await {
                    failures.push(failure);
                }
            }
        }

        if failures.is_empty() {
            info!(count = resources.len(), "teardown complete");
            Ok(())
        } else {
            Err(TeardownError { failures })
        }
    }

    async fn wait_for_removal(
        &self,
        resource: &RenderedResource,
        wait: RemovalWait,
    ) -> Result<(), TeardownFailure> {
        let mut last_error = None;

        for attempt in 1..=wait.max_attempts.max(1) {
            match self.client.exists(resource).await {
                Ok(false) => return Ok(()),
                Ok(true) => {
                    debug!(resource = resource.template(), attempt, "waiting for removal");
                }
                Err(e) => {
                    debug!(resource = resource.template(), attempt, error = %e, "existence check failed");
                    last_error = Some(e.to_string());
                }
            }
            if attempt < wait.max_attempts {
                tokio::time::sleep(wait.interval).await;
            }
        }

        let mut message = format!("still present after {} checks", wait.max_attempts.max(1));
        if let Some(e) = last_error {
            message.push_str(&format!(" (last error: {})", e));
        }
        warn!(resource = resource.template(), %message, "resource not removed");
        Err(TeardownFailure {
            resource: resource.template().to_string(),
            message,
        })
    }
}
