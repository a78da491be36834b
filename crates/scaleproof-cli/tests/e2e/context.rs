//! Cluster context for E2E tests
//!
//! # Environment Variables
//!
//! ```bash
//! SCALEPROOF_E2E_KUBECONFIG=/path/to/kubeconfig   # defaults to kube inference
//! SCALEPROOF_E2E_NAMESPACE=my-ns                  # defaults to the scenario's
//! ```

use std::path::PathBuf;

use scaleproof_common::telemetry::{init_tracing, TelemetryConfig};

const KUBECONFIG_ENV: &str = "SCALEPROOF_E2E_KUBECONFIG";
const NAMESPACE_ENV: &str = "SCALEPROOF_E2E_NAMESPACE";

/// Connection details for the cluster under test
#[derive(Debug, Clone, Default)]
pub struct E2eContext {
    /// Kubeconfig path; `None` lets kube infer it
    pub kubeconfig: Option<PathBuf>,
    /// Namespace override for the scenario
    pub namespace: Option<String>,
}

impl E2eContext {
    /// Read the context from environment variables
    pub fn from_env() -> Self {
        Self {
            kubeconfig: non_empty_env(KUBECONFIG_ENV).map(PathBuf::from),
            namespace: non_empty_env(NAMESPACE_ENV),
        }
    }

    /// Like [`from_env`](Self::from_env) but requires an explicit kubeconfig
    pub fn require_kubeconfig() -> Result<Self, String> {
        let ctx = Self::from_env();
        if ctx.kubeconfig.is_none() {
            return Err(format!("{} must be set for standalone tests", KUBECONFIG_ENV));
        }
        Ok(ctx)
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

/// Initialize logging once per test binary
pub fn init_e2e_test() {
    let _ = init_tracing(&TelemetryConfig::default());
}
