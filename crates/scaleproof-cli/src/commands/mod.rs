//! CLI commands

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use tracing::info;

use scaleproof_common::kube_utils::{create_client, generate_run_id};
use scaleproof_common::retry::{retry_with_backoff, RetryConfig};
use scaleproof_scenario::{ClusterClient, KubeClusterClient};

use crate::builtin::BuiltinScenario;
use crate::config::{resolve_kubeconfig, ScenarioFile};
use crate::{Error, Result};

pub mod render;
pub mod run;

/// Attempts to reach the API server before giving up
const CONNECT_ATTEMPTS: u32 = 5;

/// Where a scenario comes from and how its namespace is chosen
#[derive(Args, Debug, Clone)]
pub struct ScenarioArgs {
    /// Path to a scenario YAML file
    #[arg(short = 'f', long = "file", conflicts_with = "builtin")]
    pub file: Option<PathBuf>,

    /// Run a scenario shipped with the binary
    #[arg(long, value_enum)]
    pub builtin: Option<BuiltinScenario>,

    /// Override the scenario namespace
    #[arg(long)]
    pub namespace: Option<String>,

    /// Use the namespace as-is instead of appending a random run id
    #[arg(long)]
    pub no_run_id: bool,
}

impl ScenarioArgs {
    /// Load the selected scenario and apply namespace options
    pub fn load(&self) -> Result<ScenarioFile> {
        let mut scenario = match (&self.file, self.builtin) {
            (Some(path), _) => ScenarioFile::load(path)?,
            (None, Some(builtin)) => builtin.scenario(),
            (None, None) => {
                return Err(Error::validation(
                    "either --file or --builtin must be given",
                ))
            }
        };

        let run_id = if self.no_run_id || scenario.namespace_field.is_none() {
            None
        } else {
            Some(generate_run_id())
        };
        scenario.customize_namespace(self.namespace.as_deref(), run_id.as_deref())?;
        Ok(scenario)
    }
}

/// Build a cluster client, retrying transient connection failures.
pub async fn connect(kubeconfig: Option<&Path>) -> Result<Arc<dyn ClusterClient>> {
    let kubeconfig = resolve_kubeconfig(kubeconfig);
    info!(
        kubeconfig = %kubeconfig
            .as_deref()
            .map_or_else(|| "<inferred>".to_string(), |p| p.display().to_string()),
        "connecting to cluster"
    );

    let path = kubeconfig.as_deref();
    let client = retry_with_backoff(
        &RetryConfig::with_max_attempts(CONNECT_ATTEMPTS),
        "create_client",
        || create_client(path),
    )
    .await?;

    Ok(Arc::new(KubeClusterClient::new(client)))
}
