//! `scaleproof run`: execute a scenario against a cluster

use std::path::PathBuf;
use std::time::Duration;

use clap::Args;
use tracing::info;

use scaleproof_common::template::TemplateEngine;
use scaleproof_scenario::{RemovalWait, ScenarioRunner};

use super::{connect, ScenarioArgs};
use crate::{Error, Result};

/// Run a scenario against a live cluster
#[derive(Args, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub scenario: ScenarioArgs,

    /// Path to kubeconfig (falls back to SCALEPROOF_KUBECONFIG, then kube defaults)
    #[arg(long)]
    pub kubeconfig: Option<PathBuf>,

    /// Abort the run after this many seconds; teardown still runs
    #[arg(long, env = "SCALEPROOF_DEADLINE_SECS")]
    pub deadline_secs: Option<u64>,

    /// Return without waiting for deleted resources to disappear
    #[arg(long)]
    pub no_wait_for_removal: bool,
}

/// Execute the `run` subcommand
pub async fn run(args: RunArgs) -> Result<()> {
    let scenario = args.scenario.load()?;
    info!(
        scenario = %scenario.name,
        namespace = scenario.namespace().as_deref().unwrap_or("-"),
        "loaded scenario"
    );

    let plan = scenario.into_plan(&TemplateEngine::new())?;
    let client = connect(args.kubeconfig.as_deref()).await?;

    let mut runner = ScenarioRunner::new(&plan.name, client);
    if !args.no_wait_for_removal {
        runner = runner.with_removal_wait(RemovalWait::default());
    }
    if let Some(secs) = args.deadline_secs {
        runner = runner.with_deadline(Duration::from_secs(secs));
    }

    let report = runner.run(&plan.context, &plan.templates, &plan.steps).await;
    report.log_summary();

    report
        .into_result()
        .map(|_| ())
        .map_err(|source| Error::ScenarioFailed {
            name: runner.name().to_string(),
            source,
        })
}
