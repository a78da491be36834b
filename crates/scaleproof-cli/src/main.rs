//! scaleproof CLI
//!
//! Runs autoscaling verification scenarios against a Kubernetes cluster.

use clap::Parser;

use scaleproof_cli::{Cli, Result};
use scaleproof_common::telemetry::{init_tracing, TelemetryConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(&TelemetryConfig {
        json: cli.json_logs,
        ..Default::default()
    })?;

    cli.run().await
}
