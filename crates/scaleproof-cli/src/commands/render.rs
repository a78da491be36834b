//! `scaleproof render`: print the manifests a run would apply

use clap::Args;

use scaleproof_common::kube_utils::parse_manifest;
use scaleproof_common::template::TemplateEngine;
use scaleproof_scenario::render_resources;

use super::ScenarioArgs;
use crate::Result;

/// Render a scenario's manifests without touching a cluster
#[derive(Args, Debug)]
pub struct RenderArgs {
    #[command(flatten)]
    pub scenario: ScenarioArgs,
}

/// Execute the `render` subcommand
///
/// Manifests go to stdout as a `---` separated stream; the step plan goes to
/// stderr so the output can be piped to `kubectl apply -f -`.
pub async fn run(args: RenderArgs) -> Result<()> {
    let engine = TemplateEngine::new();
    let plan = args.scenario.load()?.into_plan(&engine)?;
    let resources = render_resources(&engine, &plan.context, &plan.templates)?;

    for resource in &resources {
        // Fail on anything the cluster client would reject
        parse_manifest(resource.manifest())?;
        println!("---");
        println!("# {}", resource.template());
        println!("{}", resource.manifest().trim_end());
    }

    for (index, step) in plan.steps.iter().enumerate() {
        let drive = step
            .drive
            .as_ref()
            .map(|d| format!("scale {} to {}, then ", d.target, d.replicas))
            .unwrap_or_default();
        let expectation = &step.verify.expectation;
        eprintln!(
            "step {}: {}wait for {} == {} ({} x {}s) - {}",
            index + 1,
            drive,
            step.verify.target,
            expectation.expected(),
            expectation.max_attempts(),
            expectation.interval().as_secs(),
            step.description
        );
    }

    Ok(())
}
