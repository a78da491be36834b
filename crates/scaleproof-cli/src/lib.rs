//! scaleproof CLI library

pub mod builtin;
pub mod commands;
pub mod config;
pub mod error;

pub use error::{Error, Result};

use clap::{Parser, Subcommand};

/// scaleproof - verify that an autoscaler converges a workload
#[derive(Parser, Debug)]
#[command(name = "scaleproof")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Emit JSON log lines instead of human-readable output
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a scenario against a live cluster
    Run(commands::run::RunArgs),
    /// Print the manifests a scenario would apply
    Render(commands::render::RenderArgs),
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Run(args) => commands::run::run(args).await,
            Commands::Render(args) => commands::render::run(args).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::BuiltinScenario;
    use clap::CommandFactory;
    use rstest::rstest;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_run_with_builtin() {
        let cli = Cli::try_parse_from([
            "scaleproof",
            "--json-logs",
            "run",
            "--builtin",
            "kubernetes-workload",
            "--namespace",
            "ci-ns",
            "--deadline-secs",
            "900",
        ])
        .unwrap();

        assert!(cli.json_logs);
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(
                    args.scenario.builtin,
                    Some(BuiltinScenario::KubernetesWorkload)
                );
                assert_eq!(args.scenario.namespace.as_deref(), Some("ci-ns"));
                assert_eq!(args.deadline_secs, Some(900));
                assert!(!args.scenario.no_run_id);
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn file_and_builtin_conflict() {
        let result = Cli::try_parse_from([
            "scaleproof",
            "render",
            "--file",
            "s.yaml",
            "--builtin",
            "kubernetes-workload",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn scenario_source_is_required_at_load() {
        let cli = Cli::try_parse_from(["scaleproof", "render"]).unwrap();
        match cli.command {
            Commands::Render(args) => {
                assert!(matches!(args.scenario.load(), Err(Error::Validation { .. })));
            }
            other => panic!("expected render, got {other:?}"),
        }
    }

    #[rstest]
    #[case::default_suffix(&[], "kubernetes-workload-test-ns", true)]
    #[case::no_run_id(&["--no-run-id"], "kubernetes-workload-test-ns", false)]
    #[case::override_suffix(&["--namespace", "ci"], "ci", true)]
    #[case::override_exact(&["--namespace", "ci", "--no-run-id"], "ci", false)]
    fn builtin_load_namespace(
        #[case] extra: &[&str],
        #[case] base: &str,
        #[case] suffixed: bool,
    ) {
        let mut argv = vec!["scaleproof", "render", "--builtin", "kubernetes-workload"];
        argv.extend_from_slice(extra);
        let cli = Cli::try_parse_from(argv).unwrap();
        let Commands::Render(args) = cli.command else {
            panic!("expected render");
        };

        let ns = args.scenario.load().unwrap().namespace().unwrap();
        if suffixed {
            let run_id = ns
                .strip_prefix(base)
                .and_then(|rest| rest.strip_prefix('-'))
                .unwrap_or_else(|| panic!("{ns} should extend {base}"));
            assert_eq!(run_id.len(), 6);
            assert!(run_id.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        } else {
            assert_eq!(ns, base);
        }
    }
}
