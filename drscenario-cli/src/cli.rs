//! CLI argument parsing using clap derive API
//!
//! Purely declarative: no I/O happens here.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// drscenario -- staged disaster-recovery test driver.
///
/// Use `drscenario <COMMAND> --help` for subcommand details.
#[derive(Parser, Debug)]
#[command(name = "drscenario", version, about, long_about = None)]
pub struct Cli {
    /// Path to a drscenario.toml file (defaults and environment only when absent).
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Output format.
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// Machine-readable JSON.
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Execute the scenario phases inside the run window.
    Run(RunArgs),

    /// List the phases and whether the run window executes them.
    Phases(PhasesArgs),

    /// Print a rendered manifest template.
    Render(RenderArgs),

    /// Inspect configuration.
    Config(ConfigArgs),
}

// ---- run ----

/// Execute the scenario.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// First phase to execute (overrides START_AT).
    #[arg(long)]
    pub start_at: Option<String>,

    /// Last phase to execute (overrides STOP_AT).
    #[arg(long)]
    pub stop_at: Option<String>,

    /// Run identifier; `auto` generates one (overrides TESTID).
    #[arg(long)]
    pub run_id: Option<String>,

    /// Seed for namespace selection, for reproducible placement.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Log every cluster command instead of running it.
    #[arg(long)]
    pub dry_run: bool,
}

// ---- phases ----

#[derive(Args, Debug, Default)]
pub struct PhasesArgs {
    /// First phase of the window (overrides START_AT).
    #[arg(long)]
    pub start_at: Option<String>,

    /// Last phase of the window (overrides STOP_AT).
    #[arg(long)]
    pub stop_at: Option<String>,
}

// ---- render ----

/// Render one template with the configured substitutions.
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Template name (namespace, deployment, pvc, drpc, placement, placementdecision).
    pub template: String,

    /// Value for ${NAMESPACE} (default: first protected namespace).
    #[arg(long)]
    pub namespace: Option<String>,

    /// Value for ${DEPLOYMENT_NAME} (default: workload 0 of the namespace).
    #[arg(long)]
    pub name: Option<String>,

    /// Value for ${STORAGECLASS} (default: the rbd storage class).
    #[arg(long)]
    pub storage_class: Option<String>,
}

// ---- config ----

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Validate the configuration and report problems.
    Validate,
    /// Show the effective configuration (file + env overrides + defaults).
    Show {
        /// Show only one section (general, clusters, run, workloads, teardown, storage, kubectl, templates).
        #[arg(long)]
        section: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_run_defaults() {
        let cli = Cli::try_parse_from(["drscenario", "run"]).expect("should parse run");
        assert!(cli.config.is_none());
        assert_eq!(cli.output, OutputFormat::Text);
        match cli.command {
            Commands::Run(args) => {
                assert!(args.start_at.is_none());
                assert!(args.stop_at.is_none());
                assert!(args.run_id.is_none());
                assert!(args.seed.is_none());
                assert!(!args.dry_run);
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn parse_run_with_window_and_seed() {
        let cli = Cli::try_parse_from([
            "drscenario",
            "run",
            "--start-at",
            "failover",
            "--stop-at",
            "relocate",
            "--run-id",
            "test-9",
            "--seed",
            "42",
            "--dry-run",
        ])
        .expect("should parse run flags");
        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.start_at.as_deref(), Some("failover"));
                assert_eq!(args.stop_at.as_deref(), Some("relocate"));
                assert_eq!(args.run_id.as_deref(), Some("test-9"));
                assert_eq!(args.seed, Some(42));
                assert!(args.dry_run);
            }
            _ => panic!("expected Run command"),
        }
    }

    #[test]
    fn parse_render_with_overrides() {
        let cli = Cli::try_parse_from([
            "drscenario",
            "render",
            "pvc",
            "--namespace",
            "ns",
            "--name",
            "w",
            "--storage-class",
            "rook-cephfs",
        ])
        .expect("should parse render");
        match cli.command {
            Commands::Render(args) => {
                assert_eq!(args.template, "pvc");
                assert_eq!(args.namespace.as_deref(), Some("ns"));
                assert_eq!(args.name.as_deref(), Some("w"));
                assert_eq!(args.storage_class.as_deref(), Some("rook-cephfs"));
            }
            _ => panic!("expected Render command"),
        }
    }

    #[test]
    fn render_requires_template() {
        assert!(Cli::try_parse_from(["drscenario", "render"]).is_err());
    }

    #[test]
    fn parse_config_show_section() {
        let cli = Cli::try_parse_from(["drscenario", "config", "show", "--section", "clusters"])
            .expect("should parse config show");
        match cli.command {
            Commands::Config(args) => match args.action {
                ConfigAction::Show { section } => assert_eq!(section.as_deref(), Some("clusters")),
                ConfigAction::Validate => panic!("expected Show action"),
            },
            _ => panic!("expected Config command"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "drscenario",
            "phases",
            "--config",
            "/etc/drscenario.toml",
            "--output",
            "json",
            "--log-level",
            "debug",
        ])
        .expect("global flags should be accepted after the subcommand");
        assert_eq!(cli.config, Some(PathBuf::from("/etc/drscenario.toml")));
        assert_eq!(cli.output, OutputFormat::Json);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn unknown_output_format_rejected() {
        assert!(Cli::try_parse_from(["drscenario", "--output", "yaml", "phases"]).is_err());
    }
}
