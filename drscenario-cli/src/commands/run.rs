//! `drscenario run` command handler

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info};

use drscenario_cluster::{KubectlClient, TeardownReport};
use drscenario_core::config::ScenarioConfig;
use drscenario_core::phase::{Phase, RunWindow};
use drscenario_manifest::{ManifestRenderer, TemplateSource};

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};
use crate::scenario::{RunContext, Scenario, ScenarioError};

/// Execute the `run` command.
pub async fn execute(
    args: RunArgs,
    config_path: Option<&Path>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let mut config = ScenarioConfig::load(config_path).await?;
    apply_overrides(&mut config, &args);
    config.validate()?;

    let run_id = config.run_id();
    let namespaces = config.namespaces(&run_id);
    let window = config.window();
    info!(
        run_id = %run_id,
        window = %window,
        namespaces = namespaces.len(),
        dry_run = args.dry_run,
        "run configured"
    );

    let client =
        Arc::new(KubectlClient::new(config.kubectl.binary.clone()).with_dry_run(args.dry_run));
    let renderer = ManifestRenderer::new(TemplateSource::from_dir(&config.templates.dir));
    let mut ctx = RunContext::new(run_id, namespaces, config.run.seed);
    let scenario = Scenario::new(client, renderer, config);

    let result = scenario.run(&mut ctx, window).await;
    if let Err(ref e) = result {
        error!(phase = %e.phase(), error = %e, "scenario aborted");
    }

    let report = RunReport::new(&ctx, window, args.dry_run, result.as_ref().err());
    writer.render(&report)?;

    result.map_err(CliError::from)
}

/// Applies `run` flags on top of file and environment configuration.
pub fn apply_overrides(config: &mut ScenarioConfig, args: &RunArgs) {
    if let Some(start) = &args.start_at {
        config.run.start_at.clone_from(start);
    }
    if let Some(stop) = &args.stop_at {
        config.run.stop_at.clone_from(stop);
    }
    if let Some(run_id) = &args.run_id {
        config.run.run_id.clone_from(run_id);
    }
    if args.seed.is_some() {
        config.run.seed = args.seed;
    }
}

/// Summary of one run.
#[derive(Debug, Serialize)]
pub struct RunReport {
    pub run_id: String,
    pub window: RunWindow,
    pub dry_run: bool,
    pub executed: Vec<Phase>,
    /// Last phase that completed
    pub last_phase: Option<Phase>,
    pub workloads_created: usize,
    pub teardowns: Vec<TeardownReport>,
    pub images_removed: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_phase: Option<Phase>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RunReport {
    pub fn new(
        ctx: &RunContext,
        window: RunWindow,
        dry_run: bool,
        failure: Option<&ScenarioError>,
    ) -> Self {
        Self {
            run_id: ctx.run_id.to_string(),
            window,
            dry_run,
            executed: ctx.executed().to_vec(),
            last_phase: ctx.current_phase(),
            workloads_created: ctx.workloads_created(),
            teardowns: ctx.teardowns.clone(),
            images_removed: ctx.images_removed.clone(),
            failed_phase: failure.map(ScenarioError::phase),
            error: failure.map(ToString::to_string),
        }
    }
}

impl Render for RunReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        let title = if self.dry_run {
            "Scenario run (dry run)"
        } else {
            "Scenario run"
        };
        writeln!(w, "{}: {}", title, self.run_id.bold())?;
        writeln!(w, "  Window:     {}", self.window)?;

        let executed: Vec<&str> = self.executed.iter().map(|p| p.as_str()).collect();
        writeln!(
            w,
            "  Executed:   {}",
            if executed.is_empty() {
                "(none)".dimmed().to_string()
            } else {
                executed.join(" -> ")
            }
        )?;
        writeln!(
            w,
            "  Last phase: {}",
            self.last_phase.map_or("(none)", Phase::as_str)
        )?;
        writeln!(w, "  Workloads:  {}", self.workloads_created)?;

        if !self.teardowns.is_empty() {
            writeln!(w, "  Teardown:")?;
            for t in &self.teardowns {
                if t.resources.is_empty() {
                    continue;
                }
                writeln!(
                    w,
                    "    {:<10} {:<24} {:<26} deleted={} stripped={} vanished={}",
                    t.context, t.namespace, t.kind, t.deleted, t.finalizers_stripped, t.vanished
                )?;
            }
        }
        if !self.images_removed.is_empty() {
            writeln!(w, "  Block images removed: {}", self.images_removed.join(", "))?;
        }

        match (&self.failed_phase, &self.error) {
            (Some(phase), Some(error)) => {
                writeln!(w, "  Result:     {} at {}: {}", "FAILED".red().bold(), phase, error)?;
            }
            _ => writeln!(w, "  Result:     {}", "OK".green().bold())?,
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use drscenario_cluster::ClusterError;
    use drscenario_core::types::{NamespaceSet, RunId};

    use super::*;

    fn render(report: &RunReport) -> String {
        colored::control::set_override(false);
        let mut buf = Vec::new();
        report.render_text(&mut buf).expect("render should succeed");
        String::from_utf8(buf).expect("valid UTF-8")
    }

    #[test]
    fn overrides_replace_configured_values() {
        let mut config = ScenarioConfig::default();
        let args = RunArgs {
            start_at: Some("failover".to_owned()),
            stop_at: Some("relocate".to_owned()),
            run_id: Some("test-42".to_owned()),
            seed: Some(7),
            dry_run: true,
        };
        apply_overrides(&mut config, &args);
        assert_eq!(config.window(), RunWindow::new(Phase::Failover, Phase::Relocate));
        assert_eq!(config.run.run_id, "test-42");
        assert_eq!(config.run.seed, Some(7));
    }

    #[test]
    fn absent_flags_keep_configuration() {
        let mut config = ScenarioConfig::default();
        config.run.seed = Some(3);
        apply_overrides(&mut config, &RunArgs::default());
        assert_eq!(config.window(), RunWindow::default());
        assert_eq!(config.run.seed, Some(3));
    }

    #[test]
    fn report_text_lists_executed_phases() {
        let run_id = RunId::new("test-1");
        let namespaces = NamespaceSet::generate(&run_id, 1);
        let mut ctx = RunContext::new(run_id, namespaces, Some(0));
        ctx.complete(Phase::DeployApp);
        ctx.complete(Phase::EnableDr);

        let report = RunReport::new(&ctx, RunWindow::default(), false, None);
        let text = render(&report);
        assert!(text.contains("test-1"));
        assert!(text.contains("deploy-app -> enable-dr"));
        assert!(text.contains("Last phase: enable-dr"));
        assert!(text.contains("OK"));
    }

    #[test]
    fn failed_report_names_phase() {
        let run_id = RunId::new("test-1");
        let ctx = RunContext::new(run_id.clone(), NamespaceSet::generate(&run_id, 1), Some(0));
        let failure = ScenarioError::Cluster {
            phase: Phase::DeployApp,
            source: ClusterError::CommandFailed {
                command: "kubectl apply".to_owned(),
                status: "1".to_owned(),
                stderr: "denied".to_owned(),
            },
        };

        let report = RunReport::new(&ctx, RunWindow::default(), false, Some(&failure));
        assert_eq!(report.failed_phase, Some(Phase::DeployApp));
        assert_eq!(report.last_phase, None);

        let json = serde_json::to_value(&report).expect("report serializes");
        assert_eq!(json["failed_phase"], "deploy-app");
        assert!(json["last_phase"].is_null());

        let text = render(&report);
        assert!(text.contains("FAILED at deploy-app"));
    }
}
