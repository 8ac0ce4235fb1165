//! `drscenario phases` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use drscenario_core::config::ScenarioConfig;
use drscenario_core::phase::{Phase, RunWindow, should_run};

use crate::cli::{PhasesArgs, RunArgs};
use crate::commands::run::apply_overrides;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `phases` command.
pub async fn execute(
    args: PhasesArgs,
    config_path: Option<&Path>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let mut config = ScenarioConfig::load(config_path).await?;
    apply_overrides(
        &mut config,
        &RunArgs {
            start_at: args.start_at,
            stop_at: args.stop_at,
            ..RunArgs::default()
        },
    );

    let mut report = PhasesReport::new(config.window());
    report.warnings = config
        .unrecognized_phases()
        .into_iter()
        .map(|(field, value)| format!("{field} = '{value}' is not a phase, using 'start'"))
        .collect();
    writer.render(&report)?;
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct PhaseRow {
    pub phase: Phase,
    pub ordinal: usize,
    pub runs: bool,
}

/// Every phase with its window verdict.
#[derive(Debug, Serialize)]
pub struct PhasesReport {
    pub window: RunWindow,
    pub phases: Vec<PhaseRow>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl PhasesReport {
    pub fn new(window: RunWindow) -> Self {
        let phases = Phase::ALL
            .into_iter()
            .map(|phase| PhaseRow {
                phase,
                ordinal: phase.ordinal(),
                runs: should_run(phase, &window),
            })
            .collect();
        Self {
            window,
            phases,
            warnings: Vec::new(),
        }
    }
}

impl Render for PhasesReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Run window: {}", self.window.to_string().bold())?;
        for row in &self.phases {
            let verdict = if row.runs {
                "run".green()
            } else {
                "skip".dimmed()
            };
            writeln!(w, "  {} {:<12} {}", row.ordinal, row.phase.as_str(), verdict)?;
        }
        for warning in &self.warnings {
            writeln!(w, "{} {}", "warning:".yellow(), warning)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running(report: &PhasesReport) -> Vec<Phase> {
        report
            .phases
            .iter()
            .filter(|r| r.runs)
            .map(|r| r.phase)
            .collect()
    }

    #[test]
    fn default_window_runs_through_enable_dr() {
        let report = PhasesReport::new(RunWindow::default());
        assert_eq!(report.phases.len(), 8);
        assert_eq!(
            running(&report),
            [Phase::Start, Phase::DeployApp, Phase::EnableDr]
        );
    }

    #[test]
    fn inverted_window_runs_nothing() {
        let report = PhasesReport::new(RunWindow::new(Phase::End, Phase::Start));
        assert!(running(&report).is_empty());
    }

    #[test]
    fn text_marks_each_phase() {
        colored::control::set_override(false);
        let report = PhasesReport::new(RunWindow::new(Phase::Failover, Phase::Failover));
        let mut buf = Vec::new();
        report.render_text(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("3 failover     run"));
        assert!(text.contains("4 relocate     skip"));
    }
}
