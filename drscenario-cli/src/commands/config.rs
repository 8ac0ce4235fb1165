//! `drscenario config` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::info;

use drscenario_core::config::ScenarioConfig;

use crate::cli::{ConfigAction, ConfigArgs};
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

const SECTIONS: &str = "general, clusters, run, workloads, teardown, storage, kubectl, templates";

/// Execute the `config` command.
pub async fn execute(
    args: ConfigArgs,
    config_path: Option<&Path>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    match args.action {
        ConfigAction::Validate => execute_validate(config_path, writer).await,
        ConfigAction::Show { section } => execute_show(config_path, section, writer).await,
    }
}

fn source_name(config_path: Option<&Path>) -> String {
    config_path.map_or_else(
        || "(defaults + environment)".to_owned(),
        |p| p.display().to_string(),
    )
}

/// Loads and validates the configuration, reporting errors and lenient
/// phase-name fallbacks.
///
/// # Errors
///
/// Returns `CliError::Config` when the configuration is invalid.
async fn execute_validate(
    config_path: Option<&Path>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(source = %source_name(config_path), "validating configuration");

    let report = match ScenarioConfig::load(config_path).await {
        Ok(config) => ConfigValidationReport {
            source: source_name(config_path),
            valid: true,
            errors: Vec::new(),
            warnings: phase_warnings(&config),
        },
        Err(e) => ConfigValidationReport {
            source: source_name(config_path),
            valid: false,
            errors: vec![e.to_string()],
            warnings: Vec::new(),
        },
    };

    writer.render(&report)?;

    if !report.valid {
        return Err(CliError::Config("configuration is invalid".to_owned()));
    }
    Ok(())
}

fn phase_warnings(config: &ScenarioConfig) -> Vec<String> {
    config
        .unrecognized_phases()
        .into_iter()
        .map(|(field, value)| format!("{field}: unknown phase '{value}', falls back to 'start'"))
        .collect()
}

/// Shows the effective configuration (file + env overrides + defaults).
async fn execute_show(
    config_path: Option<&Path>,
    section: Option<String>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    info!(source = %source_name(config_path), "loading configuration");
    let config = ScenarioConfig::load(config_path).await?;
    let report = build_config_report(&config, source_name(config_path), section)?;
    writer.render(&report)?;
    Ok(())
}

/// Serializes the whole configuration or a single section.
pub fn build_config_report(
    config: &ScenarioConfig,
    source: String,
    section: Option<String>,
) -> Result<ConfigReport, CliError> {
    let (config_toml, effective) = match section.as_deref() {
        None => serialize(config)?,
        Some("general") => serialize(&config.general)?,
        Some("clusters") => serialize(&config.clusters)?,
        Some("run") => serialize(&config.run)?,
        Some("workloads") => serialize(&config.workloads)?,
        Some("teardown") => serialize(&config.teardown)?,
        Some("storage") => serialize(&config.storage)?,
        Some("kubectl") => serialize(&config.kubectl)?,
        Some("templates") => serialize(&config.templates)?,
        Some(other) => {
            return Err(CliError::Command(format!(
                "unknown section: {other} (expected: {SECTIONS})"
            )));
        }
    };
    Ok(ConfigReport {
        source,
        section,
        config_toml,
        effective,
    })
}

fn serialize<T: Serialize>(value: &T) -> Result<(String, serde_json::Value), CliError> {
    let text = toml::to_string_pretty(value)
        .map_err(|e| CliError::Command(format!("toml serialization failed: {e}")))?;
    Ok((text, serde_json::to_value(value)?))
}

/// Configuration display report.
///
/// `config_toml` is used for text output only; JSON output carries `effective`.
#[derive(Serialize)]
pub struct ConfigReport {
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip)]
    pub config_toml: String,
    pub effective: serde_json::Value,
}

impl Render for ConfigReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        if let Some(ref section) = self.section {
            let section_label = format!("[{section}]");
            writeln!(
                w,
                "Configuration {} (source: {})",
                section_label.bold(),
                self.source
            )?;
        } else {
            writeln!(w, "Configuration (source: {})", self.source.bold())?;
        }

        writeln!(w)?;
        write!(w, "{}", self.config_toml)?;
        Ok(())
    }
}

/// Configuration validation report.
#[derive(Serialize)]
pub struct ConfigValidationReport {
    pub source: String,
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Render for ConfigValidationReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        use colored::Colorize;

        writeln!(w, "Config Validation: {}", self.source.bold())?;
        if self.valid {
            writeln!(w, "  Result: {}", "VALID".green().bold())?;
        } else {
            writeln!(w, "  Result: {}", "INVALID".red().bold())?;
            for error in &self.errors {
                writeln!(w, "  - {error}")?;
            }
        }
        for warning in &self.warnings {
            writeln!(w, "  {} {warning}", "warning:".yellow())?;
        }
        Ok(())
    }
}
