//! `drscenario render` command handler

use std::io::Write;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use drscenario_core::config::ScenarioConfig;
use drscenario_core::types::RunId;
use drscenario_manifest::{ManifestRenderer, Substitutions, Template, TemplateSource};

use crate::cli::RenderArgs;
use crate::error::CliError;
use crate::output::{OutputWriter, Render};

/// Execute the `render` command.
pub async fn execute(
    args: RenderArgs,
    config_path: Option<&Path>,
    writer: &OutputWriter,
) -> Result<(), CliError> {
    let config = ScenarioConfig::load(config_path).await?;
    let report = render_template(&config, &args).await?;
    writer.render(&report)?;
    Ok(())
}

/// Renders `args.template` with the configured substitutions, filling unset
/// workload values from the first protected namespace.
pub async fn render_template(
    config: &ScenarioConfig,
    args: &RenderArgs,
) -> Result<RenderReport, CliError> {
    let template: Template = args.template.parse()?;
    let run_id = config.run_id();
    let namespaces = config.namespaces(&run_id);

    let namespace = args
        .namespace
        .clone()
        .or_else(|| namespaces.iter().next().map(str::to_owned))
        .unwrap_or_default();
    let name = args
        .name
        .clone()
        .unwrap_or_else(|| RunId::workload_name(&namespace, 0));
    let storage_class = args
        .storage_class
        .clone()
        .unwrap_or_else(|| config.workloads.rbd_storage_class.clone());
    debug!(template = %template, namespace = %namespace, name = %name, "rendering");

    let subs = Substitutions::new(
        run_id,
        &config.run.ops_namespace,
        &config.clusters.preferred,
        &config.clusters.failover,
        &config.run.dr_policy,
        namespaces,
    )
    .for_workload(&name, &storage_class, &namespace);

    let renderer = ManifestRenderer::new(TemplateSource::from_dir(&config.templates.dir));
    Ok(RenderReport {
        template: template.to_string(),
        manifest: renderer.render(template, &subs).await?,
    })
}

/// A rendered manifest.
#[derive(Debug, Serialize)]
pub struct RenderReport {
    pub template: String,
    pub manifest: String,
}

impl Render for RenderReport {
    fn render_text(&self, w: &mut dyn Write) -> std::io::Result<()> {
        write!(w, "{}", self.manifest)?;
        if !self.manifest.ends_with('\n') {
            writeln!(w)?;
        }
        Ok(())
    }
}
