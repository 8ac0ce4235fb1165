//! Scenario orchestrator.
//!
//! [`Scenario::run`] walks [`Phase::ALL`] in order, executes every step the
//! run window admits, and stops right after the window's last phase.
//!
//! | Phase        | Cluster(s)            | Effect                                              |
//! |--------------|-----------------------|-----------------------------------------------------|
//! | `deploy-app` | preferred, failover   | namespaces on both; workloads + claims on preferred |
//! | `enable-dr`  | hub                   | DRPC, placement, decision; decision status patch    |
//! | `failover`   | hub                   | DRPC re-apply, `spec.action = Failover`             |
//! | `relocate`   | hub                   | DRPC re-apply, `spec.action = Relocate`             |
//! | `disable-dr` | hub                   | delete + unblock hub objects and manifestworks      |
//! | `delete-app` | preferred, failover   | teardown per kind, namespaces, block image purge    |

pub mod context;
pub mod storage;

use std::sync::Arc;

use drscenario_cluster::{
    ClusterClient, ClusterError, DeleteOptions, Subresource, TeardownEngine,
};
use drscenario_core::config::ScenarioConfig;
use drscenario_core::phase::{Phase, RunWindow, should_run};
use drscenario_core::types::{ResourceRef, RunId};
use drscenario_manifest::{ManifestError, ManifestRenderer, Substitutions, Template, parse_header};
use serde_json::json;
use tracing::{debug, info, warn};

pub use context::RunContext;

/// A phase failed; the run stops there.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    #[error("phase {phase} failed: {source}")]
    Cluster {
        phase: Phase,
        #[source]
        source: ClusterError,
    },

    #[error("phase {phase} failed: {source}")]
    Manifest {
        phase: Phase,
        #[source]
        source: ManifestError,
    },
}

impl ScenarioError {
    pub fn phase(&self) -> Phase {
        match self {
            Self::Cluster { phase, .. } | Self::Manifest { phase, .. } => *phase,
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum StepError {
    #[error(transparent)]
    Cluster(#[from] ClusterError),
    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

impl StepError {
    fn in_phase(self, phase: Phase) -> ScenarioError {
        match self {
            Self::Cluster(source) => ScenarioError::Cluster { phase, source },
            Self::Manifest(source) => ScenarioError::Manifest { phase, source },
        }
    }
}

/// DR scenario bound to one cluster client and configuration.
pub struct Scenario<C: ClusterClient> {
    client: Arc<C>,
    renderer: ManifestRenderer,
    teardown: TeardownEngine<C>,
    config: ScenarioConfig,
}

impl<C: ClusterClient> Scenario<C> {
    pub fn new(client: Arc<C>, renderer: ManifestRenderer, config: ScenarioConfig) -> Self {
        let teardown = TeardownEngine::from_config(Arc::clone(&client), &config.teardown);
        Self {
            client,
            renderer,
            teardown,
            config,
        }
    }

    /// Executes every step phase inside `window`, in order.
    ///
    /// Returns after the window's stop phase. Completed phases are recorded in
    /// `ctx`; on error the failing phase is not.
    pub async fn run(&self, ctx: &mut RunContext, window: RunWindow) -> Result<(), ScenarioError> {
        if window.is_empty() {
            warn!(window = %window, "run window is empty, nothing to do");
            return Ok(());
        }
        info!(run_id = %ctx.run_id, window = %window, "starting scenario");

        for phase in Phase::ALL {
            if !should_run(phase, &window) {
                debug!(phase = %phase, "phase outside window, skipping");
                continue;
            }
            if phase.is_step() {
                info!(phase = %phase, "executing phase");
                self.execute(phase, ctx)
                    .await
                    .map_err(|e| e.in_phase(phase))?;
                ctx.complete(phase);
                info!(phase = %phase, "phase completed");
            }
            if phase == window.stop {
                break;
            }
        }

        info!(
            run_id = %ctx.run_id,
            last_phase = ?ctx.current_phase(),
            "scenario finished"
        );
        Ok(())
    }

    async fn execute(&self, phase: Phase, ctx: &mut RunContext) -> Result<(), StepError> {
        match phase {
            Phase::Start | Phase::End => Ok(()),
            Phase::DeployApp => self.deploy_app(ctx).await,
            Phase::EnableDr => self.enable_dr(ctx).await,
            Phase::Failover => self.request_action(ctx, "Failover").await,
            Phase::Relocate => self.request_action(ctx, "Relocate").await,
            Phase::DisableDr => self.disable_dr(ctx).await,
            Phase::DeleteApp => self.delete_app(ctx).await,
        }
    }

    fn hub(&self) -> &str {
        &self.config.clusters.hub
    }

    fn preferred(&self) -> &str {
        &self.config.clusters.preferred
    }

    fn failover(&self) -> &str {
        &self.config.clusters.failover
    }

    fn members(&self) -> [&str; 2] {
        [self.preferred(), self.failover()]
    }

    fn substitutions(&self, ctx: &RunContext) -> Substitutions {
        Substitutions::new(
            ctx.run_id.clone(),
            &self.config.run.ops_namespace,
            self.preferred(),
            self.failover(),
            &self.config.run.dr_policy,
            ctx.namespaces.clone(),
        )
    }

    async fn deploy_app(&self, ctx: &mut RunContext) -> Result<(), StepError> {
        let subs = self.substitutions(ctx);

        for ns in ctx.namespaces.iter() {
            let manifest = self
                .renderer
                .render(Template::Namespace, &subs.for_namespace(ns))
                .await?;
            for cluster in self.members() {
                self.client.apply(&manifest, cluster).await?;
                info!(cluster, namespace = ns, "namespace created");
            }
        }

        let classes = [
            (
                self.config.workloads.rbd_storage_class.as_str(),
                self.config.workloads.rbd_count,
            ),
            (
                self.config.workloads.cephfs_storage_class.as_str(),
                self.config.workloads.cephfs_count,
            ),
        ];
        for (storage_class, count) in classes {
            for _ in 0..count {
                let Some(ns) = ctx.pick_namespace() else {
                    warn!("no protected namespaces, skipping workloads");
                    return Ok(());
                };
                let name = RunId::workload_name(&ns, ctx.next_workload_index());
                let workload = subs.for_workload(&name, storage_class, &ns);

                let deployment = self.renderer.render(Template::Deployment, &workload).await?;
                let claim = self.renderer.render(Template::Pvc, &workload).await?;
                self.client.apply(&deployment, self.preferred()).await?;
                self.client.apply(&claim, self.preferred()).await?;
                info!(
                    cluster = self.preferred(),
                    namespace = %ns,
                    workload = %name,
                    storage_class,
                    "workload deployed"
                );
            }
        }
        Ok(())
    }

    async fn enable_dr(&self, ctx: &RunContext) -> Result<(), StepError> {
        let subs = self.substitutions(ctx);
        let mut decision = None;

        for template in [Template::Drpc, Template::Placement, Template::PlacementDecision] {
            let manifest = self.renderer.render(template, &subs).await?;
            self.client.apply(&manifest, self.hub()).await?;
            info!(cluster = self.hub(), template = %template, "applied");
            if template == Template::PlacementDecision {
                decision = Some(parse_header(&manifest)?.to_ref(self.hub()));
            }
        }

        if let Some(decision) = decision {
            let preferred = self.preferred();
            let patch = json!({
                "status": {
                    "decisions": [{ "clusterName": preferred, "reason": preferred }]
                }
            });
            self.client
                .patch(&decision, &patch, Some(Subresource::Status))
                .await?;
            info!(resource = %decision, cluster = preferred, "placement decision set");
        }
        Ok(())
    }

    /// Re-applies the DR placement control and sets `spec.action`.
    async fn request_action(&self, ctx: &RunContext, action: &str) -> Result<(), StepError> {
        let manifest = self
            .renderer
            .render(Template::Drpc, &self.substitutions(ctx))
            .await?;
        self.client.apply(&manifest, self.hub()).await?;

        let drpc = parse_header(&manifest)?.to_ref(self.hub());
        self.client
            .patch(&drpc, &json!({ "spec": { "action": action } }), None)
            .await?;
        info!(resource = %drpc, action, "action requested");
        Ok(())
    }

    async fn disable_dr(&self, ctx: &RunContext) -> Result<(), StepError> {
        let subs = self.substitutions(ctx);

        for template in [Template::Drpc, Template::Placement, Template::PlacementDecision] {
            let manifest = self.renderer.render(template, &subs).await?;
            let resource = parse_header(&manifest)?.to_ref(self.hub());
            self.client
                .delete(&resource, DeleteOptions::non_blocking())
                .await?;
            match self.client.remove_finalizers(&resource).await {
                Ok(()) => {}
                Err(e) if e.is_not_found() => debug!(resource = %resource, "already gone"),
                Err(e) => return Err(e.into()),
            }
            info!(resource = %resource, "removed");
        }

        let work = ctx
            .run_id
            .namespace_manifestwork(&self.config.run.ops_namespace);
        for cluster in self.members() {
            let resource = ResourceRef::namespaced(self.hub(), "manifestwork", cluster, &work);
            self.client
                .delete(&resource, DeleteOptions::non_blocking())
                .await?;
            info!(resource = %resource, "manifestwork removed");
        }
        Ok(())
    }

    async fn delete_app(&self, ctx: &mut RunContext) -> Result<(), StepError> {
        for cluster in self.members() {
            for ns in ctx.namespaces.iter() {
                for kind in &self.config.teardown.kinds {
                    let report = self.teardown.run(cluster, ns, kind).await?;
                    ctx.teardowns.push(report);
                }
            }
        }

        for cluster in self.members() {
            for ns in ctx.namespaces.iter() {
                let resource = ResourceRef::cluster_scoped(cluster, "namespace", ns);
                self.client
                    .delete(&resource, DeleteOptions::blocking())
                    .await?;
                info!(cluster, namespace = ns, "namespace deleted");
            }
        }

        if self.config.storage.verify_volumes {
            let removed = storage::purge_block_images(
                self.client.as_ref(),
                self.preferred(),
                &self.config.storage,
            )
            .await?;
            ctx.images_removed.extend(removed);
        } else {
            debug!("volume verification disabled");
        }
        Ok(())
    }
}
