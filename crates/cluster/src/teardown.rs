//! Resilient teardown of finalizer-protected resources.
//!
//! For one `(cluster, namespace, kind)` the engine:
//!
//! 1. lists the objects (nothing listed means nothing to do),
//! 2. issues a non-blocking delete for each of them,
//! 3. waits the grace period,
//! 4. lists again; whatever is still there is held by a finalizer,
//! 5. for each held object waits the settle interval, checks it still exists,
//!    and clears its finalizers.
//!
//! Each object moves through [`TeardownState`]:
//!
//! ```text
//! Deleting ──(gone after grace)──────────────────────► Gone
//!    │                                                  ▲
//!    └──(still listed)──► BlockedByFinalizer ──(strip)──┘
//! ```
//!
//! "Not found" at any point counts as gone. Every other cluster error aborts
//! the teardown.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use drscenario_core::config::TeardownConfig;
use drscenario_core::types::ResourceRef;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::client::{ClusterClient, DeleteOptions};
use crate::error::ClusterError;

/// Where a single object is in its teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TeardownState {
    /// Delete issued, outcome not yet observed
    Deleting,
    /// Still present after the grace period
    BlockedByFinalizer,
    /// No longer present
    Gone,
}

impl TeardownState {
    /// Next state after observing whether the object is still present.
    pub fn observe(self, present: bool) -> Self {
        match (self, present) {
            (_, false) | (Self::Gone, _) => Self::Gone,
            (Self::Deleting, true) | (Self::BlockedByFinalizer, true) => Self::BlockedByFinalizer,
        }
    }
}

impl fmt::Display for TeardownState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deleting => f.write_str("deleting"),
            Self::BlockedByFinalizer => f.write_str("blocked_by_finalizer"),
            Self::Gone => f.write_str("gone"),
        }
    }
}

/// Outcome of one `(cluster, namespace, kind)` teardown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeardownReport {
    pub context: String,
    pub namespace: String,
    pub kind: String,
    /// Objects a delete was issued for
    pub deleted: usize,
    /// Listed objects that were already gone when their delete arrived
    pub already_gone: usize,
    /// Objects whose finalizers were cleared
    pub finalizers_stripped: usize,
    /// Blocked objects that disappeared before their finalizers were cleared
    pub vanished: usize,
    /// Final state per object
    pub resources: BTreeMap<String, TeardownState>,
}

impl TeardownReport {
    fn new(context: &str, namespace: &str, kind: &str) -> Self {
        Self {
            context: context.to_owned(),
            namespace: namespace.to_owned(),
            kind: kind.to_owned(),
            deleted: 0,
            already_gone: 0,
            finalizers_stripped: 0,
            vanished: 0,
            resources: BTreeMap::new(),
        }
    }

    /// True when every tracked object reached [`TeardownState::Gone`].
    pub fn converged(&self) -> bool {
        self.resources.values().all(|s| *s == TeardownState::Gone)
    }
}

/// Runs the teardown protocol against a [`ClusterClient`].
pub struct TeardownEngine<C: ClusterClient> {
    client: Arc<C>,
    grace_period: Duration,
    settle_interval: Duration,
}

impl<C: ClusterClient> TeardownEngine<C> {
    pub fn new(client: Arc<C>, grace_period: Duration, settle_interval: Duration) -> Self {
        Self {
            client,
            grace_period,
            settle_interval,
        }
    }

    pub fn from_config(client: Arc<C>, config: &TeardownConfig) -> Self {
        Self::new(client, config.grace_period(), config.settle_interval())
    }

    /// Removes every object of `kind` in `namespace` on cluster `context`.
    pub async fn run(
        &self,
        context: &str,
        namespace: &str,
        kind: &str,
    ) -> Result<TeardownReport, ClusterError> {
        let mut report = TeardownReport::new(context, namespace, kind);

        let names = self.client.list(context, kind, namespace).await?;
        if names.is_empty() {
            debug!(context, namespace, kind, "nothing to tear down");
            return Ok(report);
        }

        info!(context, namespace, kind, count = names.len(), "deleting resources");
        for name in &names {
            let resource = ResourceRef::namespaced(context, kind, namespace, name);
            match self
                .client
                .delete(&resource, DeleteOptions::non_blocking())
                .await
            {
                Ok(()) => {
                    report.deleted += 1;
                    report.resources.insert(name.clone(), TeardownState::Deleting);
                }
                Err(e) if e.is_not_found() => {
                    debug!(resource = %resource, "already gone");
                    report.already_gone += 1;
                    report.resources.insert(name.clone(), TeardownState::Gone);
                }
                Err(e) => return Err(e),
            }
        }

        tokio::time::sleep(self.grace_period).await;

        let remaining = self.client.list(context, kind, namespace).await?;
        for (name, state) in report.resources.iter_mut() {
            *state = state.observe(remaining.contains(name));
        }

        let blocked: Vec<String> = report
            .resources
            .iter()
            .filter(|(_, s)| **s == TeardownState::BlockedByFinalizer)
            .map(|(n, _)| n.clone())
            .collect();
        if blocked.is_empty() {
            info!(context, namespace, kind, "all resources deleted");
            return Ok(report);
        }

        warn!(
            context,
            namespace,
            kind,
            count = blocked.len(),
            "resources blocked by finalizers"
        );
        for name in blocked {
            let resource = ResourceRef::namespaced(context, kind, namespace, &name);
            let outcome = self.strip(&resource).await?;
            match outcome {
                Strip::Stripped => report.finalizers_stripped += 1,
                Strip::Vanished => report.vanished += 1,
            }
            report.resources.insert(name, TeardownState::Gone);
        }

        info!(
            context,
            namespace,
            kind,
            stripped = report.finalizers_stripped,
            vanished = report.vanished,
            "teardown converged"
        );
        Ok(report)
    }

    async fn strip(&self, resource: &ResourceRef) -> Result<Strip, ClusterError> {
        tokio::time::sleep(self.settle_interval).await;

        if !self.client.exists(resource).await? {
            debug!(resource = %resource, "vanished before finalizer removal");
            return Ok(Strip::Vanished);
        }

        match self.client.remove_finalizers(resource).await {
            Ok(()) => {
                info!(resource = %resource, "finalizers removed");
                Ok(Strip::Stripped)
            }
            Err(e) if e.is_not_found() => Ok(Strip::Vanished),
            Err(e) => Err(e),
        }
    }
}

enum Strip {
    Stripped,
    Vanished,
}
