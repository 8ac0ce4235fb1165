//! Scenario configuration: `drscenario.toml` parsing and environment overrides.
//!
//! [`ScenarioConfig`] holds every setting a run needs. Each crate reads only
//! its own section.
//!
//! # Loading precedence
//! 1. CLI flags (applied by the binary)
//! 2. Environment variables (`HUB`, `DR1`, `START_AT`, ...)
//! 3. Config file (`drscenario.toml`, optional)
//! 4. Defaults (`Default` impls)
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), drscenario_core::error::DrError> {
//! use drscenario_core::config::ScenarioConfig;
//!
//! // defaults + environment
//! let config = ScenarioConfig::load(None).await?;
//!
//! // directly from a TOML string
//! let config = ScenarioConfig::parse("[workloads]\nrbd_count = 2")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, DrError};
use crate::phase::{Phase, RunWindow};
use crate::types::{NamespaceSet, RunId};

/// Upper bound for the teardown grace and settle intervals.
const MAX_TEARDOWN_INTERVAL_MS: u64 = 60_000;

/// Value of `run.run_id` that asks for a freshly generated identifier.
pub const AUTO_RUN_ID: &str = "auto";

/// Complete scenario configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub clusters: ClustersConfig,
    #[serde(default)]
    pub run: RunConfig,
    #[serde(default)]
    pub workloads: WorkloadsConfig,
    #[serde(default)]
    pub teardown: TeardownConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub kubectl: KubectlConfig,
    #[serde(default)]
    pub templates: TemplatesConfig,
}

impl ScenarioConfig {
    /// Loads the configuration: optional file, then environment overrides,
    /// then cluster defaults, then validation.
    pub async fn load(path: Option<&Path>) -> Result<Self, DrError> {
        let mut config = match path {
            Some(path) => Self::from_file(path).await?,
            None => Self::default(),
        };
        config.apply_env_overrides();
        config.resolve_defaults();
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a TOML file without applying overrides.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, DrError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DrError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                DrError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// Parses a TOML string. Missing sections and fields take their defaults.
    pub fn parse(toml_str: &str) -> Result<Self, DrError> {
        toml::from_str(toml_str).map_err(|e| {
            DrError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// Applies environment variable overrides.
    ///
    /// The scenario keys keep the names operators already export for this
    /// test (`HUB`, `DR1`, `DEPLOYMENT_RBD_COUNT`, ...). Counts that fail to
    /// parse are ignored with a warning and keep their previous value.
    pub fn apply_env_overrides(&mut self) {
        override_string(&mut self.general.log_level, "DRSCENARIO_LOG_LEVEL");
        override_string(&mut self.general.log_format, "DRSCENARIO_LOG_FORMAT");

        override_string(&mut self.clusters.hub, "HUB");
        override_string(&mut self.clusters.dr1, "DR1");
        override_string(&mut self.clusters.dr2, "DR2");
        override_string(&mut self.clusters.preferred, "PREFERRED_CLUSTER");
        override_string(&mut self.clusters.failover, "FAILOVER_CLUSTER");

        override_string(&mut self.run.run_id, "TESTID");
        override_string(&mut self.run.start_at, "START_AT");
        override_string(&mut self.run.stop_at, "STOP_AT");
        override_usize(&mut self.run.namespaces_count, "NAMESPACES_COUNT");
        override_string(&mut self.run.ops_namespace, "RAMEN_OPS_NAMESPACE");

        override_usize(&mut self.workloads.rbd_count, "DEPLOYMENT_RBD_COUNT");
        override_usize(&mut self.workloads.cephfs_count, "DEPLOYMENT_CEPHFS_COUNT");

        override_u64(
            &mut self.teardown.grace_period_ms,
            "DRSCENARIO_TEARDOWN_GRACE_PERIOD_MS",
        );
        override_u64(
            &mut self.teardown.settle_interval_ms,
            "DRSCENARIO_TEARDOWN_SETTLE_INTERVAL_MS",
        );

        override_string(&mut self.kubectl.binary, "DRSCENARIO_KUBECTL");
        override_string(&mut self.templates.dir, "DRSCENARIO_TEMPLATES_DIR");
    }

    /// Fills in settings whose default depends on other settings.
    ///
    /// An empty preferred/failover cluster means the first/second member
    /// cluster.
    pub fn resolve_defaults(&mut self) {
        if self.clusters.preferred.is_empty() {
            self.clusters.preferred = self.clusters.dr1.clone();
        }
        if self.clusters.failover.is_empty() {
            self.clusters.failover = self.clusters.dr2.clone();
        }
    }

    /// Validates the configuration.
    ///
    /// Phase names are deliberately not checked here; see
    /// [`ScenarioConfig::unrecognized_phases`].
    pub fn validate(&self) -> Result<(), DrError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        for (field, value) in [
            ("clusters.hub", &self.clusters.hub),
            ("clusters.dr1", &self.clusters.dr1),
            ("clusters.dr2", &self.clusters.dr2),
        ] {
            if value.is_empty() {
                return Err(invalid(field, "cluster context must not be empty".to_owned()));
            }
        }

        if !self.clusters.preferred.is_empty()
            && self.clusters.preferred == self.clusters.failover
        {
            return Err(invalid(
                "clusters.failover",
                "failover cluster must differ from the preferred cluster".to_owned(),
            ));
        }

        if self.run.run_id.is_empty() {
            return Err(invalid("run.run_id", "must not be empty".to_owned()));
        }

        if self.run.namespaces_count == 0 {
            return Err(invalid("run.namespaces_count", "must be at least 1".to_owned()));
        }

        if self.run.ops_namespace.is_empty() {
            return Err(invalid("run.ops_namespace", "must not be empty".to_owned()));
        }

        if self.teardown.kinds.is_empty() {
            return Err(invalid(
                "teardown.kinds",
                "at least one resource kind is required".to_owned(),
            ));
        }

        if self.teardown.grace_period_ms > MAX_TEARDOWN_INTERVAL_MS {
            return Err(invalid(
                "teardown.grace_period_ms",
                format!("must be 0-{MAX_TEARDOWN_INTERVAL_MS}"),
            ));
        }

        if self.teardown.settle_interval_ms > MAX_TEARDOWN_INTERVAL_MS {
            return Err(invalid(
                "teardown.settle_interval_ms",
                format!("must be 0-{MAX_TEARDOWN_INTERVAL_MS}"),
            ));
        }

        if self.kubectl.binary.is_empty() {
            return Err(invalid("kubectl.binary", "must not be empty".to_owned()));
        }

        Ok(())
    }

    /// Configured phase names that the lenient parser would replace with
    /// `start`, as `(field, value)` pairs.
    pub fn unrecognized_phases(&self) -> Vec<(&'static str, String)> {
        [
            ("run.start_at", &self.run.start_at),
            ("run.stop_at", &self.run.stop_at),
        ]
        .into_iter()
        .filter(|(_, value)| value.parse::<Phase>().is_err())
        .map(|(field, value)| (field, value.clone()))
        .collect()
    }

    /// The run window built from `run.start_at` / `run.stop_at`.
    pub fn window(&self) -> RunWindow {
        RunWindow::from_names(&self.run.start_at, &self.run.stop_at)
    }

    /// The run identifier, generating one when `run.run_id` is `"auto"`.
    pub fn run_id(&self) -> RunId {
        if self.run.run_id == AUTO_RUN_ID {
            RunId::generate()
        } else {
            RunId::new(self.run.run_id.clone())
        }
    }

    /// The protected namespace set for `run_id`.
    pub fn namespaces(&self, run_id: &RunId) -> NamespaceSet {
        NamespaceSet::generate(run_id, self.run.namespaces_count)
    }
}

fn invalid(field: &str, reason: String) -> DrError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// trace, debug, info, warn, error
    pub log_level: String,
    /// json, pretty
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
        }
    }
}

/// Cluster contexts taking part in the scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClustersConfig {
    /// Control (hub) cluster
    pub hub: String,
    /// First member cluster
    pub dr1: String,
    /// Second member cluster
    pub dr2: String,
    /// Cluster the workloads start on; empty means `dr1`
    pub preferred: String,
    /// Cluster to fail over to; empty means `dr2`
    pub failover: String,
}

impl Default for ClustersConfig {
    fn default() -> Self {
        Self {
            hub: "rdr-hub".to_owned(),
            dr1: "rdr-dr1".to_owned(),
            dr2: "rdr-dr2".to_owned(),
            preferred: String::new(),
            failover: String::new(),
        }
    }
}

/// Run identity and phase window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Run identifier, or `"auto"`
    pub run_id: String,
    /// First phase of the window
    pub start_at: String,
    /// Last phase of the window (inclusive)
    pub stop_at: String,
    /// Size of the protected namespace set
    pub namespaces_count: usize,
    /// Hub namespace holding the DR-protection objects
    pub ops_namespace: String,
    /// DR policy referenced by the DR-protection resource
    pub dr_policy: String,
    /// Seed for namespace assignment; random when unset
    pub seed: Option<u64>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            run_id: "test-1".to_owned(),
            start_at: Phase::Start.as_str().to_owned(),
            stop_at: Phase::EnableDr.as_str().to_owned(),
            namespaces_count: 1,
            ops_namespace: "ramen-ops".to_owned(),
            dr_policy: "dr-policy".to_owned(),
            seed: None,
        }
    }
}

/// Storage-backed workloads to deploy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadsConfig {
    /// Workloads backed by the block storage class
    pub rbd_count: usize,
    /// Workloads backed by the shared filesystem storage class
    pub cephfs_count: usize,
    pub rbd_storage_class: String,
    pub cephfs_storage_class: String,
}

impl Default for WorkloadsConfig {
    fn default() -> Self {
        Self {
            rbd_count: 1,
            cephfs_count: 1,
            rbd_storage_class: "rook-ceph-block".to_owned(),
            cephfs_storage_class: "rook-cephfs".to_owned(),
        }
    }
}

/// Teardown engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TeardownConfig {
    /// Wait between the delete burst and the re-list (ms)
    pub grace_period_ms: u64,
    /// Wait before each finalizer strip (ms)
    pub settle_interval_ms: u64,
    /// Kinds force-cleaned in every namespace before namespace deletion
    pub kinds: Vec<String>,
}

impl TeardownConfig {
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn settle_interval(&self) -> Duration {
        Duration::from_millis(self.settle_interval_ms)
    }
}

impl Default for TeardownConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: 1_000,
            settle_interval_ms: 100,
            kinds: vec![
                "deployment".to_owned(),
                "persistentvolumeclaim".to_owned(),
                "volumereplicationgroup".to_owned(),
            ],
        }
    }
}

/// Storage residue check run at the end of `delete-app`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Whether to check for leftover block images
    pub verify_volumes: bool,
    /// Namespace of the storage toolbox pod
    pub toolbox_namespace: String,
    /// Label selector of the storage toolbox pod
    pub toolbox_selector: String,
    /// Block pool to inspect
    pub pool: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            verify_volumes: true,
            toolbox_namespace: "rook-ceph".to_owned(),
            toolbox_selector: "app=rook-ceph-tools".to_owned(),
            pool: "replicapool".to_owned(),
        }
    }
}

/// Cluster CLI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KubectlConfig {
    /// Path or name of the kubectl binary
    pub binary: String,
}

impl Default for KubectlConfig {
    fn default() -> Self {
        Self {
            binary: "kubectl".to_owned(),
        }
    }
}

/// Manifest template source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplatesConfig {
    /// Directory with `<template>.yaml` overrides; empty uses the built-in set
    pub dir: String,
}

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        if !val.is_empty() {
            *target = val;
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.trim().parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.trim().parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
