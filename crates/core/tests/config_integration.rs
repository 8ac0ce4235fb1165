//! drscenario.toml integration tests
//!
//! - drscenario.toml.example parses and validates
//! - file loading and missing-file errors
//! - environment variable precedence

use std::fs;

use drscenario_core::config::ScenarioConfig;
use drscenario_core::error::{ConfigError, DrError};
use drscenario_core::phase::Phase;
use serial_test::serial;
use tempfile::TempDir;

const SCENARIO_ENV_KEYS: [&str; 10] = [
    "HUB",
    "DR1",
    "DR2",
    "PREFERRED_CLUSTER",
    "FAILOVER_CLUSTER",
    "START_AT",
    "STOP_AT",
    "DEPLOYMENT_RBD_COUNT",
    "DEPLOYMENT_CEPHFS_COUNT",
    "NAMESPACES_COUNT",
];

fn clear_scenario_env() {
    for key in SCENARIO_ENV_KEYS {
        // SAFETY: every test touching these keys is #[serial].
        unsafe { std::env::remove_var(key) };
    }
}

#[test]
fn example_config_parses_and_validates() {
    let content = include_str!("../../../drscenario.toml.example");
    let mut config = ScenarioConfig::parse(content).expect("example config should parse");
    config.resolve_defaults();
    config.validate().expect("example config should validate");

    assert_eq!(config.clusters.hub, "rdr-hub");
    assert_eq!(config.clusters.preferred, "rdr-dr1");
    assert_eq!(config.clusters.failover, "rdr-dr2");
    assert_eq!(config.run.ops_namespace, "ramen-ops");
    assert_eq!(config.storage.pool, "replicapool");
    assert!(config.unrecognized_phases().is_empty());
}

#[tokio::test]
async fn from_file_reports_missing_file() {
    let dir = TempDir::new().expect("should create temp dir");
    let err = ScenarioConfig::from_file(dir.path().join("absent.toml"))
        .await
        .expect_err("missing file should fail");
    assert!(matches!(
        err,
        DrError::Config(ConfigError::FileNotFound { .. })
    ));
}

#[tokio::test]
#[serial]
async fn load_applies_file_then_env() {
    clear_scenario_env();
    let dir = TempDir::new().expect("should create temp dir");
    let path = dir.path().join("drscenario.toml");
    fs::write(
        &path,
        r#"
[clusters]
hub = "file-hub"

[workloads]
rbd_count = 5
"#,
    )
    .expect("should write config");

    // SAFETY: test is #[serial].
    unsafe {
        std::env::set_var("HUB", "env-hub");
        std::env::set_var("DEPLOYMENT_CEPHFS_COUNT", "0");
        std::env::set_var("STOP_AT", "deleteapp");
    }

    let config = ScenarioConfig::load(Some(&path)).await.expect("should load");
    clear_scenario_env();

    assert_eq!(config.clusters.hub, "env-hub");
    assert_eq!(config.workloads.rbd_count, 5);
    assert_eq!(config.workloads.cephfs_count, 0);
    assert_eq!(config.window().stop, Phase::DeleteApp);
}

#[tokio::test]
#[serial]
async fn load_without_file_uses_defaults() {
    clear_scenario_env();
    let config = ScenarioConfig::load(None).await.expect("defaults should load");
    assert_eq!(config.clusters.preferred, "rdr-dr1");
    assert_eq!(config.clusters.failover, "rdr-dr2");
    assert_eq!(config.window().start, Phase::Start);
    assert_eq!(config.window().stop, Phase::EnableDr);
}

#[tokio::test]
#[serial]
async fn preferred_cluster_defaults_follow_env_member_clusters() {
    clear_scenario_env();
    // SAFETY: test is #[serial].
    unsafe {
        std::env::set_var("DR1", "east");
        std::env::set_var("DR2", "west");
    }
    let config = ScenarioConfig::load(None).await.expect("should load");
    clear_scenario_env();

    assert_eq!(config.clusters.preferred, "east");
    assert_eq!(config.clusters.failover, "west");
}

#[tokio::test]
#[serial]
async fn unparseable_count_keeps_default() {
    clear_scenario_env();
    // SAFETY: test is #[serial].
    unsafe { std::env::set_var("DEPLOYMENT_RBD_COUNT", "lots") };
    let config = ScenarioConfig::load(None).await.expect("should load");
    clear_scenario_env();

    assert_eq!(config.workloads.rbd_count, 1);
}

#[tokio::test]
#[serial]
async fn zero_namespaces_from_env_is_rejected() {
    clear_scenario_env();
    // SAFETY: test is #[serial].
    unsafe { std::env::set_var("NAMESPACES_COUNT", "0") };
    let result = ScenarioConfig::load(None).await;
    clear_scenario_env();

    let err = result.expect_err("zero namespaces should be rejected");
    assert!(err.to_string().contains("namespaces_count"));
}
