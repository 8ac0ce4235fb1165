//! TeardownEngine against an in-memory cluster implemented through the
//! public `ClusterClient` trait.
//!
//! - finalizer-held objects across several kinds all converge to an empty listing
//! - the delete burst precedes every finalizer strip
//! - a non-"not found" failure while stripping aborts the teardown

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use drscenario_cluster::{
    ClusterClient, ClusterError, DeleteOptions, Subresource, TeardownEngine, TeardownState,
};
use drscenario_core::types::ResourceRef;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
enum Op {
    Delete(String),
    StripFinalizers(String),
}

#[derive(Default)]
struct Inner {
    /// (kind, name) -> (has finalizer, terminating)
    objects: HashMap<(String, String), (bool, bool)>,
    ops: Vec<Op>,
}

#[derive(Default)]
struct FinalizerCluster {
    inner: Mutex<Inner>,
    fail_strip: bool,
}

impl FinalizerCluster {
    async fn add(&self, kind: &str, name: &str, finalizer: bool) {
        self.inner
            .lock()
            .await
            .objects
            .insert((kind.to_owned(), name.to_owned()), (finalizer, false));
    }

    async fn ops(&self) -> Vec<Op> {
        self.inner.lock().await.ops.clone()
    }
}

impl ClusterClient for FinalizerCluster {
    async fn apply(&self, _manifest: &str, _context: &str) -> Result<(), ClusterError> {
        Ok(())
    }

    async fn delete(
        &self,
        resource: &ResourceRef,
        _options: DeleteOptions,
    ) -> Result<(), ClusterError> {
        let mut inner = self.inner.lock().await;
        inner.ops.push(Op::Delete(resource.name.clone()));
        let key = (resource.kind.clone(), resource.name.clone());
        match inner.objects.get(&key).copied() {
            Some((true, _)) => {
                inner.objects.insert(key, (true, true));
            }
            Some((false, _)) => {
                inner.objects.remove(&key);
            }
            None => {}
        }
        Ok(())
    }

    async fn patch(
        &self,
        _resource: &ResourceRef,
        _patch: &serde_json::Value,
        _subresource: Option<Subresource>,
    ) -> Result<(), ClusterError> {
        Ok(())
    }

    async fn list(
        &self,
        _context: &str,
        kind: &str,
        _namespace: &str,
    ) -> Result<Vec<String>, ClusterError> {
        let inner = self.inner.lock().await;
        let mut names: Vec<String> = inner
            .objects
            .keys()
            .filter(|(k, _)| k == kind)
            .map(|(_, n)| n.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn exists(&self, resource: &ResourceRef) -> Result<bool, ClusterError> {
        let inner = self.inner.lock().await;
        Ok(inner
            .objects
            .contains_key(&(resource.kind.clone(), resource.name.clone())))
    }

    async fn remove_finalizers(&self, resource: &ResourceRef) -> Result<(), ClusterError> {
        if self.fail_strip {
            return Err(ClusterError::CommandFailed {
                command: "kubectl patch".to_owned(),
                status: "1".to_owned(),
                stderr: "forbidden".to_owned(),
            });
        }
        let mut inner = self.inner.lock().await;
        inner.ops.push(Op::StripFinalizers(resource.name.clone()));
        let key = (resource.kind.clone(), resource.name.clone());
        match inner.objects.get(&key).copied() {
            Some((_, true)) => {
                inner.objects.remove(&key);
                Ok(())
            }
            Some(_) => Ok(()),
            None => Err(ClusterError::NotFound {
                resource: resource.to_string(),
            }),
        }
    }

    async fn find_pod(
        &self,
        _context: &str,
        _namespace: &str,
        _selector: &str,
    ) -> Result<Option<String>, ClusterError> {
        Ok(None)
    }

    async fn exec_in_pod(
        &self,
        _context: &str,
        _namespace: &str,
        _pod: &str,
        _command: &[&str],
    ) -> Result<String, ClusterError> {
        Ok(String::new())
    }
}

fn engine(cluster: &Arc<FinalizerCluster>) -> TeardownEngine<FinalizerCluster> {
    TeardownEngine::new(
        Arc::clone(cluster),
        Duration::from_millis(1_000),
        Duration::from_millis(100),
    )
}

#[tokio::test(start_paused = true)]
async fn every_kind_converges_to_empty() {
    let cluster = Arc::new(FinalizerCluster::default());
    for i in 0..5 {
        cluster.add("deployment", &format!("d{i}"), i % 2 == 0).await;
        cluster
            .add("persistentvolumeclaim", &format!("c{i}"), true)
            .await;
    }
    cluster.add("volumereplicationgroup", "vrg", true).await;

    let engine = engine(&cluster);
    for kind in ["deployment", "persistentvolumeclaim", "volumereplicationgroup"] {
        let report = engine.run("rdr-dr1", "ns", kind).await.unwrap();
        assert!(report.converged(), "{kind} did not converge");
        assert!(
            cluster.list("rdr-dr1", kind, "ns").await.unwrap().is_empty(),
            "{kind} still listed"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn deletes_all_precede_finalizer_strips() {
    let cluster = Arc::new(FinalizerCluster::default());
    cluster.add("deployment", "a", true).await;
    cluster.add("deployment", "b", true).await;

    let report = engine(&cluster).run("rdr-dr1", "ns", "deployment").await.unwrap();

    assert_eq!(report.finalizers_stripped, 2);
    assert_eq!(report.resources["a"], TeardownState::Gone);
    assert_eq!(
        cluster.ops().await,
        [
            Op::Delete("a".to_owned()),
            Op::Delete("b".to_owned()),
            Op::StripFinalizers("a".to_owned()),
            Op::StripFinalizers("b".to_owned()),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn strip_failure_aborts() {
    let cluster = Arc::new(FinalizerCluster {
        fail_strip: true,
        ..FinalizerCluster::default()
    });
    cluster.add("deployment", "stuck", true).await;

    let err = engine(&cluster)
        .run("rdr-dr1", "ns", "deployment")
        .await
        .unwrap_err();
    assert!(!err.is_not_found());
}
