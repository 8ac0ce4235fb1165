//! Domain types: run identifiers, protected namespaces and resource references.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier tagging every resource created by one run.
///
/// All generated names are derived from it, so two runs with different ids
/// never collide and cleanup can target exactly what a run created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(String);

impl RunId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh `test-<8 hex>` identifier.
    pub fn generate() -> Self {
        let uuid = uuid::Uuid::new_v4().simple().to_string();
        Self(format!("test-{}", &uuid[..8]))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the `index`-th protected namespace: `<run>-ns-<index>`.
    pub fn namespace(&self, index: usize) -> String {
        format!("{}-ns-{index}", self.0)
    }

    /// Name of the workload (and its claim) number `index` placed in `namespace`.
    pub fn workload_name(namespace: &str, index: usize) -> String {
        format!("{namespace}-w-{index}")
    }

    /// Name of the manifest-distribution artifact the hub generates for the
    /// DR-protection namespace.
    pub fn namespace_manifestwork(&self, ops_namespace: &str) -> String {
        format!("{}-drpc-{ops_namespace}-ns-mw", self.0)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The namespaces a DR-protection resource declares as protected.
///
/// Generated once per run; every workload is placed in one of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NamespaceSet(Vec<String>);

impl NamespaceSet {
    pub fn generate(run_id: &RunId, count: usize) -> Self {
        Self((0..count).map(|i| run_id.namespace(i)).collect())
    }

    pub fn from_names(names: Vec<String>) -> Self {
        Self(names)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, namespace: &str) -> bool {
        self.0.iter().any(|n| n == namespace)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

/// Reference to a single cluster resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceRef {
    /// Resource kind or resource name understood by the cluster CLI
    pub kind: String,
    /// Object name
    pub name: String,
    /// Namespace; `None` for cluster-scoped resources
    pub namespace: Option<String>,
    /// Cluster context the resource lives in
    pub context: String,
}

impl ResourceRef {
    /// A namespaced resource.
    pub fn namespaced(
        context: impl Into<String>,
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            namespace: Some(namespace.into()),
            context: context.into(),
        }
    }

    /// A cluster-scoped resource.
    pub fn cluster_scoped(
        context: impl Into<String>,
        kind: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            namespace: None,
            context: context.into(),
        }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}/{} ({})", self.kind, ns, self.name, self.context),
            None => write!(f, "{}/{} ({})", self.kind, self.name, self.context),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_names_are_deterministic() {
        let run = RunId::new("test-1");
        let a = NamespaceSet::generate(&run, 3);
        let b = NamespaceSet::generate(&run, 3);
        assert_eq!(a, b);
        assert_eq!(a.as_slice(), ["test-1-ns-0", "test-1-ns-1", "test-1-ns-2"]);
    }

    #[test]
    fn workload_name_depends_only_on_namespace_and_index() {
        assert_eq!(RunId::workload_name("test-1-ns-0", 4), "test-1-ns-0-w-4");
        assert_eq!(
            RunId::workload_name("test-1-ns-0", 4),
            RunId::workload_name("test-1-ns-0", 4)
        );
    }

    #[test]
    fn manifestwork_name_includes_ops_namespace() {
        let run = RunId::new("test-7");
        assert_eq!(
            run.namespace_manifestwork("ramen-ops"),
            "test-7-drpc-ramen-ops-ns-mw"
        );
    }

    #[test]
    fn generated_run_ids_are_prefixed_and_distinct() {
        let a = RunId::generate();
        let b = RunId::generate();
        assert!(a.as_str().starts_with("test-"));
        assert_eq!(a.as_str().len(), "test-".len() + 8);
        assert_ne!(a, b);
    }

    #[test]
    fn empty_namespace_set() {
        let set = NamespaceSet::generate(&RunId::new("x"), 0);
        assert!(set.is_empty());
        assert!(!set.contains("x-ns-0"));
    }

    #[test]
    fn resource_ref_display() {
        let r = ResourceRef::namespaced("dr1", "deployment", "ns", "app");
        assert_eq!(r.to_string(), "deployment/ns/app (dr1)");
        let r = ResourceRef::cluster_scoped("dr1", "namespace", "ns");
        assert_eq!(r.to_string(), "namespace/ns (dr1)");
    }
}
