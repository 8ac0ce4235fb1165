//! Placeholder substitution.
//!
//! Templates use `${NAME}` placeholders. [`Substitutions`] carries the
//! run-wide values plus the per-workload ones; [`ManifestRenderer::render`]
//! replaces every known placeholder and leaves unknown ones untouched.

use drscenario_core::types::{NamespaceSet, RunId};

use crate::error::ManifestError;
use crate::template::{Template, TemplateSource};

/// Values substituted into templates.
#[derive(Debug, Clone)]
pub struct Substitutions {
    /// `${TESTID}`
    pub run_id: RunId,
    /// `${RAMENOPSNAMESPACE}`
    pub ops_namespace: String,
    /// `${PREFERRED_CLUSTER}`
    pub preferred_cluster: String,
    /// `${FAILOVER_CLUSTER}`
    pub failover_cluster: String,
    /// `${DRPOLICY}`
    pub dr_policy: String,
    /// `${PROTECTED_NAMESPACES}`
    pub protected_namespaces: NamespaceSet,
    /// `${DEPLOYMENT_NAME}`
    pub deployment_name: String,
    /// `${STORAGECLASS}`
    pub storage_class: String,
    /// `${NAMESPACE}`
    pub namespace: String,
}

impl Substitutions {
    /// Run-wide values; per-workload fields start empty.
    pub fn new(
        run_id: RunId,
        ops_namespace: impl Into<String>,
        preferred_cluster: impl Into<String>,
        failover_cluster: impl Into<String>,
        dr_policy: impl Into<String>,
        protected_namespaces: NamespaceSet,
    ) -> Self {
        Self {
            run_id,
            ops_namespace: ops_namespace.into(),
            preferred_cluster: preferred_cluster.into(),
            failover_cluster: failover_cluster.into(),
            dr_policy: dr_policy.into(),
            protected_namespaces,
            deployment_name: String::new(),
            storage_class: String::new(),
            namespace: String::new(),
        }
    }

    /// Copy scoped to a namespace.
    pub fn for_namespace(&self, namespace: &str) -> Self {
        Self {
            namespace: namespace.to_owned(),
            ..self.clone()
        }
    }

    /// Copy scoped to one workload and its claim.
    pub fn for_workload(&self, name: &str, storage_class: &str, namespace: &str) -> Self {
        Self {
            deployment_name: name.to_owned(),
            storage_class: storage_class.to_owned(),
            namespace: namespace.to_owned(),
            ..self.clone()
        }
    }

    fn pairs(&self) -> [(&'static str, String); 9] {
        [
            ("${DEPLOYMENT_NAME}", self.deployment_name.clone()),
            ("${TESTID}", self.run_id.to_string()),
            ("${STORAGECLASS}", self.storage_class.clone()),
            ("${RAMENOPSNAMESPACE}", self.ops_namespace.clone()),
            ("${NAMESPACE}", self.namespace.clone()),
            ("${PREFERRED_CLUSTER}", self.preferred_cluster.clone()),
            ("${FAILOVER_CLUSTER}", self.failover_cluster.clone()),
            ("${DRPOLICY}", self.dr_policy.clone()),
            (
                "${PROTECTED_NAMESPACES}",
                format_protected_namespaces(&self.protected_namespaces),
            ),
        ]
    }
}

/// Renders the protected-namespace block: one `    - <ns>` line per
/// namespace, in order.
pub fn format_protected_namespaces(namespaces: &NamespaceSet) -> String {
    namespaces.iter().map(|ns| format!("    - {ns}\n")).collect()
}

/// Renders templates from a [`TemplateSource`].
#[derive(Debug, Clone, Default)]
pub struct ManifestRenderer {
    source: TemplateSource,
}

impl ManifestRenderer {
    pub fn new(source: TemplateSource) -> Self {
        Self { source }
    }

    /// Loads `template` and substitutes every placeholder.
    pub async fn render(
        &self,
        template: Template,
        subs: &Substitutions,
    ) -> Result<String, ManifestError> {
        let body = self.source.load(template).await?;
        Ok(substitute(&body, subs))
    }
}

/// Substitutes placeholders in an arbitrary template body.
pub fn substitute(body: &str, subs: &Substitutions) -> String {
    subs.pairs()
        .iter()
        .fold(body.to_owned(), |acc, (key, value)| acc.replace(key, value))
}
