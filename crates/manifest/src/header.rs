//! Reads the identifying header (kind, name, namespace) out of a rendered
//! manifest.

use drscenario_core::types::ResourceRef;
use serde::Deserialize;

use crate::error::ManifestError;

/// Identity of the object a manifest describes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceHeader {
    pub kind: String,
    pub name: String,
    pub namespace: Option<String>,
}

#[derive(Deserialize)]
struct RawManifest {
    kind: String,
    metadata: RawMetadata,
}

#[derive(Deserialize)]
struct RawMetadata {
    name: String,
    #[serde(default)]
    namespace: Option<String>,
}

impl ResourceHeader {
    /// Reference to this object in cluster `context`.
    pub fn to_ref(&self, context: &str) -> ResourceRef {
        let kind = self.kind.to_ascii_lowercase();
        match &self.namespace {
            Some(ns) => ResourceRef::namespaced(context, kind, ns, &self.name),
            None => ResourceRef::cluster_scoped(context, kind, &self.name),
        }
    }
}

/// Parses `kind`, `metadata.name` and `metadata.namespace` from a manifest.
pub fn parse_header(manifest: &str) -> Result<ResourceHeader, ManifestError> {
    let raw: RawManifest =
        serde_yaml::from_str(manifest).map_err(|e| ManifestError::Header(e.to_string()))?;
    if raw.kind.is_empty() || raw.metadata.name.is_empty() {
        return Err(ManifestError::Header(
            "manifest has an empty kind or metadata.name".to_owned(),
        ));
    }
    Ok(ResourceHeader {
        kind: raw.kind,
        name: raw.metadata.name,
        namespace: raw.metadata.namespace.filter(|ns| !ns.is_empty()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespaced_header() {
        let header = parse_header(
            "apiVersion: v1\nkind: PlacementDecision\nmetadata:\n  name: t-placement-decision-1\n  namespace: ramen-ops\n",
        )
        .unwrap();
        assert_eq!(header.kind, "PlacementDecision");
        assert_eq!(header.name, "t-placement-decision-1");
        assert_eq!(header.namespace.as_deref(), Some("ramen-ops"));

        let r = header.to_ref("hub");
        assert_eq!(r.kind, "placementdecision");
        assert_eq!(r.context, "hub");
    }

    #[test]
    fn cluster_scoped_header() {
        let header = parse_header("kind: Namespace\nmetadata:\n  name: t-ns-0\n").unwrap();
        assert_eq!(header.namespace, None);
        assert_eq!(header.to_ref("dr1").namespace, None);
    }

    #[test]
    fn missing_name_is_an_error() {
        let err = parse_header("kind: Namespace\nmetadata: {}\n").unwrap_err();
        assert!(matches!(err, ManifestError::Header(_)));
    }

    #[test]
    fn not_yaml_is_an_error() {
        assert!(parse_header(":\n  - [").is_err());
    }
}
