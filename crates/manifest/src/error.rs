//! Manifest rendering errors.

/// Errors raised while loading templates or reading rendered manifests.
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    /// Unknown template identifier
    #[error("unknown template: {0}")]
    UnknownTemplate(String),

    /// Template override file could not be read
    #[error("template load error: {path}: {reason}")]
    TemplateLoad {
        /// File path
        path: String,
        /// Failure reason
        reason: String,
    },

    /// Rendered manifest is not valid YAML or lacks kind/metadata.name
    #[error("manifest header error: {0}")]
    Header(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_load_display() {
        let err = ManifestError::TemplateLoad {
            path: "/tmp/t/drpc.yaml".to_owned(),
            reason: "permission denied".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("drpc.yaml"));
        assert!(msg.contains("permission denied"));
    }

    #[test]
    fn header_error_display() {
        let err = ManifestError::Header("missing field `kind`".to_owned());
        assert!(err.to_string().contains("kind"));
    }
}
