//! Error taxonomy shared across the workspace.

/// Top-level error for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum DrError {
    /// Configuration problem
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// I/O failure
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file does not exist
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// TOML could not be parsed
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// A value is outside its allowed range or set
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_value_display_names_field() {
        let err = ConfigError::InvalidValue {
            field: "run.namespaces_count".to_owned(),
            reason: "must be at least 1".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("run.namespaces_count"));
        assert!(msg.contains("at least 1"));
    }

    #[test]
    fn config_error_converts_into_dr_error() {
        let err: DrError = ConfigError::FileNotFound {
            path: "missing.toml".to_owned(),
        }
        .into();
        assert!(matches!(err, DrError::Config(ConfigError::FileNotFound { .. })));
        assert!(err.to_string().contains("missing.toml"));
    }
}
