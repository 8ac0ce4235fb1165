//! CLI-specific error types and exit code mapping

use drscenario_cluster::ClusterError;
use drscenario_core::error::DrError;
use drscenario_manifest::ManifestError;

use crate::scenario::ScenarioError;

/// CLI-specific error type.
///
/// The `exit_code()` method maps errors to process exit codes.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration loading or validation failure.
    #[error("configuration error: {0}")]
    Config(String),

    /// A subcommand-specific operation failed.
    #[error("{0}")]
    Command(String),

    /// A scenario phase failed.
    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    /// Cluster call outside a scenario phase.
    #[error("cluster error: {0}")]
    Cluster(#[from] ClusterError),

    /// Template loading or header parsing failed.
    #[error("manifest error: {0}")]
    Manifest(#[from] ManifestError),

    /// Wrapped domain error from drscenario-core.
    #[error("{0}")]
    Core(#[from] DrError),

    /// JSON serialisation failed during output rendering.
    #[error("json output error: {0}")]
    JsonSerialize(#[from] serde_json::Error),

    /// IO error (stdout write, etc.).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map the error to a process exit code.
    ///
    /// | Code | Meaning                     |
    /// |------|-----------------------------|
    /// | 0    | Success                     |
    /// | 1    | General / command error     |
    /// | 2    | Configuration error         |
    /// | 3    | Cluster operation failed    |
    /// | 4    | Manifest rendering failed   |
    /// | 10   | IO error                    |
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) | Self::Core(DrError::Config(_)) => 2,
            Self::Cluster(_) | Self::Scenario(ScenarioError::Cluster { .. }) => 3,
            Self::Manifest(_) | Self::Scenario(ScenarioError::Manifest { .. }) => 4,
            Self::Io(_) | Self::Core(DrError::Io(_)) => 10,
            Self::Command(_) | Self::JsonSerialize(_) => 1,
        }
    }
}
