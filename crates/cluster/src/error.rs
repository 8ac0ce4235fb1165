//! Cluster control errors.
//!
//! [`ClusterError::is_not_found`] lets callers treat an already-gone object
//! as success where the operation tolerates it.

/// Errors raised while talking to a cluster.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// The target object does not exist
    #[error("resource not found: {resource}")]
    NotFound {
        /// Resource description
        resource: String,
    },

    /// The cluster CLI exited with a failure status
    #[error("command failed ({status}): {command}: {stderr}")]
    CommandFailed {
        /// Command line that was run
        command: String,
        /// Exit status, or `signal` when terminated by one
        status: String,
        /// Captured stderr
        stderr: String,
    },

    /// The cluster CLI could not be started
    #[error("failed to spawn {binary}: {source}")]
    Spawn {
        /// Binary name
        binary: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The cluster CLI produced output that could not be interpreted
    #[error("invalid output from {command}: {reason}")]
    InvalidOutput {
        /// Command line that was run
        command: String,
        /// What was wrong with it
        reason: String,
    },

    /// A patch document could not be serialized
    #[error("patch serialization failed: {0}")]
    Patch(#[from] serde_json::Error),
}

impl ClusterError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
