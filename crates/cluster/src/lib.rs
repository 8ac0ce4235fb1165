//! Cluster control for drscenario.
//!
//! - [`client`]: the [`ClusterClient`] trait and the `kubectl` adapter
//! - [`teardown`]: delete, verify, then strip finalizers until a kind is gone
//! - [`error`]: [`ClusterError`]

pub mod client;
pub mod error;
pub mod teardown;

pub use client::{ClusterClient, DeleteOptions, KubectlClient, Subresource};
pub use error::ClusterError;
pub use teardown::{TeardownEngine, TeardownReport, TeardownState};
