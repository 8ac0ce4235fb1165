//! Shared types for the drscenario workspace.
//!
//! - [`phase`]: the ordered scenario phases and the run window guard
//! - [`config`]: `drscenario.toml` + environment configuration
//! - [`types`]: run identifiers, protected namespace sets, resource references
//! - [`error`]: configuration and I/O errors

pub mod config;
pub mod error;
pub mod phase;
pub mod types;

pub use config::ScenarioConfig;
pub use error::{ConfigError, DrError};
pub use phase::{Phase, RunWindow, should_run};
pub use types::{NamespaceSet, ResourceRef, RunId};
