//! Manifest templates for drscenario.
//!
//! - [`template`]: the template catalogue and where bodies are loaded from
//! - [`renderer`]: `${PLACEHOLDER}` substitution
//! - [`header`]: kind/name/namespace extraction from rendered manifests

pub mod error;
pub mod header;
pub mod renderer;
pub mod template;

pub use error::ManifestError;
pub use header::{ResourceHeader, parse_header};
pub use renderer::{ManifestRenderer, Substitutions};
pub use template::{Template, TemplateSource};
