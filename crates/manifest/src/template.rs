//! Template catalogue.
//!
//! Every [`Template`] ships with a built-in YAML body. A [`TemplateSource`]
//! may point at a directory whose `<name>.yaml` files replace the built-in
//! bodies; templates missing from the directory fall back to the built-in set.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use tracing::debug;

use crate::error::ManifestError;

/// Identifies one manifest template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Template {
    Namespace,
    Deployment,
    Pvc,
    /// DR-protection resource (DRPlacementControl)
    Drpc,
    Placement,
    PlacementDecision,
}

impl Template {
    pub const ALL: [Template; 6] = [
        Template::Namespace,
        Template::Deployment,
        Template::Pvc,
        Template::Drpc,
        Template::Placement,
        Template::PlacementDecision,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Namespace => "namespace",
            Self::Deployment => "deployment",
            Self::Pvc => "pvc",
            Self::Drpc => "drpc",
            Self::Placement => "placement",
            Self::PlacementDecision => "placementdecision",
        }
    }

    pub fn file_name(self) -> String {
        format!("{}.yaml", self.name())
    }

    fn builtin(self) -> &'static str {
        match self {
            Self::Namespace => include_str!("../templates/namespace.yaml"),
            Self::Deployment => include_str!("../templates/deployment.yaml"),
            Self::Pvc => include_str!("../templates/pvc.yaml"),
            Self::Drpc => include_str!("../templates/drpc.yaml"),
            Self::Placement => include_str!("../templates/placement.yaml"),
            Self::PlacementDecision => include_str!("../templates/placementdecision.yaml"),
        }
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Template {
    type Err = ManifestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().trim_end_matches(".yaml").to_ascii_lowercase();
        Template::ALL
            .into_iter()
            .find(|t| t.name() == name)
            .ok_or_else(|| ManifestError::UnknownTemplate(s.to_owned()))
    }
}

/// Where template bodies come from.
#[derive(Debug, Clone, Default)]
pub enum TemplateSource {
    /// Compiled-in templates
    #[default]
    Builtin,
    /// `<dir>/<name>.yaml`, falling back to the built-in body
    Directory(PathBuf),
}

impl TemplateSource {
    /// Empty path means built-in.
    pub fn from_dir(dir: &str) -> Self {
        if dir.is_empty() {
            Self::Builtin
        } else {
            Self::Directory(PathBuf::from(dir))
        }
    }

    /// Loads the body of `template`.
    pub async fn load(&self, template: Template) -> Result<String, ManifestError> {
        match self {
            Self::Builtin => Ok(template.builtin().to_owned()),
            Self::Directory(dir) => load_from_dir(dir, template).await,
        }
    }
}

async fn load_from_dir(dir: &Path, template: Template) -> Result<String, ManifestError> {
    let path = dir.join(template.file_name());
    match tokio::fs::read_to_string(&path).await {
        Ok(body) => {
            debug!(path = %path.display(), "loaded template override");
            Ok(body)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(template.builtin().to_owned()),
        Err(e) => Err(ManifestError::TemplateLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        }),
    }
}
