//! Scenario phases and the run window that gates them.
//!
//! A run walks [`Phase::ALL`] in declaration order and executes each phase
//! whose guard [`should_run`] returns `true` for the configured
//! [`RunWindow`]. The stop phase is inclusive: it is the last phase executed.
//!
//! # Example
//! ```
//! use drscenario_core::phase::{Phase, RunWindow, should_run};
//!
//! let window = RunWindow::new(Phase::Start, Phase::EnableDr);
//! assert!(should_run(Phase::DeployApp, &window));
//! assert!(should_run(Phase::EnableDr, &window));
//! assert!(!should_run(Phase::Failover, &window));
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ConfigError;

/// One named step of the DR scenario.
///
/// Variants are declared in execution order; the derived `Ord` follows that
/// order, so `Phase::DeployApp < Phase::EnableDr` and so on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Phase {
    /// Implicit entry point. Has no body of its own.
    Start,
    /// Create namespaces and deploy storage-backed workloads.
    DeployApp,
    /// Apply DR protection, placement and placement decision on the hub.
    EnableDr,
    /// Request a failover to the failover cluster.
    Failover,
    /// Request relocation back to the preferred cluster.
    Relocate,
    /// Remove DR protection objects from the hub.
    DisableDr,
    /// Force-clean workloads, claims and replication objects, then namespaces.
    DeleteApp,
    /// Terminal marker.
    End,
}

impl Phase {
    /// All phases in execution order.
    pub const ALL: [Phase; 8] = [
        Phase::Start,
        Phase::DeployApp,
        Phase::EnableDr,
        Phase::Failover,
        Phase::Relocate,
        Phase::DisableDr,
        Phase::DeleteApp,
        Phase::End,
    ];

    /// Position of the phase in [`Phase::ALL`].
    pub fn ordinal(self) -> usize {
        match self {
            Self::Start => 0,
            Self::DeployApp => 1,
            Self::EnableDr => 2,
            Self::Failover => 3,
            Self::Relocate => 4,
            Self::DisableDr => 5,
            Self::DeleteApp => 6,
            Self::End => 7,
        }
    }

    /// Canonical kebab-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::DeployApp => "deploy-app",
            Self::EnableDr => "enable-dr",
            Self::Failover => "failover",
            Self::Relocate => "relocate",
            Self::DisableDr => "disable-dr",
            Self::DeleteApp => "delete-app",
            Self::End => "end",
        }
    }

    /// Whether the phase has a step body. `Start` is only an entry point.
    pub fn is_step(self) -> bool {
        !matches!(self, Self::Start)
    }

    /// Parses a phase name, falling back to [`Phase::Start`] when the name is
    /// not recognized.
    ///
    /// The fallback is logged at `warn` level. Callers that need strict
    /// behavior use [`str::parse`] instead.
    pub fn parse_lenient(name: &str) -> Phase {
        match name.parse::<Phase>() {
            Ok(phase) => phase,
            Err(_) => {
                warn!(
                    value = name,
                    fallback = Phase::Start.as_str(),
                    "unrecognized phase name, falling back"
                );
                Phase::Start
            }
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = ConfigError;

    /// Accepts the kebab-case names as well as the compact forms used by the
    /// environment variables (`deployapp`, `enabledr`, ...), case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '-' | '_'))
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "start" => Ok(Self::Start),
            "deployapp" => Ok(Self::DeployApp),
            "enabledr" => Ok(Self::EnableDr),
            "failover" => Ok(Self::Failover),
            "relocate" => Ok(Self::Relocate),
            "disabledr" => Ok(Self::DisableDr),
            "deleteapp" => Ok(Self::DeleteApp),
            "end" => Ok(Self::End),
            _ => Err(ConfigError::InvalidValue {
                field: "phase".to_owned(),
                reason: format!("unknown phase '{s}'"),
            }),
        }
    }
}

/// Inclusive `[start, stop]` range of phases executed by one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunWindow {
    /// First phase eligible to run.
    pub start: Phase,
    /// Last phase executed.
    pub stop: Phase,
}

impl RunWindow {
    pub fn new(start: Phase, stop: Phase) -> Self {
        Self { start, stop }
    }

    /// Builds a window from configured names using the lenient parser.
    pub fn from_names(start: &str, stop: &str) -> Self {
        Self::new(Phase::parse_lenient(start), Phase::parse_lenient(stop))
    }

    /// Whether `phase` falls inside the window.
    pub fn contains(&self, phase: Phase) -> bool {
        self.start <= phase && phase <= self.stop
    }

    /// A window whose start lies after its stop runs nothing.
    pub fn is_empty(&self) -> bool {
        self.start > self.stop
    }

    /// Step phases the window will execute, in order.
    pub fn steps(&self) -> impl Iterator<Item = Phase> + '_ {
        Phase::ALL
            .into_iter()
            .filter(move |p| p.is_step() && self.contains(*p))
    }
}

impl Default for RunWindow {
    fn default() -> Self {
        Self::new(Phase::Start, Phase::EnableDr)
    }
}

impl fmt::Display for RunWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.stop)
    }
}

/// Phase guard: `window.start <= phase <= window.stop`.
pub fn should_run(phase: Phase, window: &RunWindow) -> bool {
    window.contains(phase)
}
