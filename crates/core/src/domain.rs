use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical on-disk identifier of an archive target, as produced by
/// [`crate::normalize::Normalizer::normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(String);

impl TargetId {
    /// Wrap an already-normalized identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Flux and signal-to-noise for one photometric aperture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApertureFlux {
    pub flux: f64,
    pub snr: f64,
}

impl ApertureFlux {
    /// Statistical uncertainty implied by the signal-to-noise ratio.
    pub fn statistical_uncertainty(&self) -> f64 {
        self.flux / self.snr
    }
}

/// One row of the incoming measurement table.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    /// 1-based line number in the source table.
    pub line: usize,
    pub tag: String,
    pub aperture_key: i64,
    pub name: String,
    pub obs_time: f64,
    /// One entry per declared aperture, in declaration order.
    pub apertures: Vec<ApertureFlux>,
}

/// How the merge driver reacts to a failing target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailureMode {
    /// Abort on the first failing target.
    #[default]
    Strict,
    /// Record the failure and continue with the remaining targets.
    Lenient,
}

/// Which copy of a record the rewriter filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterSource {
    /// Always read the first backup. Repeated merges therefore start from the
    /// pre-merge state and anything merged in between is discarded.
    #[default]
    Backup,
    /// Read the current record. The backup is still created once.
    Current,
}

impl fmt::Display for FailureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureMode::Strict => write!(f, "strict"),
            FailureMode::Lenient => write!(f, "lenient"),
        }
    }
}
