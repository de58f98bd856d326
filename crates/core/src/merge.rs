use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::domain::{FailureMode, FilterSource, TableRow, TargetId};
use crate::error::{Error, Result};
use crate::normalize::Normalizer;
use crate::record::{combined_uncertainty, Measurement};
use crate::rewrite;
use crate::store::RecordStore;

/// Absolute flux calibration error, as a fraction of the flux.
pub const DEFAULT_CALIBRATION_FRACTION: f64 = 0.02;

/// What to merge and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MergeOptions {
    /// Tag written at the start of each new line, e.g. `MIPS24`.
    pub label: String,
    /// Prefix identifying stale lines to remove. Defaults to `label`.
    pub marker: Option<String>,
    pub unit: String,
    /// Which declared aperture's flux/snr pair to use.
    pub aperture: String,
    pub calibration_fraction: f64,
    /// Source label in backup names. Defaults to the lowercased label.
    pub backup_label: Option<String>,
    pub filter_source: FilterSource,
    pub failure_mode: FailureMode,
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            label: "MIPS24".to_string(),
            marker: None,
            unit: "mJy".to_string(),
            aperture: "r1".to_string(),
            calibration_fraction: DEFAULT_CALIBRATION_FRACTION,
            backup_label: None,
            filter_source: FilterSource::default(),
            failure_mode: FailureMode::default(),
        }
    }
}

impl MergeOptions {
    pub fn marker(&self) -> &str {
        self.marker.as_deref().unwrap_or(&self.label)
    }

    pub fn backup_label(&self) -> String {
        self.backup_label
            .clone()
            .unwrap_or_else(|| self.label.to_lowercase())
    }
}

/// Progress events emitted while merging.
pub enum MergeProgress {
    /// Starting the merge with the number of unique targets.
    Start { targets: usize },
    /// A target's record was rewritten.
    Merged { id: TargetId, removed: usize, added: usize },
    /// A target could not be merged (lenient mode only; strict mode returns the error).
    Failed { id: TargetId, error: String },
    /// All targets processed.
    Complete { merged: usize, failed: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct TargetOutcome {
    pub id: TargetId,
    pub removed: usize,
    pub added: usize,
    pub backup_created: bool,
}

#[derive(Debug)]
pub struct TargetFailure {
    pub id: TargetId,
    pub error: Error,
}

#[derive(Debug, Default)]
pub struct MergeReport {
    pub merged: Vec<TargetOutcome>,
    pub failed: Vec<TargetFailure>,
}

impl MergeReport {
    pub fn lines_added(&self) -> usize {
        self.merged.iter().map(|t| t.added).sum()
    }

    /// Targets whose backup was taken by this run.
    pub fn backups_created(&self) -> usize {
        self.merged.iter().filter(|t| t.backup_created).count()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Turn table rows into measurements grouped by target, targets in
/// first-seen order and rows in table order.
pub fn group_measurements(
    rows: &[TableRow],
    normalizer: &Normalizer,
    aperture: usize,
    options: &MergeOptions,
) -> Result<Vec<(TargetId, Vec<Measurement>)>> {
    let mut order: Vec<TargetId> = Vec::new();
    let mut groups: HashMap<TargetId, Vec<Measurement>> = HashMap::new();

    for row in rows {
        let ap = row.apertures.get(aperture).ok_or_else(|| Error::MalformedInput {
            line: row.line,
            message: format!("row has no aperture {}", options.aperture),
        })?;
        let uncertainty =
            combined_uncertainty(ap.flux, ap.statistical_uncertainty(), options.calibration_fraction);
        let measurement = Measurement::new(&options.label, ap.flux, uncertainty, &options.unit)?;

        let id = normalizer.normalize(&row.name);
        groups
            .entry(id.clone())
            .or_insert_with(|| {
                order.push(id);
                Vec::new()
            })
            .push(measurement);
    }

    Ok(order
        .into_iter()
        .map(|id| {
            let ms = groups.remove(&id).unwrap_or_default();
            (id, ms)
        })
        .collect())
}

/// Merge table rows into their archive records, one target at a time.
///
/// Each target's record loses every line starting with the marker and gains
/// one line per row for that target. In strict mode the first failing target
/// aborts the run; earlier targets stay merged.
pub fn merge<S: RecordStore + ?Sized>(
    store: &mut S,
    rows: &[TableRow],
    aperture: usize,
    normalizer: &Normalizer,
    options: &MergeOptions,
    mut progress_cb: Option<&mut dyn FnMut(MergeProgress)>,
) -> Result<MergeReport> {
    let marker = options.marker().to_string();
    let label = options.backup_label();
    if marker.is_empty() || label.is_empty() || options.label.is_empty() {
        return Err(Error::InvalidTag);
    }

    let targets = group_measurements(rows, normalizer, aperture, options)?;

    if let Some(ref mut cb) = progress_cb {
        cb(MergeProgress::Start {
            targets: targets.len(),
        });
    }

    let mut report = MergeReport::default();
    for (id, measurements) in targets {
        match rewrite::rewrite(store, &id, &marker, &label, options.filter_source, measurements) {
            Ok(outcome) => {
                info!(
                    target_id = %id,
                    removed = outcome.removed,
                    added = outcome.added,
                    "merged {}",
                    options.label
                );
                if let Some(ref mut cb) = progress_cb {
                    cb(MergeProgress::Merged {
                        id: id.clone(),
                        removed: outcome.removed,
                        added: outcome.added,
                    });
                }
                report.merged.push(TargetOutcome {
                    id,
                    removed: outcome.removed,
                    added: outcome.added,
                    backup_created: outcome.backup_created,
                });
            }
            Err(source) => {
                let error = Error::TargetFailed {
                    id: id.to_string(),
                    tag: options.label.clone(),
                    source: Box::new(source),
                };
                if options.failure_mode == FailureMode::Strict {
                    return Err(error);
                }
                warn!(target_id = %id, "{error}");
                if let Some(ref mut cb) = progress_cb {
                    cb(MergeProgress::Failed {
                        id: id.clone(),
                        error: error.to_string(),
                    });
                }
                report.failed.push(TargetFailure { id, error });
            }
        }
    }

    if let Some(ref mut cb) = progress_cb {
        cb(MergeProgress::Complete {
            merged: report.merged.len(),
            failed: report.failed.len(),
        });
    }

    Ok(report)
}
