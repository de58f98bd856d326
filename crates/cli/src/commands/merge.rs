use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use photmerge_core::config::Config;
use photmerge_core::domain::{FailureMode, FilterSource};
use photmerge_core::merge::{MergeOptions, MergeProgress};
use photmerge_core::Archive;

#[derive(Args, Debug, Default)]
pub struct MergeArgs {
    /// Measurement table to merge
    pub table: PathBuf,

    /// Tag written at the start of each new line (e.g. MIPS24)
    #[arg(long)]
    pub label: Option<String>,

    /// Prefix of stale lines to remove (defaults to the label)
    #[arg(long)]
    pub marker: Option<String>,

    /// Unit written after each value
    #[arg(long)]
    pub unit: Option<String>,

    /// Aperture whose flux/snr columns are merged
    #[arg(long)]
    pub aperture: Option<String>,

    /// Fractional absolute calibration error added in quadrature
    #[arg(long)]
    pub calibration: Option<f64>,

    /// Source label used in backup file names
    #[arg(long)]
    pub backup_label: Option<String>,

    /// Keep going when a target fails and report all failures at the end
    #[arg(long)]
    pub lenient: bool,

    /// Filter the current record instead of the first backup
    #[arg(long)]
    pub from_current: bool,
}

/// Config values overridden by whatever was given on the command line.
pub(crate) fn resolve_options(config: &Config, args: &MergeArgs) -> MergeOptions {
    let mut options = config.merge.clone();
    if let Some(label) = &args.label {
        options.label = label.clone();
    }
    if let Some(marker) = &args.marker {
        options.marker = Some(marker.clone());
    }
    if let Some(unit) = &args.unit {
        options.unit = unit.clone();
    }
    if let Some(aperture) = &args.aperture {
        options.aperture = aperture.clone();
    }
    if let Some(fraction) = args.calibration {
        options.calibration_fraction = fraction;
    }
    if let Some(label) = &args.backup_label {
        options.backup_label = Some(label.clone());
    }
    if args.lenient {
        options.failure_mode = FailureMode::Lenient;
    }
    if args.from_current {
        options.filter_source = FilterSource::Current;
    }
    options
}

pub fn run(archive: &mut Archive, config: &Config, args: MergeArgs) -> Result<()> {
    let options = resolve_options(config, &args);

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );

    let report = archive.merge_table(
        &args.table,
        &options,
        Some(&mut |progress| match progress {
            MergeProgress::Start { targets } => {
                pb.set_length(targets as u64);
                pb.set_position(0);
                pb.set_message(format!("Merging {} ({})...", options.label, options.failure_mode));
            }
            MergeProgress::Merged { id, removed, added } => {
                pb.inc(1);
                pb.set_message(format!("{id}: -{removed} +{added}"));
            }
            MergeProgress::Failed { id, error } => {
                pb.inc(1);
                pb.println(format!("  failed {id}: {error}"));
            }
            MergeProgress::Complete { merged, failed } => {
                let mut msg = format!("{merged} merged");
                if failed > 0 {
                    msg.push_str(&format!(", {failed} failed"));
                }
                pb.finish_with_message(msg);
            }
        }),
    );

    let report = match report {
        Ok(report) => report,
        Err(e) => {
            pb.abandon();
            return Err(e.into());
        }
    };

    println!(
        "Merged {} lines into {} records ({} new backups).",
        report.lines_added(),
        report.merged.len(),
        report.backups_created()
    );
    if !report.is_clean() {
        bail!("{} targets could not be merged", report.failed.len());
    }
    Ok(())
}
