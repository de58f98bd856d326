use anyhow::{bail, Result};
use clap::Args;
use photmerge_core::config::Config;
use photmerge_core::domain::FilterSource;
use photmerge_core::Archive;

#[derive(Args, Debug)]
pub struct StripArgs {
    /// Target names (normalized before lookup)
    #[arg(required = true)]
    pub targets: Vec<String>,

    /// Prefix of lines to remove (defaults to the merge marker)
    #[arg(long)]
    pub marker: Option<String>,

    /// Source label used in backup file names
    #[arg(long)]
    pub backup_label: Option<String>,

    /// Filter the current record instead of the first backup
    #[arg(long)]
    pub from_current: bool,
}

pub fn run(archive: &mut Archive, config: &Config, args: StripArgs) -> Result<()> {
    let marker = args
        .marker
        .unwrap_or_else(|| config.merge.marker().to_string());
    let label = args
        .backup_label
        .unwrap_or_else(|| config.merge.backup_label());
    let source = if args.from_current {
        FilterSource::Current
    } else {
        config.merge.filter_source
    };

    let mut failed = 0usize;
    for name in &args.targets {
        match archive.strip(name, &marker, &label, source) {
            Ok((id, outcome)) => {
                let note = if outcome.backup_created { " (backup created)" } else { "" };
                println!("{id}: removed {} {marker} lines{note}", outcome.removed);
            }
            Err(e) => {
                eprintln!("{name}: {e}");
                failed += 1;
            }
        }
    }

    if failed > 0 {
        bail!("{failed} targets could not be stripped");
    }
    Ok(())
}
