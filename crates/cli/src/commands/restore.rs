use anyhow::{bail, Result};
use clap::Args;
use photmerge_core::config::Config;
use photmerge_core::domain::TargetId;
use photmerge_core::Archive;

#[derive(Args, Debug)]
pub struct RestoreArgs {
    /// Target names (normalized before lookup)
    #[arg(required_unless_present = "all")]
    pub targets: Vec<String>,

    /// Restore every record that has a backup with this label
    #[arg(long, conflicts_with = "targets")]
    pub all: bool,

    /// Source label used in backup file names
    #[arg(long)]
    pub backup_label: Option<String>,
}

pub fn run(archive: &mut Archive, config: &Config, args: RestoreArgs) -> Result<()> {
    let label = args
        .backup_label
        .unwrap_or_else(|| config.merge.backup_label());

    let mut failed = 0usize;
    if args.all {
        let targets: Vec<TargetId> = archive
            .store()
            .list()?
            .into_iter()
            .filter(|r| r.backups.iter().any(|b| b == &label))
            .map(|r| r.id)
            .collect();
        if targets.is_empty() {
            println!("No backups labelled `{label}` found.");
            return Ok(());
        }
        for id in &targets {
            match archive.restore_target(id, &label) {
                Ok(()) => println!("{id}: restored from backup"),
                Err(e) => {
                    eprintln!("{id}: {e}");
                    failed += 1;
                }
            }
        }
    } else {
        for name in &args.targets {
            match archive.restore(name, &label) {
                Ok(id) => println!("{id}: restored from backup"),
                Err(e) => {
                    eprintln!("{name}: {e}");
                    failed += 1;
                }
            }
        }
    }

    if failed > 0 {
        bail!("{failed} targets could not be restored");
    }
    Ok(())
}
