mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use photmerge_core::config::{Config, CONFIG_ENV_VAR};
use photmerge_core::Archive;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// photmerge: merge reprocessed photometry into per-target extinction archives
#[derive(Parser)]
#[command(name = "photmerge", version, about)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Archive directory (overrides the config file)
    #[arg(long, global = true)]
    archive: Option<PathBuf>,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replace an instrument's entries with the rows of a measurement table
    Merge(commands::merge::MergeArgs),
    /// Remove an instrument's entries from target records
    Strip(commands::strip::StripArgs),
    /// Put backups back in place of target records
    Restore(commands::restore::RestoreArgs),
    /// List archive records, their backups and entry counts
    Status {
        /// Count lines starting with this marker (defaults to the merge marker)
        #[arg(long)]
        marker: Option<String>,
    },
    /// Print the archive identifier for raw target names
    Normalize {
        /// Raw target names
        #[arg(required = true)]
        names: Vec<String>,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let (mut config, config_path) = Config::discover(cli.config.as_deref())?;
    if let Some(path) = &config_path {
        debug!("loaded config from {}", path.display());
    }
    if let Some(dir) = cli.archive {
        config.archive.dir = dir;
    }

    let open = || -> Result<Archive> {
        let archive = Archive::from_config(&config)?;
        debug!("archive at {}", archive.root().display());
        Ok(archive)
    };

    match cli.command {
        Commands::Merge(args) => commands::merge::run(&mut open()?, &config, args)?,
        Commands::Strip(args) => commands::strip::run(&mut open()?, &config, args)?,
        Commands::Restore(args) => commands::restore::run(&mut open()?, &config, args)?,
        Commands::Status { marker } => {
            let marker = marker.unwrap_or_else(|| config.merge.marker().to_string());
            commands::status::run(&open()?, &marker)?
        }
        Commands::Normalize { names } => commands::normalize::run(&config, &names)?,
    }

    Ok(())
}
