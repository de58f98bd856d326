pub mod config;
pub mod digest;
pub mod domain;
pub mod error;
pub mod format;
pub mod merge;
pub mod normalize;
pub mod record;
pub mod rewrite;
pub mod store;
pub mod table;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use config::Config;
use domain::{FilterSource, TableRow, TargetId};
use error::{Error, Result};
use merge::{MergeOptions, MergeProgress, MergeReport};
use normalize::Normalizer;
use rewrite::RewriteOutcome;
use store::{DirStore, RecordStore};
use table::TableFormat;

/// Summary of one archive record for listings.
#[derive(Debug, Clone)]
pub struct RecordStatus {
    pub id: TargetId,
    pub path: PathBuf,
    pub lines: usize,
    pub measurements: usize,
    /// Lines belonging to the requested marker, if one was given.
    pub tagged: Option<usize>,
    pub backups: Vec<String>,
    pub sha256: String,
    pub modified: Option<DateTime<Utc>>,
}

/// The main entry point: an archive directory plus the rules used to map
/// table rows onto it.
pub struct Archive {
    store: DirStore,
    normalizer: Normalizer,
    table_format: TableFormat,
}

impl Archive {
    /// Open an existing archive directory with default naming rules.
    pub fn open(dir: &Path, extension: &str) -> Result<Self> {
        if !dir.is_dir() {
            return Err(Error::ArchiveNotFound(dir.to_path_buf()));
        }
        Ok(Self {
            store: DirStore::new(dir, extension),
            normalizer: Normalizer::default(),
            table_format: TableFormat::default(),
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let mut archive = Self::open(&config.archive.dir, &config.archive.extension)?;
        archive.normalizer = config.normalizer()?;
        archive.table_format = config.table.clone();
        Ok(archive)
    }

    pub fn with_normalizer(mut self, normalizer: Normalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn with_table_format(mut self, table_format: TableFormat) -> Self {
        self.table_format = table_format;
        self
    }

    pub fn root(&self) -> &Path {
        self.store.root()
    }

    pub fn store(&self) -> &DirStore {
        &self.store
    }

    pub fn normalize(&self, raw: &str) -> TargetId {
        self.normalizer.normalize(raw)
    }

    pub fn read_table(&self, path: &Path) -> Result<Vec<TableRow>> {
        table::read_table(path, &self.table_format)
    }

    /// Read a measurement table and merge it. The whole table is parsed
    /// before any record is touched.
    pub fn merge_table(
        &mut self,
        path: &Path,
        options: &MergeOptions,
        progress_cb: Option<&mut dyn FnMut(MergeProgress)>,
    ) -> Result<MergeReport> {
        let rows = self.read_table(path)?;
        self.merge_rows(&rows, options, progress_cb)
    }

    pub fn merge_rows(
        &mut self,
        rows: &[TableRow],
        options: &MergeOptions,
        progress_cb: Option<&mut dyn FnMut(MergeProgress)>,
    ) -> Result<MergeReport> {
        let aperture = self.table_format.aperture_index(&options.aperture)?;
        merge::merge(
            &mut self.store,
            rows,
            aperture,
            &self.normalizer,
            options,
            progress_cb,
        )
    }

    /// Remove every `marker` line from a target's record.
    pub fn strip(
        &mut self,
        name: &str,
        marker: &str,
        label: &str,
        source: FilterSource,
    ) -> Result<(TargetId, RewriteOutcome)> {
        let id = self.normalize(name);
        let outcome = rewrite::strip(&mut self.store, &id, marker, label, source)?;
        Ok((id, outcome))
    }

    /// Put a target's backup back in place and discard it.
    pub fn restore(&mut self, name: &str, label: &str) -> Result<TargetId> {
        let id = self.normalize(name);
        self.restore_target(&id, label)?;
        Ok(id)
    }

    /// Like [`Archive::restore`] for an identifier already in archive form,
    /// such as one returned by [`DirStore::list`].
    pub fn restore_target(&mut self, id: &TargetId, label: &str) -> Result<()> {
        rewrite::restore(&mut self.store, id, label)
    }

    /// Describe every record in the archive.
    pub fn status(&self, marker: Option<&str>) -> Result<Vec<RecordStatus>> {
        let mut out = Vec::new();
        for stored in self.store.list()? {
            let record = self.store.read(&stored.id)?;
            let modified = std::fs::metadata(&stored.path)
                .and_then(|m| m.modified())
                .ok()
                .map(DateTime::<Utc>::from);
            out.push(RecordStatus {
                sha256: digest::file_sha256(&stored.path)?,
                lines: record.len(),
                measurements: record.measurements().count(),
                tagged: marker.map(|m| record.count_tag(m)),
                id: stored.id,
                path: stored.path,
                backups: stored.backups,
                modified,
            });
        }
        Ok(out)
    }
}
