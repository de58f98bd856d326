use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::domain::TargetId;
use crate::error::{Error, Result};
use crate::record::Record;

/// Separator between the identifier and the source label in backup names.
pub const BACKUP_INFIX: &str = "_old_";

pub const DEFAULT_EXTENSION: &str = "dat";

/// Storage of archive records and their one-shot backups.
///
/// A backup is keyed by target and source label. Once created it is never
/// replaced: `create_backup` on an existing backup does nothing, so the first
/// pre-merge state survives any number of later runs.
pub trait RecordStore {
    fn exists(&self, id: &TargetId) -> bool;
    fn read(&self, id: &TargetId) -> Result<Record>;
    fn write(&mut self, id: &TargetId, record: &Record) -> Result<()>;
    fn backup_exists(&self, id: &TargetId, label: &str) -> bool;
    /// Copy the current record to its backup unless a backup already exists.
    /// Returns `true` if a backup was created.
    fn create_backup(&mut self, id: &TargetId, label: &str) -> Result<bool>;
    fn read_backup(&self, id: &TargetId, label: &str) -> Result<Record>;
    /// Move the backup back over the record, byte for byte. The backup is
    /// gone afterwards.
    fn restore_backup(&mut self, id: &TargetId, label: &str) -> Result<()>;
}

/// A record file found in an archive directory.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: TargetId,
    pub path: PathBuf,
    /// Source labels of the backups present for this record.
    pub backups: Vec<String>,
}

/// Archive kept as one `<id>.<ext>` file per target in a single directory.
#[derive(Debug, Clone)]
pub struct DirStore {
    root: PathBuf,
    extension: String,
}

impl DirStore {
    pub fn new(root: impl Into<PathBuf>, extension: &str) -> Self {
        Self {
            root: root.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn record_path(&self, id: &TargetId) -> PathBuf {
        self.root.join(format!("{}.{}", id, self.extension))
    }

    pub fn backup_path(&self, id: &TargetId, label: &str) -> PathBuf {
        self.root
            .join(format!("{}{}{}.{}", id, BACKUP_INFIX, label, self.extension))
    }

    /// List record files with the backups found next to them, sorted by id.
    pub fn list(&self) -> Result<Vec<StoredRecord>> {
        let mut records: BTreeMap<String, StoredRecord> = BTreeMap::new();
        let mut backups: Vec<(String, String)> = Vec::new();

        for entry in WalkDir::new(&self.root).min_depth(1).max_depth(1) {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(self.extension.as_str()) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match stem.split_once(BACKUP_INFIX) {
                Some((id, label)) => backups.push((id.to_string(), label.to_string())),
                None => {
                    records.insert(
                        stem.to_string(),
                        StoredRecord {
                            id: TargetId::new(stem),
                            path: path.to_path_buf(),
                            backups: Vec::new(),
                        },
                    );
                }
            }
        }

        for (id, label) in backups {
            if let Some(record) = records.get_mut(&id) {
                record.backups.push(label);
            }
        }
        let mut out: Vec<StoredRecord> = records.into_values().collect();
        for record in &mut out {
            record.backups.sort();
        }
        Ok(out)
    }
}

impl RecordStore for DirStore {
    fn exists(&self, id: &TargetId) -> bool {
        self.record_path(id).is_file()
    }

    fn read(&self, id: &TargetId) -> Result<Record> {
        let path = self.record_path(id);
        if !path.is_file() {
            return Err(Error::RecordNotFound {
                id: id.to_string(),
                path,
            });
        }
        Ok(Record::parse(&fs::read_to_string(&path)?))
    }

    /// Write through a sibling temporary file and rename, so a failed write
    /// never leaves a truncated record behind.
    fn write(&mut self, id: &TargetId, record: &Record) -> Result<()> {
        let path = self.record_path(id);
        let tmp = self.root.join(format!(".{}.{}.tmp", id, self.extension));
        fs::write(&tmp, record.render())?;
        if let Err(e) = fs::rename(&tmp, &path) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn backup_exists(&self, id: &TargetId, label: &str) -> bool {
        self.backup_path(id, label).is_file()
    }

    fn create_backup(&mut self, id: &TargetId, label: &str) -> Result<bool> {
        let backup = self.backup_path(id, label);
        if backup.is_file() {
            return Ok(false);
        }
        let path = self.record_path(id);
        if !path.is_file() {
            return Err(Error::RecordNotFound {
                id: id.to_string(),
                path,
            });
        }
        fs::copy(&path, &backup)?;
        Ok(true)
    }

    fn read_backup(&self, id: &TargetId, label: &str) -> Result<Record> {
        let path = self.backup_path(id, label);
        if !path.is_file() {
            return Err(Error::BackupNotFound {
                id: id.to_string(),
                path,
            });
        }
        Ok(Record::parse(&fs::read_to_string(&path)?))
    }

    fn restore_backup(&mut self, id: &TargetId, label: &str) -> Result<()> {
        let backup = self.backup_path(id, label);
        if !backup.is_file() {
            return Err(Error::BackupNotFound {
                id: id.to_string(),
                path: backup,
            });
        }
        fs::rename(&backup, self.record_path(id))?;
        Ok(())
    }
}

/// In-memory store holding rendered record text.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    records: BTreeMap<TargetId, String>,
    backups: BTreeMap<(TargetId, String), String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a record with raw file content.
    pub fn insert(&mut self, id: &str, content: &str) {
        self.records.insert(TargetId::new(id), content.to_string());
    }

    pub fn content(&self, id: &str) -> Option<&str> {
        self.records.get(&TargetId::new(id)).map(String::as_str)
    }

    pub fn backup_content(&self, id: &str, label: &str) -> Option<&str> {
        self.backups
            .get(&(TargetId::new(id), label.to_string()))
            .map(String::as_str)
    }

    fn missing(id: &TargetId) -> Error {
        Error::RecordNotFound {
            id: id.to_string(),
            path: PathBuf::from(format!("memory:{id}")),
        }
    }
}

impl RecordStore for MemoryStore {
    fn exists(&self, id: &TargetId) -> bool {
        self.records.contains_key(id)
    }

    fn read(&self, id: &TargetId) -> Result<Record> {
        self.records
            .get(id)
            .map(|c| Record::parse(c))
            .ok_or_else(|| Self::missing(id))
    }

    fn write(&mut self, id: &TargetId, record: &Record) -> Result<()> {
        self.records.insert(id.clone(), record.render());
        Ok(())
    }

    fn backup_exists(&self, id: &TargetId, label: &str) -> bool {
        self.backups.contains_key(&(id.clone(), label.to_string()))
    }

    fn create_backup(&mut self, id: &TargetId, label: &str) -> Result<bool> {
        let key = (id.clone(), label.to_string());
        if self.backups.contains_key(&key) {
            return Ok(false);
        }
        let content = self.records.get(id).ok_or_else(|| Self::missing(id))?;
        self.backups.insert(key, content.clone());
        Ok(true)
    }

    fn read_backup(&self, id: &TargetId, label: &str) -> Result<Record> {
        self.backups
            .get(&(id.clone(), label.to_string()))
            .map(|c| Record::parse(c))
            .ok_or_else(|| Error::BackupNotFound {
                id: id.to_string(),
                path: PathBuf::from(format!("memory:{id}{BACKUP_INFIX}{label}")),
            })
    }

    fn restore_backup(&mut self, id: &TargetId, label: &str) -> Result<()> {
        let content = self
            .backups
            .remove(&(id.clone(), label.to_string()))
            .ok_or_else(|| Error::BackupNotFound {
                id: id.to_string(),
                path: PathBuf::from(format!("memory:{id}{BACKUP_INFIX}{label}")),
            })?;
        self.records.insert(id.clone(), content);
        Ok(())
    }
}
