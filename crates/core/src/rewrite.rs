use tracing::debug;

use crate::domain::{FilterSource, TargetId};
use crate::error::{Error, Result};
use crate::record::{Measurement, Record};
use crate::store::RecordStore;

/// What a single record rewrite changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RewriteOutcome {
    /// Lines dropped because they belonged to the marker.
    pub removed: usize,
    /// Measurement lines appended.
    pub added: usize,
    /// Whether this rewrite created the backup.
    pub backup_created: bool,
}

/// Back up the record (once) and return its content without the lines
/// belonging to `marker`. Nothing is written to the record itself.
pub fn filter_tag<S: RecordStore + ?Sized>(
    store: &mut S,
    id: &TargetId,
    marker: &str,
    label: &str,
    source: FilterSource,
) -> Result<(Record, RewriteOutcome)> {
    if marker.is_empty() || label.is_empty() {
        return Err(Error::InvalidTag);
    }

    let backup_created = if store.backup_exists(id, label) {
        false
    } else {
        store.create_backup(id, label)?
    };
    if backup_created {
        debug!(target_id = %id, label, "created backup");
    }

    let mut record = match source {
        FilterSource::Backup => store.read_backup(id, label)?,
        // Fall back to the backup when the record itself has gone missing.
        FilterSource::Current if store.exists(id) => store.read(id)?,
        FilterSource::Current => store.read_backup(id, label)?,
    };
    let removed = record.remove_tag(marker);

    Ok((
        record,
        RewriteOutcome {
            removed,
            added: 0,
            backup_created,
        },
    ))
}

/// Replace every `marker` line of the record with `additions`, in order.
pub fn rewrite<S: RecordStore + ?Sized>(
    store: &mut S,
    id: &TargetId,
    marker: &str,
    label: &str,
    source: FilterSource,
    additions: Vec<Measurement>,
) -> Result<RewriteOutcome> {
    let (mut record, mut outcome) = filter_tag(store, id, marker, label, source)?;
    outcome.added = additions.len();
    for measurement in additions {
        record.push(measurement);
    }
    store.write(id, &record)?;
    Ok(outcome)
}

/// Remove every `marker` line from the record without adding anything.
pub fn strip<S: RecordStore + ?Sized>(
    store: &mut S,
    id: &TargetId,
    marker: &str,
    label: &str,
    source: FilterSource,
) -> Result<RewriteOutcome> {
    rewrite(store, id, marker, label, source, Vec::new())
}

/// Put the backup back in place of the record and discard the backup, so the
/// next merge starts a fresh backup cycle.
pub fn restore<S: RecordStore + ?Sized>(store: &mut S, id: &TargetId, label: &str) -> Result<()> {
    store.restore_backup(id, label)?;
    debug!(target_id = %id, label, "restored record from backup");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    const RECORD: &str = "A=1\nMIPS24 = 1.0e+01 +/- 2.0e+00 mJy\nB=2\n";

    fn id(s: &str) -> TargetId {
        TargetId::new(s)
    }

    fn seeded() -> MemoryStore {
        let mut store = MemoryStore::new();
        store.insert("hd029647", RECORD);
        store
    }

    fn m(value: f64) -> Measurement {
        Measurement::new("MIPS24", value, 1.0, "mJy").unwrap()
    }

    #[test]
    fn test_filter_tag_drops_marker_lines() {
        let mut store = seeded();
        let (record, outcome) =
            filter_tag(&mut store, &id("hd029647"), "MIPS", "mips24", FilterSource::Backup)
                .unwrap();
        assert_eq!(record.render(), "A=1\nB=2\n");
        assert_eq!(outcome.removed, 1);
        assert!(outcome.backup_created);
        // Record untouched until written
        assert_eq!(store.content("hd029647"), Some(RECORD));
    }

    #[test]
    fn test_strip_is_record_minus_marker_lines() {
        let mut store = seeded();
        strip(&mut store, &id("hd029647"), "MIPS", "mips24", FilterSource::Backup).unwrap();
        assert_eq!(store.content("hd029647"), Some("A=1\nB=2\n"));
        assert_eq!(store.backup_content("hd029647", "mips24"), Some(RECORD));
    }

    #[test]
    fn test_rewrite_appends_after_kept_lines() {
        let mut store = seeded();
        let outcome = rewrite(
            &mut store,
            &id("hd029647"),
            "MIPS24",
            "mips24",
            FilterSource::Backup,
            vec![m(12.0), m(13.0)],
        )
        .unwrap();
        assert_eq!(outcome.added, 2);
        assert_eq!(
            store.content("hd029647"),
            Some(
                "A=1\nB=2\nMIPS24 = 1.20e+01 +/- 1.00e+00 mJy\nMIPS24 = 1.30e+01 +/- 1.00e+00 mJy\n"
            )
        );
    }

    #[test]
    fn test_missing_record_and_backup_is_not_found() {
        let mut store = MemoryStore::new();
        let err = strip(&mut store, &id("hd000001"), "MIPS24", "mips24", FilterSource::Backup)
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(!store.exists(&id("hd000001")));
    }

    #[test]
    fn test_empty_marker_rejected() {
        let mut store = seeded();
        let err =
            strip(&mut store, &id("hd029647"), "", "mips24", FilterSource::Backup).unwrap_err();
        assert!(matches!(err, Error::InvalidTag));
        assert!(!store.backup_exists(&id("hd029647"), "mips24"));
    }

    #[test]
    fn test_backup_source_discards_intermediate_edits() {
        let mut store = seeded();
        rewrite(&mut store, &id("hd029647"), "MIPS24", "mips24", FilterSource::Backup, vec![m(12.0)])
            .unwrap();
        // A hand edit made after the first merge...
        let mut edited = store.read(&id("hd029647")).unwrap();
        edited.push(crate::record::RecordLine::Annotation("C=3".to_string()));
        store.write(&id("hd029647"), &edited).unwrap();

        // ...is lost by the second merge, which filters the stale backup.
        rewrite(&mut store, &id("hd029647"), "MIPS24", "mips24", FilterSource::Backup, vec![m(14.0)])
            .unwrap();
        assert_eq!(
            store.content("hd029647"),
            Some("A=1\nB=2\nMIPS24 = 1.40e+01 +/- 1.00e+00 mJy\n")
        );
    }

    #[test]
    fn test_current_source_keeps_intermediate_edits() {
        let mut store = seeded();
        rewrite(&mut store, &id("hd029647"), "MIPS24", "mips24", FilterSource::Current, vec![m(12.0)])
            .unwrap();
        let mut edited = store.read(&id("hd029647")).unwrap();
        edited.push(crate::record::RecordLine::Annotation("C=3".to_string()));
        store.write(&id("hd029647"), &edited).unwrap();

        rewrite(&mut store, &id("hd029647"), "MIPS24", "mips24", FilterSource::Current, vec![m(14.0)])
            .unwrap();
        assert_eq!(
            store.content("hd029647"),
            Some("A=1\nB=2\nC=3\nMIPS24 = 1.40e+01 +/- 1.00e+00 mJy\n")
        );
        assert_eq!(store.backup_content("hd029647", "mips24"), Some(RECORD));
    }

    #[test]
    fn test_restore_puts_backup_back() {
        let mut store = seeded();
        strip(&mut store, &id("hd029647"), "MIPS24", "mips24", FilterSource::Backup).unwrap();
        restore(&mut store, &id("hd029647"), "mips24").unwrap();
        assert_eq!(store.content("hd029647"), Some(RECORD));
        assert!(!store.backup_exists(&id("hd029647"), "mips24"));
    }

    #[test]
    fn test_restore_keeps_missing_final_newline() {
        let original = "sptype = B1V\nMIPS24 = 4.0e+00 +/- 1.0e+00 mJy";
        let mut store = MemoryStore::new();
        store.insert("hd029647", original);

        strip(&mut store, &id("hd029647"), "MIPS24", "mips24", FilterSource::Backup).unwrap();
        assert_eq!(store.content("hd029647"), Some("sptype = B1V\n"));
        restore(&mut store, &id("hd029647"), "mips24").unwrap();
        assert_eq!(store.content("hd029647"), Some(original));
    }

    #[test]
    fn test_strip_keeps_crlf_terminators() {
        let mut store = MemoryStore::new();
        store.insert(
            "hd029647",
            "sptype = B1V\r\nMIPS24 = 4.0e+00 +/- 1.0e+00 mJy\r\nIRAC1 = 1 +/- 1 mJy\r\n",
        );
        strip(&mut store, &id("hd029647"), "MIPS24", "mips24", FilterSource::Backup).unwrap();
        assert_eq!(
            store.content("hd029647"),
            Some("sptype = B1V\r\nIRAC1 = 1 +/- 1 mJy\r\n")
        );
    }

    #[test]
    fn test_restore_without_backup_fails() {
        let mut store = seeded();
        let err = restore(&mut store, &id("hd029647"), "mips24").unwrap_err();
        assert!(matches!(err, Error::BackupNotFound { .. }));
        assert_eq!(store.content("hd029647"), Some(RECORD));
    }
}
