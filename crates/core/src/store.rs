//! Typed storage boundary for subject mappings.
//!
//! The original platform exposed persistence through dynamic
//! property-name-based queries; here the boundary is an explicit trait with
//! typed query methods, so the compiler checks every lookup site.
//!
//! ## Storage layout
//!
//! The file-backed implementation keeps one YAML document per mapping:
//!
//! ```text
//! <mapping_data_dir>/
//!   subject_mappings/
//!     <32hex-id>.yaml
//! ```
//!
//! Scans read the whole directory; entries that cannot be read or parsed are
//! logged at warn level and skipped. Direct retrieval by ID does not skip:
//! a corrupt document for a known ID is reported as an error.
//!
//! Writes are serialised by an internal lock (the duplicate-subject-ID guard
//! is a check-then-write and must not interleave across threads) and staged
//! to a temporary file before being renamed into place, so readers only ever
//! see complete documents. Reads take no lock.

use crate::config::CoreConfig;
use crate::constants::MAPPING_FILE_EXT;
use crate::entity::{MappingId, NewSubjectMapping, SubjectMapping};
use crate::error::{MappingError, MappingResult};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Persistence boundary for the subject-mapping collection.
///
/// Standard entity CRUD plus the exact-match queries backing
/// [`crate::SubjectMappingService`]. `find_by_record_id` returns *all*
/// matches; deciding what to do with duplicates is the caller's concern.
pub trait SubjectMappingStore: Send + Sync {
    /// Persists a new mapping, assigning its ID and timestamps.
    fn create(&self, new: NewSubjectMapping) -> MappingResult<SubjectMapping>;

    /// Retrieves a mapping by storage ID, `None` if absent.
    fn retrieve(&self, id: &MappingId) -> MappingResult<Option<SubjectMapping>>;

    /// Rewrites an existing mapping, refreshing its `updated` timestamp.
    fn update(&self, mapping: SubjectMapping) -> MappingResult<SubjectMapping>;

    /// Deletes a mapping by storage ID.
    fn delete(&self, id: &MappingId) -> MappingResult<()>;

    /// Lists every mapping in the store.
    fn list(&self) -> MappingResult<Vec<SubjectMapping>>;

    /// First mapping whose `subject_id` equals the input, `None` if absent.
    fn find_by_subject_id(&self, subject_id: &str) -> MappingResult<Option<SubjectMapping>>;

    /// All mappings matching both `record_id` and `source` exactly.
    fn find_by_record_id(&self, record_id: &str, source: &str)
        -> MappingResult<Vec<SubjectMapping>>;

    /// All mappings whose `source` equals the input.
    fn find_by_source(&self, source: &str) -> MappingResult<Vec<SubjectMapping>>;
}

/// File-backed [`SubjectMappingStore`] keeping one YAML document per mapping.
///
/// The store is shared across threads (`Arc<dyn SubjectMappingStore>`); all
/// mutating operations hold `write_lock` for their full duration so the
/// uniqueness check and the write it guards cannot interleave.
#[derive(Debug)]
pub struct FsSubjectMappingStore {
    mappings_dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FsSubjectMappingStore {
    /// Opens (and creates if necessary) the store under the configured data
    /// directory.
    ///
    /// # Errors
    ///
    /// Returns `MappingError::StorageDirCreation` if the mappings directory
    /// cannot be created.
    pub fn new(cfg: &CoreConfig) -> MappingResult<Self> {
        let mappings_dir = cfg.mappings_dir();
        fs::create_dir_all(&mappings_dir).map_err(MappingError::StorageDirCreation)?;
        Ok(Self {
            mappings_dir,
            write_lock: Mutex::new(()),
        })
    }

    /// Takes the writer lock. The lock guards no data of its own, so a
    /// poisoned guard (another writer panicked) is safe to recover.
    fn lock_writes(&self) -> std::sync::MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn mapping_path(&self, id: &MappingId) -> PathBuf {
        self.mappings_dir
            .join(format!("{}.{}", id, MAPPING_FILE_EXT))
    }

    /// Stages the document to a temporary file and renames it into place, so
    /// a concurrent scan never observes a half-written document.
    fn write_mapping(&self, mapping: &SubjectMapping) -> MappingResult<()> {
        let yaml = serde_yaml::to_string(mapping).map_err(MappingError::Serialization)?;
        let staging_path = self
            .mappings_dir
            .join(format!("{}.{}.tmp", mapping.id, MAPPING_FILE_EXT));
        fs::write(&staging_path, yaml).map_err(MappingError::FileWrite)?;
        fs::rename(&staging_path, self.mapping_path(&mapping.id)).map_err(MappingError::FileWrite)
    }

    /// Reads one mapping document, warning and returning `None` on any
    /// failure so that a single bad file never poisons a whole scan.
    fn read_mapping_lenient(path: &Path) -> Option<SubjectMapping> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                tracing::warn!("failed to read mapping file {}: {}", path.display(), e);
                return None;
            }
        };
        match serde_yaml::from_str(&contents) {
            Ok(mapping) => Some(mapping),
            Err(e) => {
                tracing::warn!("failed to parse mapping file {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Visits every readable mapping in directory enumeration order.
    ///
    /// `visit` returns `true` to continue scanning, `false` to stop early.
    fn scan(&self, mut visit: impl FnMut(SubjectMapping) -> bool) -> MappingResult<()> {
        let entries = match fs::read_dir(&self.mappings_dir) {
            Ok(entries) => entries,
            // A vanished directory reads as an empty collection.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(MappingError::FileRead(e)),
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if !path.is_file()
                || path.extension().and_then(|e| e.to_str()) != Some(MAPPING_FILE_EXT)
            {
                continue;
            }
            if let Some(mapping) = Self::read_mapping_lenient(&path) {
                if !visit(mapping) {
                    break;
                }
            }
        }

        Ok(())
    }
}

impl SubjectMappingStore for FsSubjectMappingStore {
    fn create(&self, new: NewSubjectMapping) -> MappingResult<SubjectMapping> {
        if new.subject_id.trim().is_empty() {
            return Err(MappingError::InvalidInput(
                "subject_id is required".into(),
            ));
        }

        // Held across the duplicate check and the write: two concurrent
        // creates for the same subject must not both pass the scan.
        let _guard = self.lock_writes();

        if self.find_by_subject_id(&new.subject_id)?.is_some() {
            return Err(MappingError::DuplicateSubjectId(new.subject_id));
        }

        let now = Utc::now();
        let mapping = SubjectMapping {
            id: MappingId::new(),
            subject_id: new.subject_id,
            record_id: new.record_id,
            source: new.source,
            created: now,
            updated: now,
        };
        self.write_mapping(&mapping)?;
        tracing::debug!("created mapping {} for subject {}", mapping.id, mapping.subject_id);
        Ok(mapping)
    }

    fn retrieve(&self, id: &MappingId) -> MappingResult<Option<SubjectMapping>> {
        let path = self.mapping_path(id);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(MappingError::FileRead(e)),
        };
        serde_yaml::from_str(&contents)
            .map(Some)
            .map_err(MappingError::Deserialization)
    }

    fn update(&self, mapping: SubjectMapping) -> MappingResult<SubjectMapping> {
        if mapping.subject_id.trim().is_empty() {
            return Err(MappingError::InvalidInput(
                "subject_id is required".into(),
            ));
        }
        let _guard = self.lock_writes();

        if self.retrieve(&mapping.id)?.is_none() {
            return Err(MappingError::NotFound(mapping.id.to_string()));
        }
        // Renaming onto another mapping's subject ID would break unique lookup.
        if let Some(existing) = self.find_by_subject_id(&mapping.subject_id)? {
            if existing.id != mapping.id {
                return Err(MappingError::DuplicateSubjectId(mapping.subject_id));
            }
        }

        let mapping = SubjectMapping {
            updated: Utc::now(),
            ..mapping
        };
        self.write_mapping(&mapping)?;
        Ok(mapping)
    }

    fn delete(&self, id: &MappingId) -> MappingResult<()> {
        let _guard = self.lock_writes();
        let path = self.mapping_path(id);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(MappingError::NotFound(id.to_string()))
            }
            Err(e) => Err(MappingError::FileDelete(e)),
        }
    }

    fn list(&self) -> MappingResult<Vec<SubjectMapping>> {
        let mut mappings = Vec::new();
        self.scan(|mapping| {
            mappings.push(mapping);
            true
        })?;
        Ok(mappings)
    }

    fn find_by_subject_id(&self, subject_id: &str) -> MappingResult<Option<SubjectMapping>> {
        let mut found = None;
        self.scan(|mapping| {
            if mapping.subject_id == subject_id {
                found = Some(mapping);
                false
            } else {
                true
            }
        })?;
        Ok(found)
    }

    fn find_by_record_id(
        &self,
        record_id: &str,
        source: &str,
    ) -> MappingResult<Vec<SubjectMapping>> {
        let mut matches = Vec::new();
        self.scan(|mapping| {
            if mapping.record_id == record_id && mapping.source == source {
                matches.push(mapping);
            }
            true
        })?;
        Ok(matches)
    }

    fn find_by_source(&self, source: &str) -> MappingResult<Vec<SubjectMapping>> {
        let mut matches = Vec::new();
        self.scan(|mapping| {
            if mapping.source == source {
                matches.push(mapping);
            }
            true
        })?;
        Ok(matches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store(temp: &TempDir) -> FsSubjectMappingStore {
        let cfg = CoreConfig::new(temp.path().to_path_buf()).unwrap();
        FsSubjectMappingStore::new(&cfg).unwrap()
    }

    fn new_mapping(subject_id: &str, record_id: &str, source: &str) -> NewSubjectMapping {
        NewSubjectMapping {
            subject_id: subject_id.into(),
            record_id: record_id.into(),
            source: source.into(),
        }
    }

    #[test]
    fn test_create_assigns_id_and_timestamps() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        let mapping = store.create(new_mapping("S1", "R1", "REDCap")).unwrap();
        assert_eq!(mapping.subject_id, "S1");
        assert_eq!(mapping.record_id, "R1");
        assert_eq!(mapping.source, "REDCap");
        assert_eq!(mapping.created, mapping.updated);
        assert_eq!(mapping.id.as_str().len(), 32);
    }

    #[test]
    fn test_create_rejects_empty_subject_id() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        assert!(matches!(
            store.create(new_mapping("   ", "R1", "REDCap")),
            Err(MappingError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_create_rejects_duplicate_subject_id() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        store.create(new_mapping("S1", "R1", "REDCap")).unwrap();
        assert!(matches!(
            store.create(new_mapping("S1", "R2", "OpenClinica")),
            Err(MappingError::DuplicateSubjectId(id)) if id == "S1"
        ));
    }

    #[test]
    fn test_retrieve_round_trips() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        let created = store.create(new_mapping("S1", "R1", "REDCap")).unwrap();
        let retrieved = store.retrieve(&created.id).unwrap().unwrap();
        assert_eq!(retrieved, created);
    }

    #[test]
    fn test_retrieve_unknown_id_is_none() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        assert!(store.retrieve(&MappingId::new()).unwrap().is_none());
    }

    #[test]
    fn test_update_rewrites_fields_and_refreshes_timestamp() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        let created = store.create(new_mapping("S1", "R1", "REDCap")).unwrap();
        let mut changed = created.clone();
        changed.record_id = "R99".into();

        let updated = store.update(changed).unwrap();
        assert_eq!(updated.record_id, "R99");
        assert!(updated.updated >= created.updated);

        let retrieved = store.retrieve(&created.id).unwrap().unwrap();
        assert_eq!(retrieved.record_id, "R99");
    }

    #[test]
    fn test_update_unknown_id_is_not_found() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        let orphan = SubjectMapping {
            id: MappingId::new(),
            subject_id: "S1".into(),
            record_id: "R1".into(),
            source: "REDCap".into(),
            created: Utc::now(),
            updated: Utc::now(),
        };
        assert!(matches!(
            store.update(orphan),
            Err(MappingError::NotFound(_))
        ));
    }

    #[test]
    fn test_update_rejects_stealing_subject_id() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        store.create(new_mapping("S1", "R1", "REDCap")).unwrap();
        let second = store.create(new_mapping("S2", "R2", "REDCap")).unwrap();

        let mut renamed = second.clone();
        renamed.subject_id = "S1".into();
        assert!(matches!(
            store.update(renamed),
            Err(MappingError::DuplicateSubjectId(id)) if id == "S1"
        ));
    }

    #[test]
    fn test_delete_removes_mapping() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        let created = store.create(new_mapping("S1", "R1", "REDCap")).unwrap();
        store.delete(&created.id).unwrap();
        assert!(store.retrieve(&created.id).unwrap().is_none());
        assert!(matches!(
            store.delete(&created.id),
            Err(MappingError::NotFound(_))
        ));
    }

    #[test]
    fn test_list_returns_every_mapping() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        store.create(new_mapping("S1", "R1", "REDCap")).unwrap();
        store.create(new_mapping("S2", "R2", "OpenClinica")).unwrap();

        let mut subject_ids: Vec<String> = store
            .list()
            .unwrap()
            .into_iter()
            .map(|m| m.subject_id)
            .collect();
        subject_ids.sort();
        assert_eq!(subject_ids, vec!["S1", "S2"]);
    }

    #[test]
    fn test_find_by_subject_id_absent() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        store.create(new_mapping("S1", "R1", "REDCap")).unwrap();
        assert!(store.find_by_subject_id("S2").unwrap().is_none());
    }

    #[test]
    fn test_find_by_subject_id_present() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        let created = store.create(new_mapping("S1", "R1", "REDCap")).unwrap();
        store.create(new_mapping("S2", "R2", "REDCap")).unwrap();

        let found = store.find_by_subject_id("S1").unwrap().unwrap();
        assert_eq!(found, created);
    }

    #[test]
    fn test_find_by_record_id_matches_both_fields() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        store.create(new_mapping("S1", "R1", "REDCap")).unwrap();
        store.create(new_mapping("S2", "R2", "REDCap")).unwrap();

        let matches = store.find_by_record_id("R1", "REDCap").unwrap();
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].subject_id, "S1");
    }

    #[test]
    fn test_find_by_record_id_requires_matching_source() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        store.create(new_mapping("S1", "R1", "REDCap")).unwrap();
        assert!(store.find_by_record_id("R1", "OpenClinica").unwrap().is_empty());
    }

    #[test]
    fn test_find_by_record_id_tolerates_duplicate_pairs() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        // Same (record_id, source) pair under two different subjects is
        // legal data; callers take the first match.
        store.create(new_mapping("S1", "R1", "REDCap")).unwrap();
        store.create(new_mapping("S2", "R1", "REDCap")).unwrap();

        let matches = store.find_by_record_id("R1", "REDCap").unwrap();
        assert_eq!(matches.len(), 2);
    }

    #[test]
    fn test_find_by_source_returns_all_and_only_matches() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        store.create(new_mapping("S1", "R1", "REDCap")).unwrap();
        store.create(new_mapping("S2", "R2", "REDCap")).unwrap();
        store.create(new_mapping("S3", "R3", "OpenClinica")).unwrap();

        let mut subject_ids: Vec<String> = store
            .find_by_source("REDCap")
            .unwrap()
            .into_iter()
            .map(|m| m.subject_id)
            .collect();
        subject_ids.sort();
        assert_eq!(subject_ids, vec!["S1", "S2"]);
    }

    #[test]
    fn test_find_by_source_no_matches_is_empty_not_error() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        store.create(new_mapping("S1", "R1", "REDCap")).unwrap();
        assert!(store.find_by_source("Nonexistent").unwrap().is_empty());
    }

    #[test]
    fn test_scan_skips_unparseable_files() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        store.create(new_mapping("S1", "R1", "REDCap")).unwrap();
        fs::write(
            store.mappings_dir.join("garbage.yaml"),
            "][ not yaml at all",
        )
        .unwrap();
        fs::write(store.mappings_dir.join("notes.txt"), "ignored").unwrap();

        let mappings = store.list().unwrap();
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0].subject_id, "S1");
    }

    #[test]
    fn test_concurrent_creates_enforce_unique_subject_id() {
        use std::sync::{Arc, Barrier};

        let temp = TempDir::new().unwrap();
        let store = Arc::new(test_store(&temp));

        // Two simultaneous creates for the same subject must resolve to
        // exactly one stored mapping; repeat to give the race a chance.
        for round in 0..20 {
            let subject_id = format!("S{round}");
            let barrier = Arc::new(Barrier::new(2));

            let handles: Vec<_> = (0..2)
                .map(|_| {
                    let store = Arc::clone(&store);
                    let barrier = Arc::clone(&barrier);
                    let subject_id = subject_id.clone();
                    std::thread::spawn(move || {
                        barrier.wait();
                        store
                            .create(new_mapping(&subject_id, "R1", "REDCap"))
                            .is_ok()
                    })
                })
                .collect();

            let successes = handles
                .into_iter()
                .map(|h| h.join().unwrap())
                .filter(|ok| *ok)
                .count();
            assert_eq!(successes, 1, "round {round}: exactly one create must win");

            let stored = store
                .list()
                .unwrap()
                .into_iter()
                .filter(|m| m.subject_id == subject_id)
                .count();
            assert_eq!(stored, 1, "round {round}: one mapping for {subject_id}");
        }
    }

    #[test]
    fn test_readers_never_observe_partial_documents() {
        use std::sync::Arc;

        let temp = TempDir::new().unwrap();
        let store = Arc::new(test_store(&temp));
        let created = store.create(new_mapping("S1", "R1", "REDCap")).unwrap();

        let writer = {
            let store = Arc::clone(&store);
            let mut mapping = created.clone();
            std::thread::spawn(move || {
                for i in 0..200 {
                    mapping.record_id = format!("R{i}");
                    mapping = store.update(mapping.clone()).unwrap();
                }
            })
        };

        // A stored mapping must stay visible while it is being rewritten:
        // scans must not skip it and direct retrieval must not error.
        for _ in 0..200 {
            assert!(store.find_by_subject_id("S1").unwrap().is_some());
            assert!(store.retrieve(&created.id).unwrap().is_some());
        }

        writer.join().unwrap();
    }

    #[test]
    fn test_writes_leave_no_staging_files_and_scans_ignore_them() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        let created = store.create(new_mapping("S1", "R1", "REDCap")).unwrap();
        let mut changed = created.clone();
        changed.record_id = "R2".into();
        store.update(changed).unwrap();

        let stray_staging: Vec<_> = fs::read_dir(&store.mappings_dir)
            .unwrap()
            .flatten()
            .filter(|e| e.path().extension().and_then(|x| x.to_str()) == Some("tmp"))
            .collect();
        assert!(stray_staging.is_empty());

        // A staging file left by a crashed writer is not a mapping.
        fs::write(
            store
                .mappings_dir
                .join(format!("{}.yaml.tmp", MappingId::new())),
            "subject_id: ghost",
        )
        .unwrap();
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn test_empty_strings_are_ordinary_non_matching_values() {
        let temp = TempDir::new().unwrap();
        let store = test_store(&temp);

        store.create(new_mapping("S1", "R1", "REDCap")).unwrap();
        assert!(store.find_by_subject_id("").unwrap().is_none());
        assert!(store.find_by_record_id("", "").unwrap().is_empty());
        assert!(store.find_by_source("").unwrap().is_empty());
    }
}
