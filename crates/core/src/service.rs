//! Exact-match lookup service over the subject-mapping collection.

use crate::entity::{MappingId, NewSubjectMapping, SubjectMapping};
use crate::error::MappingResult;
use crate::store::SubjectMappingStore;
use std::sync::Arc;

/// Service exposing exact-match queries over subject mappings.
///
/// Holds no in-process mutable state of its own; every operation is a
/// synchronous, independent call into the storage boundary. "Not found" on
/// the query operations is an absent result, never an error; storage faults
/// propagate unchanged.
#[derive(Clone)]
pub struct SubjectMappingService {
    store: Arc<dyn SubjectMappingStore>,
}

impl SubjectMappingService {
    /// Creates a service over the given storage boundary.
    pub fn new(store: Arc<dyn SubjectMappingStore>) -> Self {
        Self { store }
    }

    /// Finds the mapping with the indicated subject ID.
    ///
    /// # Returns
    /// The mapping with the indicated subject ID, `None` if not found.
    pub fn find_by_subject_id(&self, subject_id: &str) -> MappingResult<Option<SubjectMapping>> {
        self.store.find_by_subject_id(subject_id)
    }

    /// Finds the mapping with the indicated record ID in the specified
    /// source system.
    ///
    /// If duplicate (`record_id`, `source`) pairs exist, the first mapping
    /// found is returned and the rest are silently ignored.
    ///
    /// # Returns
    /// The first matching mapping, `None` if not found.
    pub fn find_by_record_id(
        &self,
        record_id: &str,
        source: &str,
    ) -> MappingResult<Option<SubjectMapping>> {
        let matches = self.store.find_by_record_id(record_id, source)?;
        Ok(matches.into_iter().next())
    }

    /// Finds all mappings in the indicated source system.
    ///
    /// # Returns
    /// All mappings from the indicated source system; empty if none match.
    pub fn find_by_source(&self, source: &str) -> MappingResult<Vec<SubjectMapping>> {
        self.store.find_by_source(source)
    }

    /// Creates a new mapping.
    pub fn create(&self, new: NewSubjectMapping) -> MappingResult<SubjectMapping> {
        self.store.create(new)
    }

    /// Retrieves a mapping by storage ID.
    pub fn retrieve(&self, id: &MappingId) -> MappingResult<Option<SubjectMapping>> {
        self.store.retrieve(id)
    }

    /// Updates an existing mapping.
    pub fn update(&self, mapping: SubjectMapping) -> MappingResult<SubjectMapping> {
        self.store.update(mapping)
    }

    /// Deletes a mapping by storage ID.
    pub fn delete(&self, id: &MappingId) -> MappingResult<()> {
        self.store.delete(id)
    }

    /// Lists every mapping.
    pub fn list(&self) -> MappingResult<Vec<SubjectMapping>> {
        self.store.list()
    }
}
