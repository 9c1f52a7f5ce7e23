//! The subject-mapping entity and its storage identifier.
//!
//! A [`SubjectMapping`] correlates a subject's identity in an external source
//! system (for example a clinical data-capture platform) with the internal
//! subject identifier used by the imaging platform.
//!
//! ## Canonical mapping ID form
//!
//! Storage identifiers are *canonical* UUIDs: **32 lowercase hexadecimal
//! characters** (no hyphens), the same value `Uuid::new_v4().simple()`
//! produces. Externally supplied identifiers (CLI/API inputs) must already be
//! in canonical form; use [`MappingId::parse`] to validate them.

use crate::error::{MappingError, MappingResult};
use chrono::{DateTime, Utc};

/// Storage identifier for a mapping, guaranteed canonical once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MappingId(String);

impl MappingId {
    /// Generates a fresh random identifier in canonical form.
    pub fn new() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Validates an externally supplied identifier.
    ///
    /// # Errors
    ///
    /// Returns `MappingError::InvalidInput` unless the input is exactly 32
    /// lowercase hex characters.
    pub fn parse(input: &str) -> MappingResult<Self> {
        let canonical = input.len() == 32
            && input
                .chars()
                .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase());
        if !canonical {
            return Err(MappingError::InvalidInput(format!(
                "mapping ID must be 32 lowercase hex characters, got {input:?}"
            )));
        }
        Ok(Self(input.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for MappingId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MappingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for MappingId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for MappingId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for MappingId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        MappingId::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A record correlating an external identity with an internal subject.
///
/// Persisted as one YAML document per mapping. The (`record_id`, `source`)
/// pair is treated as a lookup key by [`crate::SubjectMappingService`], but
/// its uniqueness is not enforced; `subject_id` uniqueness is enforced by the
/// store on create and update.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct SubjectMapping {
    /// Storage identifier, assigned at creation.
    pub id: MappingId,
    /// Internal subject identifier, unique within the store.
    pub subject_id: String,
    /// Identifier of the subject as known in the external source system.
    pub record_id: String,
    /// Identifier naming the external source system.
    pub source: String,
    /// When the mapping was created.
    pub created: DateTime<Utc>,
    /// When the mapping was last written.
    pub updated: DateTime<Utc>,
}

/// Caller-supplied fields for a mapping that does not exist yet.
///
/// The storage identifier and timestamps are assigned by the store.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct NewSubjectMapping {
    pub subject_id: String,
    pub record_id: String,
    pub source: String,
}
