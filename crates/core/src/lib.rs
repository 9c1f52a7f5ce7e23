//! # Submap Core
//!
//! Core business logic for the subject-mapping service.
//!
//! This crate contains pure data operations:
//! - The [`SubjectMapping`] entity correlating an external identity with an
//!   internal subject
//! - A typed storage boundary ([`SubjectMappingStore`]) with a file-backed
//!   implementation
//! - The [`SubjectMappingService`] exposing exact-match lookups over the
//!   mapping collection
//! - The declarative data-model manifest registered with the imaging
//!   platform's metadata system
//!
//! **No API concerns**: HTTP servers, OpenAPI documentation, or CLI parsing
//! belong in the `submap-run` and `submap-cli` binaries.

pub mod config;
pub mod constants;
pub mod entity;
pub mod error;
pub mod registry;
pub mod service;
pub mod store;

pub use config::CoreConfig;
pub use entity::{MappingId, NewSubjectMapping, SubjectMapping};
pub use error::{MappingError, MappingResult};
pub use registry::{plugin_manifest, DataModel, PluginManifest};
pub use service::SubjectMappingService;
pub use store::{FsSubjectMappingStore, SubjectMappingStore};

pub use submap_types::{NonEmptyText, SchemaElementName, TextError};
