//! Declarative data-model manifest.
//!
//! The imaging platform learns about a plugin's custom data-model types from
//! declared metadata: each type is named by its schema element name plus
//! human-readable singular and plural labels. The manifest here is plain
//! data consumed by the composition root (logged at startup, exposed
//! read-only over REST); none of the host's registration machinery is
//! reproduced.

use crate::error::MappingResult;
use submap_types::{NonEmptyText, SchemaElementName};

/// One custom data-model type declared to the platform's metadata system.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DataModel {
    /// Schema element name, e.g. `rad:radiologyReadData`.
    pub schema_element: SchemaElementName,
    /// Singular display label.
    pub singular: NonEmptyText,
    /// Plural display label.
    pub plural: NonEmptyText,
}

impl DataModel {
    fn new(schema_element: &str, singular: &str, plural: &str) -> MappingResult<Self> {
        Ok(Self {
            schema_element: SchemaElementName::new(schema_element)?,
            singular: NonEmptyText::new(singular)?,
            plural: NonEmptyText::new(plural)?,
        })
    }
}

/// The plugin declaration: identity plus the data-model types it registers.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PluginManifest {
    /// Machine identifier of the plugin.
    pub id: NonEmptyText,
    /// Human-readable plugin name.
    pub name: NonEmptyText,
    /// Custom data-model types registered by this plugin.
    pub data_models: Vec<DataModel>,
}

/// Builds the manifest for this plugin: a biosample collection type and a
/// radiology read record type.
pub fn plugin_manifest() -> MappingResult<PluginManifest> {
    Ok(PluginManifest {
        id: NonEmptyText::new("workshopPlugin")?,
        name: NonEmptyText::new("XNAT Workshop Plugin")?,
        data_models: vec![
            DataModel::new(
                "workshop:biosampleCollection",
                "Biosample Collection",
                "Biosample Collections",
            )?,
            DataModel::new(
                "rad:radiologyReadData",
                "Radiology Read",
                "Radiology Reads",
            )?,
        ],
    })
}
