//! Shared constants for the submap core crate.

/// Directory under the mapping data dir holding one YAML document per mapping.
pub const MAPPINGS_DIR_NAME: &str = "subject_mappings";

/// File extension for stored mapping documents.
pub const MAPPING_FILE_EXT: &str = "yaml";

/// Default mapping data directory when no override is supplied.
pub const DEFAULT_DATA_DIR: &str = "/mapping_data";
