//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into
//! core services. The intent is to avoid reading process-wide environment
//! variables during request handling, which can lead to inconsistent
//! behaviour in multi-threaded runtimes and test harnesses.

use crate::constants::{DEFAULT_DATA_DIR, MAPPINGS_DIR_NAME};
use crate::{MappingError, MappingResult};
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    mapping_data_dir: PathBuf,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    pub fn new(mapping_data_dir: PathBuf) -> MappingResult<Self> {
        if mapping_data_dir.as_os_str().is_empty() {
            return Err(MappingError::InvalidInput(
                "mapping_data_dir cannot be empty".into(),
            ));
        }

        Ok(Self { mapping_data_dir })
    }

    pub fn mapping_data_dir(&self) -> &Path {
        &self.mapping_data_dir
    }

    pub fn mappings_dir(&self) -> PathBuf {
        self.mapping_data_dir.join(MAPPINGS_DIR_NAME)
    }
}

/// Resolve the mapping data directory from an optional environment value.
///
/// If `value` is `None` or empty/whitespace, the default data directory is
/// used. The caller reads the environment once at startup and passes the raw
/// value in.
pub fn data_dir_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}
