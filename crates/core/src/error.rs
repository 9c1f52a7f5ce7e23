#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid label: {0}")]
    Text(#[from] submap_types::TextError),
    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to write mapping file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read mapping file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to delete mapping file: {0}")]
    FileDelete(std::io::Error),
    #[error("failed to serialize mapping: {0}")]
    Serialization(serde_yaml::Error),
    #[error("failed to deserialize mapping: {0}")]
    Deserialization(serde_yaml::Error),
    #[error("a mapping for subject ID {0} already exists")]
    DuplicateSubjectId(String),
    #[error("no mapping with ID {0}")]
    NotFound(String),
}

pub type MappingResult<T> = std::result::Result<T, MappingError>;
