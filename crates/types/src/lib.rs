//! Validated text primitives shared across the submap crates.
//!
//! Identifiers that cross crate boundaries (data-model labels, schema element
//! names) are validated once at construction and then carried as opaque
//! newtypes, so downstream code never has to re-check them.

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
    /// The input was not a valid `prefix:name` schema element name
    #[error("Invalid schema element name: {0}")]
    InvalidSchemaElementName(String),
}

/// A string type that guarantees non-empty content.
///
/// Wraps a `String` and ensures it contains at least one non-whitespace
/// character. Input is trimmed of leading and trailing whitespace during
/// construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed; if the trimmed result is empty,
    /// `TextError::Empty` is returned.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// A schema element name in the `prefix:name` form used by the imaging
/// platform's metadata registry (for example `rad:radiologyReadData`).
///
/// Both the prefix and the local name must be non-empty and contain only
/// ASCII alphanumerics or underscores; exactly one `:` separates them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaElementName(String);

impl SchemaElementName {
    /// Parses and validates a schema element name.
    ///
    /// # Errors
    ///
    /// Returns `TextError::InvalidSchemaElementName` if the input is not of
    /// the form `prefix:name` with both parts non-empty and composed of
    /// ASCII alphanumerics or underscores.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let raw = input.as_ref().trim();

        fn valid_part(part: &str) -> bool {
            !part.is_empty()
                && part
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_')
        }

        match raw.split_once(':') {
            Some((prefix, name)) if valid_part(prefix) && valid_part(name) => {
                Ok(Self(raw.to_owned()))
            }
            _ => Err(TextError::InvalidSchemaElementName(raw.to_owned())),
        }
    }

    /// Returns the full `prefix:name` string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the namespace prefix (the part before the colon).
    pub fn prefix(&self) -> &str {
        self.0.split_once(':').map(|(p, _)| p).unwrap_or(&self.0)
    }

    /// Returns the local name (the part after the colon).
    pub fn local_name(&self) -> &str {
        self.0.split_once(':').map(|(_, n)| n).unwrap_or(&self.0)
    }
}

impl std::fmt::Display for SchemaElementName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for SchemaElementName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for SchemaElementName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for SchemaElementName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SchemaElementName::new(&s).map_err(serde::de::Error::custom)
    }
}
