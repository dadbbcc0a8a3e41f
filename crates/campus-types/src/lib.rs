//! Validated primitives shared by the Campus crates.
//!
//! Records arriving from the community backend are already shaped by the RPC layer, but a few
//! fields carry guarantees the tree builder and the view layer rely on:
//! - [`CommentId`]: an opaque, non-empty identifier with no whitespace
//! - [`NonEmptyText`]: free text with at least one non-whitespace character

/// Errors that can occur when constructing validated text types.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum TextError {
    /// The input was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
    /// An identifier contained whitespace
    #[error("Identifier cannot contain whitespace: {0:?}")]
    ContainsWhitespace(String),
}

/// Opaque identifier of a comment, assigned by the backend.
///
/// The value is never interpreted; it is only compared for equality and used as a grouping key.
/// Construction rejects empty values and values containing whitespace, since those can never
/// match another record's `parentCommentId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommentId(String);

impl CommentId {
    /// Validates `input` as a comment identifier.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::Empty`] for an empty value and [`TextError::ContainsWhitespace`]
    /// if any character is whitespace. The input is not trimmed.
    pub fn new(input: impl Into<String>) -> Result<Self, TextError> {
        let value = input.into();
        if value.is_empty() {
            return Err(TextError::Empty);
        }
        if value.chars().any(char::is_whitespace) {
            return Err(TextError::ContainsWhitespace(value));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for CommentId {
    type Err = TextError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl std::fmt::Display for CommentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CommentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for CommentId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for CommentId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        CommentId::new(s).map_err(serde::de::Error::custom)
    }
}

/// A string type that guarantees non-empty content.
///
/// Leading and trailing whitespace is trimmed during construction, so comment bodies and
/// display names render the same regardless of how the editor padded them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText`, trimming the input.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::Empty`] if nothing remains after trimming.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
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
