//! Validated identity types shared by the form crates.
//!
//! Form rows are addressed by a composite string key. For Task inputs the key is the coded
//! input type (`system|code`), suffixed with `|<index>` for repeated occurrences. For
//! QuestionnaireResponse items the key is the item's `linkId`.

use std::fmt;
use std::str::FromStr;

/// Separator between the parts of a row key.
pub const KEY_SEPARATOR: char = '|';

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}

/// Errors that can occur when parsing or building row keys.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("row key cannot be empty")]
    Empty,
    #[error("row key '{0}' has too many parts")]
    TooManyParts(String),
    #[error("row key '{0}' has an invalid repeat index")]
    InvalidIndex(String),
    #[error("row key part must not contain '|': {0}")]
    ReservedSeparator(String),
    #[error("row key '{0}' has no next repeat index")]
    IndexOverflow(String),
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// Returns `Err(TextError::Empty)` if the trimmed input is empty.
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

impl fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
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

fn key_part(input: &str) -> Result<NonEmptyText, KeyError> {
    if input.contains(KEY_SEPARATOR) {
        return Err(KeyError::ReservedSeparator(input.to_owned()));
    }
    NonEmptyText::new(input).map_err(|_| KeyError::Empty)
}

/// Identity of a form field.
///
/// Task inputs are identified by their coded type, QuestionnaireResponse items by `linkId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FieldIdentity {
    /// `(system, code)` of a Task input type coding.
    Coded {
        system: NonEmptyText,
        code: NonEmptyText,
    },
    /// `linkId` of a QuestionnaireResponse item.
    Link(NonEmptyText),
}

impl FieldIdentity {
    /// Builds a coded identity from a type coding.
    pub fn coded(system: &str, code: &str) -> Result<Self, KeyError> {
        Ok(Self::Coded {
            system: key_part(system)?,
            code: key_part(code)?,
        })
    }

    /// Builds a link identity from an item `linkId`.
    pub fn link(link_id: &str) -> Result<Self, KeyError> {
        Ok(Self::Link(key_part(link_id)?))
    }

    /// Returns the `code` of a coded identity, or the `linkId`.
    pub fn short_name(&self) -> &str {
        match self {
            Self::Coded { code, .. } => code.as_str(),
            Self::Link(link_id) => link_id.as_str(),
        }
    }
}

impl fmt::Display for FieldIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Coded { system, code } => write!(f, "{system}{KEY_SEPARATOR}{code}"),
            Self::Link(link_id) => write!(f, "{link_id}"),
        }
    }
}

/// Key of a single form row: a field identity plus an optional repeat index.
///
/// The first occurrence of a field has no index; clones are numbered from 1.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RowKey {
    identity: FieldIdentity,
    index: Option<u32>,
}

impl RowKey {
    pub fn new(identity: FieldIdentity) -> Self {
        Self {
            identity,
            index: None,
        }
    }

    pub fn with_index(identity: FieldIdentity, index: u32) -> Self {
        Self {
            identity,
            index: Some(index),
        }
    }

    pub fn identity(&self) -> &FieldIdentity {
        &self.identity
    }

    pub fn index(&self) -> Option<u32> {
        self.index
    }

    /// Index a clone of this row would receive if it were the last occurrence.
    ///
    /// Returns `Err(KeyError::IndexOverflow)` if this row already has the largest index.
    pub fn next_index(&self) -> Result<u32, KeyError> {
        match self.index {
            None => Ok(1),
            Some(index) => index
                .checked_add(1)
                .ok_or_else(|| KeyError::IndexOverflow(self.to_string())),
        }
    }
}

impl From<FieldIdentity> for RowKey {
    fn from(identity: FieldIdentity) -> Self {
        Self::new(identity)
    }
}

impl fmt::Display for RowKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}{KEY_SEPARATOR}{index}", self.identity),
            None => write!(f, "{}", self.identity),
        }
    }
}

impl FromStr for RowKey {
    type Err = KeyError;

    /// Parses `linkId`, `system|code` or `system|code|index`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(KEY_SEPARATOR).collect();
        match parts.as_slice() {
            [link_id] => Ok(Self::new(FieldIdentity::link(link_id)?)),
            [system, code] => Ok(Self::new(FieldIdentity::coded(system, code)?)),
            [system, code, index] => {
                let index = index
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| KeyError::InvalidIndex(s.to_owned()))?;
                Ok(Self::with_index(FieldIdentity::coded(system, code)?, index))
            }
            _ => Err(KeyError::TooManyParts(s.to_owned())),
        }
    }
}

impl serde::Serialize for RowKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for RowKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
