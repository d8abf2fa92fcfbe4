//! The format-agnostic record every codec reads and writes.
//!
//! An [`Archive`] is a kind tag plus an ordered map of named fields, each either a single
//! unsigned integer or a list of them. Types become persistable by converting to and from
//! an archive; the codecs never see the types themselves.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::Result;

/// A single archive field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Field {
    /// One value
    Scalar(u64),
    /// A sequence of values
    List(Vec<u64>),
}

/// A named, typed record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    kind: String,
    fields: BTreeMap<String, Field>,
}

impl Archive {
    /// Creates an empty archive of the given kind.
    #[must_use]
    pub fn new(kind: impl Into<String>) -> Self {
        Archive {
            kind: kind.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Adds a scalar field.
    #[must_use]
    pub fn with_scalar(mut self, name: &str, value: u64) -> Self {
        self.fields.insert(name.to_string(), Field::Scalar(value));
        self
    }

    /// Adds a list field.
    #[must_use]
    pub fn with_list(mut self, name: &str, values: impl IntoIterator<Item = u64>) -> Self {
        self.fields
            .insert(name.to_string(), Field::List(values.into_iter().collect()));
        self
    }

    /// Adds a field decoded from a record.
    ///
    /// # Errors
    /// Returns [`crate::Error::CorruptData`] for invalid or repeated names.
    pub(crate) fn insert(&mut self, name: String, field: Field) -> Result<()> {
        if !is_valid_name(&name) {
            return Err(corrupt_error!("invalid field name '{}'", name));
        }
        if self.fields.contains_key(&name) {
            return Err(corrupt_error!("field '{}' appears twice", name));
        }
        self.fields.insert(name, field);
        Ok(())
    }

    /// Returns the kind tag.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns all fields ordered by name.
    #[must_use]
    pub fn fields(&self) -> &BTreeMap<String, Field> {
        &self.fields
    }

    /// Checks the kind tag.
    ///
    /// # Errors
    /// Returns [`crate::Error::CorruptData`] if the archive holds a different kind.
    pub fn expect_kind(&self, kind: &str) -> Result<()> {
        if self.kind == kind {
            Ok(())
        } else {
            Err(corrupt_error!(
                "expected a '{}' record, found '{}'",
                kind,
                self.kind
            ))
        }
    }

    /// Returns the scalar field `name`.
    ///
    /// # Errors
    /// Returns [`crate::Error::CorruptData`] if the field is missing or is a list.
    pub fn scalar(&self, name: &str) -> Result<u64> {
        match self.fields.get(name) {
            Some(Field::Scalar(value)) => Ok(*value),
            Some(Field::List(_)) => Err(corrupt_error!("field '{}' is not a scalar", name)),
            None => Err(corrupt_error!("missing field '{}'", name)),
        }
    }

    /// Returns the list field `name`.
    ///
    /// # Errors
    /// Returns [`crate::Error::CorruptData`] if the field is missing or is a scalar.
    pub fn list(&self, name: &str) -> Result<&[u64]> {
        match self.fields.get(name) {
            Some(Field::List(values)) => Ok(values),
            Some(Field::Scalar(_)) => Err(corrupt_error!("field '{}' is not a list", name)),
            None => Err(corrupt_error!("missing field '{}'", name)),
        }
    }
}

/// Kind and field names are restricted to ASCII identifiers so every format can carry
/// them unquoted.
pub(crate) fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|byte| byte.is_ascii_alphanumeric() || byte == b'_')
}
