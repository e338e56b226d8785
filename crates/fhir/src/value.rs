//! Typed `value[x]` support.
//!
//! FHIR encodes a choice-typed value as a single member whose name carries the type, e.g.
//! `valueString` or `valueReference`. [`TypedValue`] is the in-memory form of such a member and
//! [`ValueKind`] names the type without a value.

use crate::{Coding, FhirError, FhirResult, Identifier, Reference};
use serde_json::{Map, Value};
use std::fmt;

const VALUE_PREFIX: &str = "value";

/// The value types a form field can carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Integer,
    Decimal,
    Date,
    Time,
    DateTime,
    Instant,
    Uri,
    Url,
    Reference,
    Coding,
    Identifier,
    Boolean,
}

impl ValueKind {
    pub const ALL: [ValueKind; 13] = [
        Self::String,
        Self::Integer,
        Self::Decimal,
        Self::Date,
        Self::Time,
        Self::DateTime,
        Self::Instant,
        Self::Uri,
        Self::Url,
        Self::Reference,
        Self::Coding,
        Self::Identifier,
        Self::Boolean,
    ];

    /// FHIR type code, as used in `ElementDefinition.type.code`.
    pub fn type_code(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "dateTime",
            Self::Instant => "instant",
            Self::Uri => "uri",
            Self::Url => "url",
            Self::Reference => "Reference",
            Self::Coding => "Coding",
            Self::Identifier => "Identifier",
            Self::Boolean => "boolean",
        }
    }

    /// Name of the `value[x]` member for this kind, e.g. `valueDateTime`.
    pub fn wire_key(self) -> &'static str {
        match self {
            Self::String => "valueString",
            Self::Integer => "valueInteger",
            Self::Decimal => "valueDecimal",
            Self::Date => "valueDate",
            Self::Time => "valueTime",
            Self::DateTime => "valueDateTime",
            Self::Instant => "valueInstant",
            Self::Uri => "valueUri",
            Self::Url => "valueUrl",
            Self::Reference => "valueReference",
            Self::Coding => "valueCoding",
            Self::Identifier => "valueIdentifier",
            Self::Boolean => "valueBoolean",
        }
    }

    /// Parses a type code, ignoring ASCII case (`dateTime`, `datetime` and `DateTime` agree).
    pub fn from_type_code(code: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.type_code().eq_ignore_ascii_case(code.trim()))
    }

    fn from_wire_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.wire_key() == key)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_code())
    }
}

/// A single typed value in canonical wire form.
#[derive(Clone, Debug, PartialEq)]
pub enum TypedValue {
    String(String),
    Integer(i64),
    Decimal(f64),
    /// `YYYY-MM-DD`
    Date(String),
    /// `HH:MM:SS`
    Time(String),
    DateTime(String),
    Instant(String),
    Uri(String),
    Url(String),
    Reference(Reference),
    Coding(Coding),
    Identifier(Identifier),
    Boolean(bool),
}

impl TypedValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::String(_) => ValueKind::String,
            Self::Integer(_) => ValueKind::Integer,
            Self::Decimal(_) => ValueKind::Decimal,
            Self::Date(_) => ValueKind::Date,
            Self::Time(_) => ValueKind::Time,
            Self::DateTime(_) => ValueKind::DateTime,
            Self::Instant(_) => ValueKind::Instant,
            Self::Uri(_) => ValueKind::Uri,
            Self::Url(_) => ValueKind::Url,
            Self::Reference(_) => ValueKind::Reference,
            Self::Coding(_) => ValueKind::Coding,
            Self::Identifier(_) => ValueKind::Identifier,
            Self::Boolean(_) => ValueKind::Boolean,
        }
    }

    pub fn wire_key(&self) -> &'static str {
        self.kind().wire_key()
    }

    /// JSON value of the `value[x]` member.
    pub fn to_json(&self) -> Value {
        match self {
            Self::String(s)
            | Self::Date(s)
            | Self::Time(s)
            | Self::DateTime(s)
            | Self::Instant(s)
            | Self::Uri(s)
            | Self::Url(s) => Value::String(s.clone()),
            Self::Integer(n) => Value::from(*n),
            Self::Decimal(n) => Value::from(*n),
            Self::Boolean(b) => Value::Bool(*b),
            // Plain data structs without maps with non-string keys cannot fail to serialise.
            Self::Reference(r) => serde_json::to_value(r).unwrap_or(Value::Null),
            Self::Coding(c) => serde_json::to_value(c).unwrap_or(Value::Null),
            Self::Identifier(i) => serde_json::to_value(i).unwrap_or(Value::Null),
        }
    }

    /// Decodes a `value[x]` member.
    ///
    /// Returns `Ok(None)` for `value[x]` types forms do not support (e.g. `valueCanonical`).
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::Translation`] when the JSON does not match the named type.
    pub fn from_wire(key: &str, value: &Value) -> FhirResult<Option<Self>> {
        let Some(kind) = ValueKind::from_wire_key(key) else {
            return Ok(None);
        };

        let mismatch = || FhirError::Translation(format!("{key} has unexpected JSON type: {value}"));
        let text = || value.as_str().map(str::to_owned).ok_or_else(mismatch);

        let typed = match kind {
            ValueKind::String => Self::String(text()?),
            ValueKind::Integer => Self::Integer(value.as_i64().ok_or_else(mismatch)?),
            ValueKind::Decimal => Self::Decimal(value.as_f64().ok_or_else(mismatch)?),
            ValueKind::Date => Self::Date(text()?),
            ValueKind::Time => Self::Time(text()?),
            ValueKind::DateTime => Self::DateTime(text()?),
            ValueKind::Instant => Self::Instant(text()?),
            ValueKind::Uri => Self::Uri(text()?),
            ValueKind::Url => Self::Url(text()?),
            ValueKind::Boolean => Self::Boolean(value.as_bool().ok_or_else(mismatch)?),
            ValueKind::Reference => Self::Reference(
                serde_json::from_value(value.clone()).map_err(|_| mismatch())?,
            ),
            ValueKind::Coding => {
                Self::Coding(serde_json::from_value(value.clone()).map_err(|_| mismatch())?)
            }
            ValueKind::Identifier => {
                Self::Identifier(serde_json::from_value(value.clone()).map_err(|_| mismatch())?)
            }
        };

        Ok(Some(typed))
    }
}

fn is_value_member(key: &str) -> bool {
    key.strip_prefix(VALUE_PREFIX)
        .and_then(|rest| rest.chars().next())
        .is_some_and(|c| c.is_ascii_uppercase())
}

/// Finds and decodes the `value[x]` member of a JSON object.
///
/// Undecodable or unsupported members read as `None`.
pub(crate) fn read_value_member(members: &Map<String, Value>) -> Option<TypedValue> {
    members
        .iter()
        .find(|(key, _)| is_value_member(key))
        .and_then(|(key, value)| TypedValue::from_wire(key, value).ok().flatten())
}

/// Replaces any `value[x]` member of a JSON object with `value`.
pub(crate) fn write_value_member(members: &mut Map<String, Value>, value: &TypedValue) {
    members.retain(|key, _| !is_value_member(key));
    members.insert(value.wire_key().to_owned(), value.to_json());
}
