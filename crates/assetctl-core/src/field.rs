//! Tri-state desired values and the scalar/list values tracked per field.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A desired-configuration value with three distinct cases.
///
/// In manifests a missing key deserializes to `Absent` (via
/// `#[serde(default)]` on the containing struct), an explicit `null` to
/// `Clear`, and anything else to `Set`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Field<T> {
    /// Unspecified: the caller expresses no intent about this field.
    Absent,
    /// Explicitly cleared: the field should become empty remotely.
    Clear,
    Set(T),
}

impl<T> Default for Field<T> {
    fn default() -> Self {
        Self::Absent
    }
}

impl<T> Field<T> {
    pub fn as_ref(&self) -> Field<&T> {
        match self {
            Self::Absent => Field::Absent,
            Self::Clear => Field::Clear,
            Self::Set(v) => Field::Set(v),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Field<U> {
        match self {
            Self::Absent => Field::Absent,
            Self::Clear => Field::Clear,
            Self::Set(v) => Field::Set(f(v)),
        }
    }

    pub fn set(self) -> Option<T> {
        match self {
            Self::Set(v) => Some(v),
            Self::Absent | Self::Clear => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Field<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(|v| v.map_or(Self::Clear, Self::Set))
    }
}

/// A concrete attribute value as tracked in snapshots and sent in patches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Integer(i64),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    /// `""` and `[]` count as empty, the same as an absent value.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(s) => s.is_empty(),
            Self::List(items) => items.is_empty(),
            Self::Integer(_) => false,
        }
    }

    /// Read a server-side JSON value. `null` and unsupported shapes read as `None`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Number(n) => n.as_i64().map(Self::Integer),
            Value::Array(items) => items
                .iter()
                .map(|v| v.as_str().map(str::to_owned))
                .collect::<Option<Vec<_>>>()
                .map(Self::List),
            Value::Null | Value::Bool(_) | Value::Object(_) => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Integer(n) => Value::from(*n),
            Self::Text(s) => Value::from(s.as_str()),
            Self::List(items) => Value::from(items.clone()),
        }
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// Whether a value is empty or missing. Used by the diff on both sides.
pub(crate) fn is_empty(value: Option<&FieldValue>) -> bool {
    value.is_none_or(FieldValue::is_empty)
}
