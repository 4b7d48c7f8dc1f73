use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Number as JsonNumber, Value as JsonValue};
use serde_yaml::{Mapping, Number as YamlNumber, Value as YamlValue};

use crate::Error;

/// We use [`std::collections::BTreeMap`] as our default map structure so that
/// everything derived from it (merged dictionaries, generated file lists)
/// comes out in a stable order.
pub type Map<K, V> = BTreeMap<K, V>;

/// A fully resolved set of template parameters.
pub type Dictionary = Map<String, Value>;

/// A node of parsed configuration data.
///
/// Every value loaded from a data file or supplied as an in-memory property
/// is converted into this type before it takes part in merging, so the merge
/// logic only ever has to deal with this closed set of shapes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Bool(bool),
    Signed(i64),
    Unsigned(u64),
    Float(f64),
    String(String),
    Array(Vec<Value>),
    Map(Dictionary),
}

impl Value {
    /// A short, human-readable name for the shape of this value.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Signed(_) | Self::Unsigned(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Array(_) => "sequence",
            Self::Map(_) => "mapping",
        }
    }

    pub fn as_map(&self) -> Option<&Dictionary> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Consumes this value, returning its mapping if it is one. Otherwise the
    /// original value is handed back.
    pub fn into_map(self) -> Result<Dictionary, Self> {
        match self {
            Self::Map(m) => Ok(m),
            other => Err(other),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Signed(i)
    }
}

impl From<u64> for Value {
    fn from(u: u64) -> Self {
        Self::Unsigned(u)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl<T> From<Vec<T>> for Value
where
    T: Into<Value>,
{
    fn from(v: Vec<T>) -> Self {
        Self::Array(v.into_iter().map(Into::into).collect())
    }
}

impl From<Dictionary> for Value {
    fn from(m: Dictionary) -> Self {
        Self::Map(m)
    }
}

impl From<JsonNumber> for Value {
    fn from(n: JsonNumber) -> Self {
        if let Some(i) = n.as_i64() {
            Self::Signed(i)
        } else if let Some(u) = n.as_u64() {
            Self::Unsigned(u)
        } else {
            Self::Float(n.as_f64().unwrap_or(f64::NAN))
        }
    }
}

impl From<JsonValue> for Value {
    fn from(v: JsonValue) -> Self {
        match v {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(b) => Self::Bool(b),
            JsonValue::Number(n) => Self::from(n),
            JsonValue::String(s) => Self::String(s),
            JsonValue::Array(arr) => Self::Array(arr.into_iter().map(Into::into).collect()),
            JsonValue::Object(obj) => {
                Self::Map(Map::from_iter(obj.into_iter().map(|(k, v)| (k, v.into()))))
            }
        }
    }
}

impl From<YamlNumber> for Value {
    fn from(n: YamlNumber) -> Self {
        if let Some(i) = n.as_i64() {
            Self::Signed(i)
        } else if let Some(u) = n.as_u64() {
            Self::Unsigned(u)
        } else {
            Self::Float(n.as_f64().unwrap_or(f64::NAN))
        }
    }
}

impl TryFrom<YamlValue> for Value {
    type Error = Error;

    fn try_from(value: YamlValue) -> Result<Self, Self::Error> {
        Ok(match value {
            YamlValue::Null => Self::Null,
            YamlValue::Bool(b) => Self::Bool(b),
            YamlValue::Number(n) => Self::from(n),
            YamlValue::String(s) => Self::String(s),
            YamlValue::Sequence(seq) => Self::Array(
                seq.into_iter()
                    .map(TryInto::try_into)
                    .collect::<Result<Vec<Self>, Error>>()?,
            ),
            YamlValue::Mapping(m) => Self::Map(mapping_to_dictionary(m)?),
        })
    }
}

/// Converts a YAML mapping into a dictionary, coercing scalar keys to
/// strings.
pub fn mapping_to_dictionary(m: Mapping) -> Result<Dictionary, Error> {
    m.into_iter()
        .map(|(k, v)| Ok((key_to_string(k)?, Value::try_from(v)?)))
        .collect()
}

fn key_to_string(key: YamlValue) -> Result<String, Error> {
    Ok(match key {
        YamlValue::String(s) => s,
        YamlValue::Number(n) => n.to_string(),
        YamlValue::Bool(b) => b.to_string(),
        YamlValue::Null => "null".to_string(),
        YamlValue::Sequence(_) => return Err(Error::UnsupportedKey("sequence")),
        YamlValue::Mapping(_) => return Err(Error::UnsupportedKey("mapping")),
    })
}

/// Converts any serializable value into a [`Value`].
pub fn to_value<V: Serialize>(value: V) -> Result<Value, Error> {
    Ok(serde_json::to_value(value)?.into())
}
