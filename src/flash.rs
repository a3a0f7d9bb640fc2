//! Opaque codec for the reserved `flash` attribute.
//!
//! Flash values are serialized with MessagePack and wrapped in base64 before
//! they are placed in the JSON record sent to the backend. The backend only
//! ever sees a string, so values JSON cannot express (non-string map keys,
//! symbols, raw bytes) come back exactly as they went in.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Attribute key reserved for the flash payload.
pub const FLASH_KEY: &str = "flash";

/// A value that can live in the flash slot.
///
/// This is a superset of what JSON can represent: maps keep arbitrary keys in
/// insertion order and symbols stay distinct from strings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FlashValue {
    Nil,
    Bool(bool),
    Int(i64),
    /// Unsigned integers above `i64::MAX`.
    UInt(u64),
    Float(f64),
    Str(String),
    Symbol(String),
    Bytes(Vec<u8>),
    Seq(Vec<FlashValue>),
    Map(Vec<(FlashValue, FlashValue)>),
}

impl FlashValue {
    /// Creates a symbol value.
    pub fn symbol(name: impl Into<String>) -> Self {
        Self::Symbol(name.into())
    }

    /// Looks up `key` if this is a map.
    pub fn get(&self, key: &FlashValue) -> Option<&FlashValue> {
        match self {
            Self::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }
}

impl From<&str> for FlashValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for FlashValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<bool> for FlashValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FlashValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u64> for FlashValue {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(Self::UInt(value), Self::Int)
    }
}

impl From<Vec<u8>> for FlashValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

/// Lifts a structural value into the flash domain.
///
/// Integers stay integers across the whole `i64` and `u64` range; only
/// numbers JSON holds as floats become [`FlashValue::Float`].
impl From<serde_json::Value> for FlashValue {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => Self::Nil,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Int(i)
                } else if let Some(u) = n.as_u64() {
                    Self::UInt(u)
                } else {
                    Self::Float(n.as_f64().unwrap_or(f64::NAN))
                }
            }
            Value::String(s) => Self::Str(s),
            Value::Array(items) => Self::Seq(items.into_iter().map(Self::from).collect()),
            Value::Object(map) => Self::Map(
                map.into_iter()
                    .map(|(k, v)| (Self::Str(k), Self::from(v)))
                    .collect(),
            ),
        }
    }
}

/// Encodes a flash value into the opaque string stored under [`FLASH_KEY`].
pub fn encode(value: &FlashValue) -> Result<String> {
    let bytes = rmp_serde::to_vec(value).map_err(|e| Error::Flash(e.to_string()))?;
    Ok(STANDARD.encode(bytes))
}

/// Decodes the opaque string produced by [`encode`].
///
/// Corrupt payloads are reported, never dropped.
pub fn decode(opaque: &str) -> Result<FlashValue> {
    let bytes = STANDARD
        .decode(opaque.trim())
        .map_err(|e| Error::Flash(e.to_string()))?;
    rmp_serde::from_slice(&bytes).map_err(|e| Error::Flash(e.to_string()))
}
