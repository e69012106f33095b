//! Register values carried by telemetry payloads and stored in register cells.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Declared type of a telemetry channel or register.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    /// Floating point quantity such as an azimuth in degrees
    Real,
    /// Verbatim text such as an event label
    Text,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Real => write!(f, "real"),
            ValueKind::Text => write!(f, "text"),
        }
    }
}

/// A single discrete value as observed by external queriers.
///
/// Serializes untagged so a real register reads as a JSON number and a
/// text register as a JSON string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RegisterValue {
    Real(f64),
    Text(String),
}

impl RegisterValue {
    /// Returns the default a register of `kind` holds before its first write.
    pub fn default_for(kind: ValueKind) -> Self {
        match kind {
            ValueKind::Real => RegisterValue::Real(0.0),
            ValueKind::Text => RegisterValue::Text(String::new()),
        }
    }

    /// Returns the kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            RegisterValue::Real(_) => ValueKind::Real,
            RegisterValue::Text(_) => ValueKind::Text,
        }
    }

    pub fn as_real(&self) -> Option<f64> {
        match self {
            RegisterValue::Real(value) => Some(*value),
            RegisterValue::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            RegisterValue::Text(value) => Some(value),
            RegisterValue::Real(_) => None,
        }
    }

    /// Bit-exact comparison.
    ///
    /// Unlike `PartialEq`, two reals compare equal only when their IEEE-754
    /// bit patterns match, so `0.0` and `-0.0` differ.
    pub fn same_bits(&self, other: &Self) -> bool {
        match (self, other) {
            (RegisterValue::Real(a), RegisterValue::Real(b)) => a.to_bits() == b.to_bits(),
            (RegisterValue::Text(a), RegisterValue::Text(b)) => a == b,
            _ => false,
        }
    }

    /// Appends a canonical byte encoding used for state digests.
    pub fn encode_canonical(&self, out: &mut Vec<u8>) {
        match self {
            RegisterValue::Real(value) => {
                out.push(0);
                out.extend_from_slice(&value.to_bits().to_be_bytes());
            }
            RegisterValue::Text(value) => {
                out.push(1);
                out.extend_from_slice(&(value.len() as u64).to_be_bytes());
                out.extend_from_slice(value.as_bytes());
            }
        }
    }
}

impl fmt::Display for RegisterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegisterValue::Real(value) => write!(f, "{value}"),
            RegisterValue::Text(value) => write!(f, "{value}"),
        }
    }
}

impl From<f64> for RegisterValue {
    fn from(value: f64) -> Self {
        RegisterValue::Real(value)
    }
}

impl From<&str> for RegisterValue {
    fn from(value: &str) -> Self {
        RegisterValue::Text(value.to_string())
    }
}

impl From<String> for RegisterValue {
    fn from(value: String) -> Self {
        RegisterValue::Text(value)
    }
}
