// Copyright 2024 Contributors to the Veraison project.
// SPDX-License-Identifier: Apache-2.0

pub use ciborium::value::Integer;

/// A decoded CBOR data item.
///
/// The set of variants is closed: every major type and every simple value
/// has exactly one representation, so tagged items (including bignums) and
/// simple values other than `false`, `true` and `null` survive a
/// decode/encode cycle unchanged.
#[derive(Clone, Debug, PartialEq)]
pub enum BinaryValue {
    Integer(Integer),
    Bytes(Vec<u8>),
    Text(String),
    Array(Vec<BinaryValue>),
    Map(Vec<(BinaryValue, BinaryValue)>),
    Tag(u64, Box<BinaryValue>),
    Bool(bool),
    Null,
    Undefined,
    /// Unassigned simple values (0..=19 and 32..=255)
    Simple(u8),
    Float(f64),
}

impl BinaryValue {
    pub fn as_integer(&self) -> Option<Integer> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Vec<u8>> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<BinaryValue>> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Vec<(BinaryValue, BinaryValue)>> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_tag(&self) -> Option<(u64, &BinaryValue)> {
        match self {
            Self::Tag(t, inner) => Some((*t, inner.as_ref())),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl From<Integer> for BinaryValue {
    fn from(i: Integer) -> Self {
        Self::Integer(i)
    }
}

impl From<&str> for BinaryValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for BinaryValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<Vec<u8>> for BinaryValue {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

impl From<bool> for BinaryValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}
