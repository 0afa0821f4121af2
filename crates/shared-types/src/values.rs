//! # Typed Values
//!
//! The generic value carried across the capability boundary: observations,
//! registration configs and aggregation outcomes are all `Value`s.
//!
//! ## Determinism
//!
//! Maps are `BTreeMap`s, so two nodes holding the same logical value always
//! produce the same bytes from [`Value::to_bytes`]. The agreement protocol
//! compares serialized outcomes byte-for-byte; any hash-ordered container here
//! would break that.
//!
//! ## Typed Access
//!
//! [`Value::wrap`] and [`Value::unwrap_to`] bridge to any serde type. Byte
//! strings wrapped from a Rust `Vec<u8>` become a list of integers; a
//! [`Value::Bytes`] unwraps back into a `Vec<u8>` the same way.

use crate::errors::ValueError;
use primitive_types::U256;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Ordered string-keyed map of values.
pub type ValueMap = BTreeMap<String, Value>;

/// A dynamically typed value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum Value {
    /// Absent value.
    #[default]
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed 64-bit integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// UTF-8 string.
    String(String),
    /// Raw bytes.
    Bytes(Vec<u8>),
    /// Unsigned 256-bit integer (prices, amounts).
    BigInt(U256),
    /// Ordered list.
    List(Vec<Value>),
    /// Ordered map.
    Map(ValueMap),
}

impl Value {
    /// Wrap any serializable type into a `Value`.
    pub fn wrap<T: Serialize + ?Sized>(value: &T) -> Result<Self, ValueError> {
        let json = serde_json::to_value(value).map_err(|e| ValueError::Wrap(e.to_string()))?;
        Ok(Self::from_json(json))
    }

    /// Unwrap into a concrete serde type.
    pub fn unwrap_to<T: DeserializeOwned>(&self) -> Result<T, ValueError> {
        serde_json::from_value(self.to_json()).map_err(|e| ValueError::Unwrap(e.to_string()))
    }

    /// Binary encoding of this value.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ValueError> {
        bincode::serialize(self).map_err(|e| ValueError::Encode(e.to_string()))
    }

    /// Decode a value produced by [`Value::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ValueError> {
        bincode::deserialize(bytes).map_err(|e| ValueError::Decode(e.to_string()))
    }

    /// Empty map value.
    pub fn empty_map() -> Self {
        Self::Map(ValueMap::new())
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_map(&self) -> Option<&ValueMap> {
        match self {
            Self::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Look up a key if this value is a map.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|m| m.get(key))
    }

    /// Short type name, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int64(_) => "int64",
            Self::Float64(_) => "float64",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::BigInt(_) => "bigint",
            Self::List(_) => "list",
            Self::Map(_) => "map",
        }
    }

    fn from_json(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Self::Null,
            Json::Bool(b) => Self::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Self::Int64(i),
                // u64 beyond i64::MAX and floats both land here
                None => match n.as_u64() {
                    Some(u) => Self::BigInt(U256::from(u)),
                    None => Self::Float64(n.as_f64().unwrap_or_default()),
                },
            },
            Json::String(s) => Self::String(s),
            Json::Array(items) => Self::List(items.into_iter().map(Self::from_json).collect()),
            Json::Object(entries) => Self::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Self::from_json(v)))
                    .collect(),
            ),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Self::Null => Json::Null,
            Self::Bool(b) => Json::Bool(*b),
            Self::Int64(i) => Json::from(*i),
            Self::Float64(f) => serde_json::Number::from_f64(*f)
                .map(Json::Number)
                .unwrap_or(Json::Null),
            Self::String(s) => Json::String(s.clone()),
            Self::Bytes(b) => Json::Array(b.iter().map(|byte| Json::from(*byte)).collect()),
            Self::BigInt(n) => Json::String(format!("{:#x}", n)),
            Self::List(items) => Json::Array(items.iter().map(Self::to_json).collect()),
            Self::Map(entries) => Json::Object(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Self::Bytes(v)
    }
}

impl From<U256> for Value {
    fn from(v: U256) -> Self {
        Self::BigInt(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Self::List(v)
    }
}

impl From<ValueMap> for Value {
    fn from(v: ValueMap) -> Self {
        Self::Map(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        count: i64,
        price: U256,
        raw: Vec<u8>,
        nested: BTreeMap<String, u32>,
    }

    fn sample() -> Sample {
        let mut nested = BTreeMap::new();
        nested.insert("a".to_string(), 1);
        Sample {
            name: "feed".to_string(),
            count: -4,
            price: U256::from(123_456_789u64),
            raw: vec![1, 2, 3],
            nested,
        }
    }

    #[test]
    fn test_wrap_unwrap_struct() {
        let wrapped = Value::wrap(&sample()).unwrap();
        assert!(wrapped.as_map().is_some());
        assert_eq!(wrapped.get("name"), Some(&Value::from("feed")));

        let back: Sample = wrapped.unwrap_to().unwrap();
        assert_eq!(back, sample());
    }

    #[test]
    fn test_bytes_variant_unwraps_to_vec() {
        let mut map = ValueMap::new();
        map.insert("raw".to_string(), Value::Bytes(vec![9, 8]));

        #[derive(Deserialize)]
        struct Raw {
            raw: Vec<u8>,
        }
        let raw: Raw = Value::Map(map).unwrap_to().unwrap();
        assert_eq!(raw.raw, vec![9, 8]);
    }

    #[test]
    fn test_bigint_unwraps_to_u256() {
        let v = Value::BigInt(U256::from(1_000u64));
        let n: U256 = v.unwrap_to().unwrap();
        assert_eq!(n, U256::from(1_000u64));
    }

    #[test]
    fn test_binary_encoding_is_order_independent() {
        let mut first = ValueMap::new();
        first.insert("b".to_string(), Value::Int64(2));
        first.insert("a".to_string(), Value::Int64(1));

        let mut second = ValueMap::new();
        second.insert("a".to_string(), Value::Int64(1));
        second.insert("b".to_string(), Value::Int64(2));

        let left = Value::Map(first).to_bytes().unwrap();
        let right = Value::Map(second).to_bytes().unwrap();
        assert_eq!(left, right);

        let decoded = Value::from_bytes(&left).unwrap();
        assert_eq!(decoded.get("a"), Some(&Value::Int64(1)));
    }

    #[test]
    fn test_unwrap_type_mismatch() {
        let err = Value::from("not a number").unwrap_to::<i64>().unwrap_err();
        assert!(matches!(err, ValueError::Unwrap(_)));
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(Value::from_bytes(&[0xff, 0xff, 0xff, 0xff, 0xff]).is_err());
    }
}
