//! Raw decoded stream messages

use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::error::{DecodeError, DecodeResult};

/// One decoded top-level JSON value from the stream
///
/// Immutable once built. Key order follows the wire order. Looking up a key
/// that is missing (or looking up anything on a value that is not an
/// object) yields `None`, never an error.
///
/// Cloning is cheap: clones share the same backing value.
#[derive(Clone, PartialEq)]
pub struct RawMessage(Arc<Value>);

impl RawMessage {
    /// Decode a single JSON payload
    pub fn from_slice(payload: &[u8]) -> DecodeResult<Self> {
        serde_json::from_slice::<Value>(payload)
            .map(Self::from)
            .map_err(|e| DecodeError::invalid_json(e, payload))
    }

    /// The underlying JSON value
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// The underlying object, if the message is one
    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        self.0.as_object()
    }

    /// Whether the message is a JSON object
    pub fn is_object(&self) -> bool {
        self.0.is_object()
    }

    /// Field lookup
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Whether `key` is present (even if its value is `null`)
    pub fn contains_key(&self, key: &str) -> bool {
        self.as_object().is_some_and(|o| o.contains_key(key))
    }

    /// JSON pointer lookup (e.g. `/delete/status/id`)
    pub fn pointer(&self, pointer: &str) -> Option<&Value> {
        self.0.pointer(pointer)
    }

    /// Get a field as a string slice
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Get a field as u64
    pub fn get_u64(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(Value::as_u64)
    }

    /// Get a field as i64
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    /// Get a field as bool
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    /// Copy out a nested value as its own message
    pub fn child(&self, key: &str) -> Option<RawMessage> {
        self.get(key).cloned().map(Self::from)
    }

    /// Field names in wire order (empty for non-objects)
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.as_object()
            .into_iter()
            .flat_map(|o| o.keys().map(String::as_str))
    }

    /// Deserialize the message into a caller-supplied type
    pub fn deserialize<T: serde::de::DeserializeOwned>(&self) -> Option<T> {
        T::deserialize(self.as_value()).ok()
    }
}

impl From<Value> for RawMessage {
    fn from(value: Value) -> Self {
        Self(Arc::new(value))
    }
}

impl fmt::Debug for RawMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RawMessage").field(&*self.0).finish()
    }
}

impl fmt::Display for RawMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Read an integer id from `value[key]`, falling back to `value[key_str]`
pub(crate) fn id_field(value: Option<&Value>, key: &str) -> Option<u64> {
    let value = value?;
    value.get(key).and_then(Value::as_u64).or_else(|| {
        value
            .get(format!("{}_str", key))
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_preserves_key_order() {
        let msg = RawMessage::from_slice(br#"{"zeta":1,"alpha":2,"mid":3}"#).unwrap();
        let keys: Vec<&str> = msg.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_missing_key_is_absent() {
        let msg = RawMessage::from(json!({"a": 1}));
        assert!(msg.get("b").is_none());
        assert!(msg.get_str("a").is_none());
        assert_eq!(msg.get_u64("a"), Some(1));
    }

    #[test]
    fn test_non_object_lookups_are_absent() {
        let msg = RawMessage::from_slice(b"[1,2,3]").unwrap();
        assert!(!msg.is_object());
        assert!(msg.get("0").is_none());
        assert_eq!(msg.keys().count(), 0);
    }

    #[test]
    fn test_invalid_payload_is_decode_error() {
        let err = RawMessage::from_slice(b"{\"text\":").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidJson { .. }));
    }

    #[test]
    fn test_id_field_falls_back_to_string_form() {
        let v = json!({"id_str": "1234567890123"});
        assert_eq!(id_field(Some(&v), "id"), Some(1234567890123));
        let v = json!({"id": 7, "id_str": "8"});
        assert_eq!(id_field(Some(&v), "id"), Some(7));
    }
}
