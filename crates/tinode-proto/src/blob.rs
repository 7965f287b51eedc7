//! Opaque JSON values.
//!
//! Message content, topic descriptors and ctrl parameters are arbitrary JSON
//! supplied by operators or servers. A [`Blob`] holds such a value already
//! encoded, so the surrounding message framing never has to understand it.
//! On the wire the encoded bytes are embedded verbatim.
//!
//! # Invariants
//!
//! The bytes of a `Blob` are always one complete, valid JSON document: they
//! come either from the encoder or from a deserialized raw value, so
//! serialization can embed them without re-validating.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de::DeserializeOwned, ser};
use serde_json::value::RawValue;

use crate::errors::{ProtocolError, Result};

/// An independently JSON-encoded value.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Blob(Vec<u8>);

impl Blob {
    /// Encode `value` as JSON.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Encode` if `value` cannot be represented as JSON
    pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        serde_json::to_vec(value).map(Self).map_err(ProtocolError::Encode)
    }

    /// Decode the value.
    ///
    /// # Errors
    ///
    /// - `ProtocolError::Decode` if the JSON does not match `T`
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.0).map_err(ProtocolError::Decode)
    }

    /// Encoded JSON bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Encoded JSON text.
    pub fn as_str(&self) -> &str {
        // Constructors only accept valid JSON, which is always UTF-8.
        std::str::from_utf8(&self.0).unwrap_or_default()
    }

    /// Human-readable form: JSON strings without quotes, anything else as
    /// compact JSON.
    pub fn to_display_string(&self) -> String {
        match self.decode::<serde_json::Value>() {
            Ok(serde_json::Value::String(s)) => s,
            Ok(other) => other.to_string(),
            Err(_) => self.as_str().to_string(),
        }
    }
}

impl fmt::Debug for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Blob").field(&self.as_str()).finish()
    }
}

impl Serialize for Blob {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let raw: &RawValue = serde_json::from_str(self.as_str()).map_err(ser::Error::custom)?;
        raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Blob {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Box::<RawValue>::deserialize(deserializer)?;
        Ok(Self(raw.get().as_bytes().to_vec()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn encode_string_keeps_quotes() {
        let blob = Blob::encode("hi").unwrap();
        assert_eq!(blob.as_bytes(), b"\"hi\"");
        assert_eq!(blob.to_display_string(), "hi");
    }

    #[test]
    fn embeds_raw_json_in_parent() {
        #[derive(Serialize)]
        struct Parent {
            content: Blob,
        }

        let content = Blob::encode(&serde_json::json!({"a": [1, 2]})).unwrap();
        let text = serde_json::to_string(&Parent { content }).unwrap();
        assert_eq!(text, r#"{"content":{"a":[1,2]}}"#);
    }

    #[test]
    fn captures_nested_value_verbatim() {
        #[derive(Deserialize)]
        struct Parent {
            content: Blob,
        }

        let parent: Parent = serde_json::from_str(r#"{"content": {"x":"y"}}"#).unwrap();
        assert_eq!(parent.content.as_str(), r#"{"x":"y"}"#);
    }

    #[test]
    fn non_string_display_is_compact_json() {
        let blob: Blob = serde_json::from_str(r#"{ "n" : 1 }"#).unwrap();
        assert_eq!(blob.to_display_string(), r#"{"n":1}"#);
    }
}
