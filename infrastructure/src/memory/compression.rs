//! Marker-prefix value codec
//!
//! "Compression" here is representational: the value is serialized to a
//! JSON string and tagged with a marker prefix so a reader can tell
//! encoded values apart from plain ones without guessing. The marker
//! check always runs before any decode attempt, which keeps entries
//! persisted by an older (or disabled) codec readable.

use hivemind_application::{CodecError, ValueCodec};
use serde_json::Value;

/// Prefix identifying values this codec has encoded
const MARKER: &str = "HMC1:";

/// Codec tagging encoded values with the `HMC1:` marker
#[derive(Default)]
pub struct MarkerCompressionCodec;

impl MarkerCompressionCodec {
    pub fn new() -> Self {
        Self
    }
}

impl ValueCodec for MarkerCompressionCodec {
    fn encode(&self, value: &Value) -> Result<Value, CodecError> {
        // Encoding an already-encoded value would double-wrap it
        if self.is_encoded(value) {
            return Ok(value.clone());
        }
        let json = serde_json::to_string(value).map_err(|e| CodecError::Encode(e.to_string()))?;
        Ok(Value::String(format!("{MARKER}{json}")))
    }

    fn decode(&self, value: &Value) -> Result<Value, CodecError> {
        match value {
            Value::String(s) if s.starts_with(MARKER) => {
                serde_json::from_str(&s[MARKER.len()..])
                    .map_err(|e| CodecError::Decode(e.to_string()))
            }
            other => Ok(other.clone()),
        }
    }

    fn is_encoded(&self, value: &Value) -> bool {
        matches!(value, Value::String(s) if s.starts_with(MARKER))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_roundtrip() {
        let codec = MarkerCompressionCodec::new();
        let original = json!({"name": "ada", "tags": ["a", "b"]});

        let encoded = codec.encode(&original).unwrap();
        assert!(codec.is_encoded(&encoded));
        assert_eq!(codec.decode(&encoded).unwrap(), original);
    }

    #[test]
    fn test_plain_values_pass_through_decode() {
        let codec = MarkerCompressionCodec::new();
        let plain = json!({"stored": "before the codec existed"});
        assert!(!codec.is_encoded(&plain));
        assert_eq!(codec.decode(&plain).unwrap(), plain);
    }

    #[test]
    fn test_plain_string_is_not_mistaken_for_encoded() {
        let codec = MarkerCompressionCodec::new();
        let plain = json!("just a string");
        assert!(!codec.is_encoded(&plain));
        assert_eq!(codec.decode(&plain).unwrap(), plain);
    }

    #[test]
    fn test_encode_is_idempotent() {
        let codec = MarkerCompressionCodec::new();
        let encoded = codec.encode(&json!(42)).unwrap();
        let twice = codec.encode(&encoded).unwrap();
        assert_eq!(encoded, twice);
    }

    #[test]
    fn test_corrupt_payload_is_a_decode_error() {
        let codec = MarkerCompressionCodec::new();
        let corrupt = Value::String(format!("{MARKER}{{not json"));
        assert!(codec.decode(&corrupt).is_err());
    }
}
