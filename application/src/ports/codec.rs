//! Value codec port (pluggable "compression")

use thiserror::Error;

/// Errors that can occur while encoding or decoding values
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Encode failed: {0}")]
    Encode(String),

    #[error("Decode failed: {0}")]
    Decode(String),
}

/// Pluggable encode/decode hook applied to values before the durable write
///
/// The one hard contract: an encoded value must be recognizable via
/// [`ValueCodec::is_encoded`] *before* any attempt to JSON-decode it, so
/// previously persisted entries stay readable when the codec changes.
pub trait ValueCodec: Send + Sync {
    /// Encode a value for storage
    fn encode(&self, value: &serde_json::Value) -> Result<serde_json::Value, CodecError>;

    /// Decode a stored value; values without the marker pass through as-is
    fn decode(&self, value: &serde_json::Value) -> Result<serde_json::Value, CodecError>;

    /// Check for the compression marker
    fn is_encoded(&self, value: &serde_json::Value) -> bool;
}
