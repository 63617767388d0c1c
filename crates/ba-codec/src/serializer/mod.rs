//! Format-agnostic message serialization
//!
//! Every implementation guarantees:
//! 1. Determinism: equal messages encode to identical bytes
//! 2. Round-trip: `decode(encode(m)) == m` for every valid message
//! 3. No partial results: decode either yields a valid message or an error

use crate::Result;
use ba_message::Message;

mod json;

pub use json::JsonMessageSerializer;

/// Encode/decode contract for a wire format
pub trait MessageSerializer: Send + Sync {
    /// Short name of the wire format
    fn format(&self) -> &'static str;

    /// Serialize a message to bytes.
    ///
    /// Fails only with [`crate::Error::Validation`] when the message violates
    /// its invariants or the codec's digest policy.
    fn encode(&self, message: &Message) -> Result<Vec<u8>>;

    /// Deserialize bytes to a message.
    ///
    /// Malformed input is [`crate::Error::Decode`]; well-formed input with
    /// invalid field values is [`crate::Error::Validation`].
    fn decode(&self, data: &[u8]) -> Result<Message>;
}

impl<T: MessageSerializer + ?Sized> MessageSerializer for Box<T> {
    fn format(&self) -> &'static str {
        (**self).format()
    }

    fn encode(&self, message: &Message) -> Result<Vec<u8>> {
        (**self).encode(message)
    }

    fn decode(&self, data: &[u8]) -> Result<Message> {
        (**self).decode(data)
    }
}
