//! Error types for message encoding and decoding

use ba_message::ValidationError;
use thiserror::Error;

/// Result type alias for codec operations
pub type Result<T> = std::result::Result<T, Error>;

/// Input bytes are not a well-formed encoded message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Not parseable as the wire format
    #[error("Malformed input: {0}")]
    Malformed(String),

    #[error("Expected an object at top level")]
    NotAnObject,

    /// Required key absent from the encoded object
    #[error("Missing field: {0}")]
    MissingField(&'static str),

    #[error("Unknown field: {0}")]
    UnknownField(String),

    /// Field present with the wrong wire type
    #[error("Invalid {field}: expected {expected}")]
    InvalidField {
        field: &'static str,
        expected: &'static str,
    },

    /// Binary field whose base64 text does not decode
    #[error("Failed to decode {field} from base64: {reason}")]
    InvalidBase64 { field: &'static str, reason: String },

    #[error("Input of {actual} bytes exceeds limit of {limit}")]
    TooLarge { limit: usize, actual: usize },
}

impl DecodeError {
    /// Wire name of the field at fault, if the error is about one field
    pub fn field(&self) -> Option<&str> {
        match self {
            DecodeError::MissingField(field)
            | DecodeError::InvalidField { field, .. }
            | DecodeError::InvalidBase64 { field, .. } => Some(field),
            DecodeError::UnknownField(field) => Some(field),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        DecodeError::Malformed(e.to_string())
    }
}

/// Errors returned by serializers
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Well-formed input (or a message) with invalid field values
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Malformed input
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Invalid codec configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}
