//! Error types for message construction

use thiserror::Error;

/// Result type alias for message construction
pub type Result<T> = std::result::Result<T, ValidationError>;

/// A message field violates one of the construction invariants.
///
/// Each variant names exactly one field so callers can branch on the cause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Session identifier absent or empty
    #[error("ssid must be a non-empty string")]
    EmptySessionId,

    /// Protocol identifier absent or empty
    #[error("protocol_id must be a non-empty string")]
    EmptyProtocolId,

    /// Phase absent or empty
    #[error("phase must be a non-empty string")]
    EmptyPhase,

    #[error("round must be a non-null integer")]
    MissingRound,

    #[error("sender_id must be a non-null integer")]
    MissingSenderId,

    /// Aux mapping absent (an empty mapping is fine)
    #[error("aux must be a mapping (can be empty)")]
    MissingAux,

    #[error("signature must be non-null bytes")]
    MissingSignature,

    /// Signature present but not 64 bytes
    #[error("signature must be exactly {expected} bytes, got {actual}")]
    SignatureLength { expected: usize, actual: usize },

    /// Digest length rejected by an exact-length digest policy
    #[error("digest must be exactly {expected} bytes, got {actual}")]
    DigestLength { expected: usize, actual: usize },

    /// Payload nested deeper than the wire format can carry back
    #[error("{field} nesting depth {actual} exceeds limit of {limit}")]
    NestingTooDeep {
        field: &'static str,
        limit: usize,
        actual: usize,
    },

    /// Encoded message longer than the configured maximum
    #[error("encoded message of {actual} bytes exceeds limit of {limit}")]
    EncodedTooLarge { limit: usize, actual: usize },
}

impl ValidationError {
    /// Wire name of the field this error refers to
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::EmptySessionId => "ssid",
            ValidationError::EmptyProtocolId => "protocol_id",
            ValidationError::EmptyPhase => "phase",
            ValidationError::MissingRound => "round",
            ValidationError::MissingSenderId => "sender_id",
            ValidationError::MissingAux => "aux",
            ValidationError::MissingSignature | ValidationError::SignatureLength { .. } => {
                "signature"
            }
            ValidationError::DigestLength { .. } => "digest",
            ValidationError::NestingTooDeep { field, .. } => field,
            ValidationError::EncodedTooLarge { .. } => "message",
        }
    }
}
