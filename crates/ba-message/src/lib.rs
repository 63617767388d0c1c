//! # BA Message
//!
//! Canonical authenticated message type for Byzantine Agreement protocols.
//!
//! This crate provides:
//! - The [`Message`] value type, validated at construction and immutable after
//! - The canonical signing payload fed to external signers and verifiers
//! - Canonical JSON encoding of structured payloads
//! - Slot identity and fingerprints for replay scoping, deduplication and
//!   equivocation detection
//!
//! ## Signing Flow
//!
//! A producer builds an unsigned message, signs its signing payload with an
//! external [`Signer`], and hands the signed message to a serializer. A
//! consumer decodes, then verifies the signature against the recomputed
//! payload.
//!
//! ## Example
//!
//! ```rust,ignore
//! use ba_message::{Aux, Message};
//!
//! let msg = Message::unsigned("exp-001", 0, "CoD", "SEND", 0, "value-A", None, Aux::new())?
//!     .sign(&signer);
//!
//! assert!(msg.verify(&verifier));
//! ```

pub mod auth;
pub mod canonical;
pub mod digest;
pub mod error;
pub mod message;
pub mod payload;

pub use auth::{Signature, Signer, Verifier, SIGNATURE_LEN};
pub use digest::{value_digest, DIGEST_LEN};
pub use error::{Result, ValidationError};
pub use message::{field, CanonicalFields, Field, Message, MessageParts, MessageSlot};
pub use payload::{aux, Aux, Value};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Protocol identifiers used by the protocol family (the set is open)
pub mod protocol {
    pub const COD: &str = "CoD";
    pub const GDA: &str = "GDA";
    pub const POP: &str = "PoP";
    pub const BA: &str = "BA";
}

/// Common phase names (the set is open)
pub mod phase {
    pub const SEND: &str = "SEND";
    pub const ECHO: &str = "ECHO";
    pub const READY: &str = "READY";
    pub const PROPOSE: &str = "PROPOSE";
    pub const VOTE: &str = "VOTE";
}
