//! # BA Codec
//!
//! Pluggable wire formats for Byzantine Agreement messages.
//!
//! Message handling and signing code depends only on the
//! [`MessageSerializer`] trait, so the wire format can change without
//! touching either. The bundled [`JsonMessageSerializer`] produces canonical
//! JSON: sorted keys, compact separators, base64 binary fields.
//!
//! ## Example
//!
//! ```rust,ignore
//! use ba_codec::{JsonMessageSerializer, MessageSerializer};
//!
//! let serializer = JsonMessageSerializer::new();
//! let bytes = serializer.encode(&message)?;
//! assert_eq!(serializer.decode(&bytes)?, message);
//! ```

pub mod config;
pub mod error;
pub mod serializer;

pub use config::{CodecConfig, DigestPolicy};
pub use error::{DecodeError, Error, Result};
pub use serializer::{JsonMessageSerializer, MessageSerializer};
