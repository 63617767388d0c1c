//! Content digests and message fingerprints

use crate::canonical::to_canonical_bytes;
use crate::payload::Value;
use sha2::{Digest, Sha256};

/// Conventional content digest length (SHA-256)
pub const DIGEST_LEN: usize = 32;

/// SHA-256 over the canonical encoding of `value`.
///
/// This is the digest producers conventionally carry in a message's `digest`
/// field for large payloads. Equal values digest equally regardless of map
/// key order.
pub fn value_digest(value: &Value) -> [u8; DIGEST_LEN] {
    Sha256::digest(to_canonical_bytes(value)).into()
}

/// BLAKE3 hash of arbitrary bytes, used for message fingerprints
pub fn fingerprint(bytes: &[u8]) -> [u8; 32] {
    *blake3::hash(bytes).as_bytes()
}
