//! Signature type and the signing/verification capabilities
//!
//! The library never signs or verifies anything itself: it only produces the
//! bytes that a [`Signer`] or [`Verifier`] must be fed.

use crate::error::ValidationError;
use std::fmt;

/// Signature length in bytes (Ed25519)
pub const SIGNATURE_LEN: usize = 64;

/// Fixed-size message signature
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature([u8; SIGNATURE_LEN]);

impl Signature {
    /// All-zero signature used before a message is signed
    pub const PLACEHOLDER: Signature = Signature([0u8; SIGNATURE_LEN]);

    /// Wrap raw signature bytes
    pub const fn new(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SIGNATURE_LEN] {
        &self.0
    }

    pub fn to_bytes(self) -> [u8; SIGNATURE_LEN] {
        self.0
    }
}

impl From<[u8; SIGNATURE_LEN]> for Signature {
    fn from(bytes: [u8; SIGNATURE_LEN]) -> Self {
        Self(bytes)
    }
}

impl TryFrom<&[u8]> for Signature {
    type Error = ValidationError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let array: [u8; SIGNATURE_LEN] =
            bytes
                .try_into()
                .map_err(|_| ValidationError::SignatureLength {
                    expected: SIGNATURE_LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(array))
    }
}

impl TryFrom<Vec<u8>> for Signature {
    type Error = ValidationError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        Signature::try_from(bytes.as_slice())
    }
}

impl AsRef<[u8]> for Signature {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", hex::encode(self.0))
    }
}

/// Produces a signature over a signing payload
pub trait Signer {
    fn sign(&self, payload: &[u8]) -> Signature;
}

/// Checks a signature over a signing payload against a bound public key
pub trait Verifier {
    fn verify(&self, payload: &[u8], signature: &Signature) -> bool;
}
