//! Codec configuration

use crate::{Error, Result};
use ba_message::ValidationError;
use serde::{Deserialize, Serialize};

/// Which digest lengths a codec accepts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DigestPolicy {
    /// Any length, including empty
    #[default]
    Permissive,
    /// Exactly `len` bytes
    Exact { len: usize },
}

impl DigestPolicy {
    /// Check a message digest against this policy
    pub fn check(&self, digest: Option<&[u8]>) -> std::result::Result<(), ValidationError> {
        match (self, digest) {
            (DigestPolicy::Exact { len }, Some(digest)) if digest.len() != *len => {
                Err(ValidationError::DigestLength {
                    expected: *len,
                    actual: digest.len(),
                })
            }
            _ => Ok(()),
        }
    }
}

/// Configuration shared by codec implementations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Digest length policy applied on encode and decode
    pub digest_policy: DigestPolicy,

    /// Maximum encoded length in bytes, enforced on encode and decode.
    ///
    /// Like an exact digest policy, a limit narrows the set of messages the
    /// codec carries. `None` (the default) accepts any length.
    pub max_message_len: Option<usize>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            digest_policy: DigestPolicy::Permissive,
            max_message_len: None,
        }
    }
}

impl CodecConfig {
    /// Configuration that only accepts digests of exactly `len` bytes
    pub fn with_exact_digest(len: usize) -> Self {
        Self {
            digest_policy: DigestPolicy::Exact { len },
            ..Self::default()
        }
    }

    /// Configuration that bounds encoded messages to `len` bytes
    pub fn with_max_message_len(len: usize) -> Self {
        Self {
            max_message_len: Some(len),
            ..Self::default()
        }
    }

    /// Parse a JSON configuration document; absent keys take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let config: CodecConfig =
            serde_json::from_str(json).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.digest_policy == (DigestPolicy::Exact { len: 0 }) {
            return Err(Error::Config(
                "Exact digest length must be non-zero".into(),
            ));
        }
        if self.max_message_len == Some(0) {
            return Err(Error::Config(
                "Maximum message length must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
