//! The canonical authenticated message
//!
//! Schema: `(ssid, round, protocol_id, phase, sender_id, value|digest, aux, signature)`.
//!
//! A [`Message`] is validated when it is built and cannot be modified
//! afterwards; changing a field means rebuilding the message via
//! [`Message::into_parts`]. The signing payload covers every field except the
//! signature, so it can be computed before the message is signed and
//! recomputed by any verifier from the received fields.

use crate::auth::{Signature, Signer, Verifier};
use crate::canonical::to_canonical_bytes;
use crate::digest::{fingerprint, value_digest};
use crate::error::{Result, ValidationError};
use crate::payload::{Aux, Value};
use std::collections::BTreeMap;
use tracing::debug;

/// Wire names of the message fields
pub mod field {
    pub const AUX: &str = "aux";
    pub const DIGEST: &str = "digest";
    pub const PHASE: &str = "phase";
    pub const PROTOCOL_ID: &str = "protocol_id";
    pub const ROUND: &str = "round";
    pub const SENDER_ID: &str = "sender_id";
    pub const SIGNATURE: &str = "signature";
    pub const SSID: &str = "ssid";
    pub const VALUE: &str = "value";

    /// All field names in byte-wise ascending order
    pub const ALL: [&str; 9] = [
        AUX,
        DIGEST,
        PHASE,
        PROTOCOL_ID,
        ROUND,
        SENDER_ID,
        SIGNATURE,
        SSID,
        VALUE,
    ];
}

/// One authenticated protocol message
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    session_id: String,
    round: u64,
    protocol_id: String,
    phase: String,
    sender_id: u64,
    value: Value,
    digest: Option<Vec<u8>>,
    aux: Aux,
    signature: Signature,
}

/// Message fields before validation.
///
/// Every field a producer may leave out is optional here; converting into a
/// [`Message`] reports the first missing or invalid field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageParts {
    pub session_id: Option<String>,
    pub round: Option<u64>,
    pub protocol_id: Option<String>,
    pub phase: Option<String>,
    pub sender_id: Option<u64>,
    pub value: Value,
    pub digest: Option<Vec<u8>>,
    pub aux: Option<Aux>,
    pub signature: Option<Vec<u8>>,
}

/// A field value in the canonical field mapping
#[derive(Debug, Clone, PartialEq)]
pub enum Field<'a> {
    /// Text, integer or structured payload
    Json(Value),
    /// Binary field; `None` for an absent digest
    Binary(Option<&'a [u8]>),
}

/// Field name to value, ordered by name
pub type CanonicalFields<'a> = BTreeMap<&'static str, Field<'a>>;

/// Render canonical fields as a JSON object, transcoding binary fields to text
pub fn render_fields<F>(fields: CanonicalFields<'_>, transcode: F) -> Value
where
    F: Fn(&[u8]) -> String,
{
    let object = fields
        .into_iter()
        .map(|(name, field)| {
            let value = match field {
                Field::Json(value) => value,
                Field::Binary(Some(bytes)) => Value::String(transcode(bytes)),
                Field::Binary(None) => Value::Null,
            };
            (name.to_string(), value)
        })
        .collect();
    Value::Object(object)
}

/// The slot a sender fills with one payload: who said it, where, and when.
///
/// Two differently-signed payloads in the same slot are equivocation.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub struct MessageSlot {
    pub session_id: String,
    pub round: u64,
    pub protocol_id: String,
    pub phase: String,
    pub sender_id: u64,
}

impl MessageSlot {
    /// Stable lookup key for this slot
    pub fn key(&self) -> String {
        let encoded = to_canonical_bytes(&serde_json::json!([
            self.session_id,
            self.round,
            self.protocol_id,
            self.phase,
            self.sender_id,
        ]));
        hex::encode(fingerprint(&encoded))
    }
}

impl Message {
    /// Create a new message, validating every field
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        session_id: impl Into<String>,
        round: u64,
        protocol_id: impl Into<String>,
        phase: impl Into<String>,
        sender_id: u64,
        value: impl Into<Value>,
        digest: Option<Vec<u8>>,
        aux: Aux,
        signature: impl AsRef<[u8]>,
    ) -> Result<Self> {
        MessageParts {
            session_id: Some(session_id.into()),
            round: Some(round),
            protocol_id: Some(protocol_id.into()),
            phase: Some(phase.into()),
            sender_id: Some(sender_id),
            value: value.into(),
            digest,
            aux: Some(aux),
            signature: Some(signature.as_ref().to_vec()),
        }
        .try_into()
    }

    /// Create a message carrying the placeholder signature, ready to be signed
    #[allow(clippy::too_many_arguments)]
    pub fn unsigned(
        session_id: impl Into<String>,
        round: u64,
        protocol_id: impl Into<String>,
        phase: impl Into<String>,
        sender_id: u64,
        value: impl Into<Value>,
        digest: Option<Vec<u8>>,
        aux: Aux,
    ) -> Result<Self> {
        Self::new(
            session_id,
            round,
            protocol_id,
            phase,
            sender_id,
            value,
            digest,
            aux,
            Signature::PLACEHOLDER,
        )
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn protocol_id(&self) -> &str {
        &self.protocol_id
    }

    pub fn phase(&self) -> &str {
        &self.phase
    }

    pub fn sender_id(&self) -> u64 {
        self.sender_id
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn digest(&self) -> Option<&[u8]> {
        self.digest.as_deref()
    }

    pub fn aux(&self) -> &Aux {
        &self.aux
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Re-check the construction invariants.
    ///
    /// Types already guarantee presence of round, sender, aux and a 64-byte
    /// signature; the text fields are checked again.
    pub fn validate(&self) -> Result<()> {
        check_text(&self.session_id, ValidationError::EmptySessionId)?;
        check_text(&self.protocol_id, ValidationError::EmptyProtocolId)?;
        check_text(&self.phase, ValidationError::EmptyPhase)?;
        Ok(())
    }

    /// Break the message back into its unvalidated parts
    pub fn into_parts(self) -> MessageParts {
        MessageParts {
            session_id: Some(self.session_id),
            round: Some(self.round),
            protocol_id: Some(self.protocol_id),
            phase: Some(self.phase),
            sender_id: Some(self.sender_id),
            value: self.value,
            digest: self.digest,
            aux: Some(self.aux),
            signature: Some(self.signature.to_bytes().to_vec()),
        }
    }

    /// Replace the signature, keeping every other field
    pub fn with_signature(self, signature: Signature) -> Self {
        Self { signature, ..self }
    }

    /// Sign the signing payload and attach the result
    pub fn sign<S: Signer + ?Sized>(self, signer: &S) -> Self {
        let signature = signer.sign(&self.signing_payload());
        self.with_signature(signature)
    }

    /// Verify the attached signature against the recomputed signing payload
    pub fn verify<V: Verifier + ?Sized>(&self, verifier: &V) -> bool {
        verifier.verify(&self.signing_payload(), &self.signature)
    }

    /// All nine fields by wire name, binary fields left untranscoded
    pub fn to_canonical_fields(&self) -> CanonicalFields<'_> {
        BTreeMap::from([
            (field::AUX, Field::Json(Value::Object(self.aux.clone().into_iter().collect()))),
            (field::DIGEST, Field::Binary(self.digest())),
            (field::PHASE, Field::Json(Value::from(self.phase.as_str()))),
            (field::PROTOCOL_ID, Field::Json(Value::from(self.protocol_id.as_str()))),
            (field::ROUND, Field::Json(Value::from(self.round))),
            (field::SENDER_ID, Field::Json(Value::from(self.sender_id))),
            (field::SIGNATURE, Field::Binary(Some(self.signature.as_bytes()))),
            (field::SSID, Field::Json(Value::from(self.session_id.as_str()))),
            (field::VALUE, Field::Json(self.value.clone())),
        ])
    }

    /// Canonical bytes that get signed and verified.
    ///
    /// Canonical JSON of every field except `signature`, with `digest` as
    /// lowercase hex (or null).
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut fields = self.to_canonical_fields();
        fields.remove(field::SIGNATURE);
        to_canonical_bytes(&render_fields(fields, |bytes| hex::encode(bytes)))
    }

    /// BLAKE3 of the signing payload; a deduplication key that ignores the signature
    pub fn fingerprint(&self) -> [u8; 32] {
        fingerprint(&self.signing_payload())
    }

    pub fn slot(&self) -> MessageSlot {
        MessageSlot {
            session_id: self.session_id.clone(),
            round: self.round,
            protocol_id: self.protocol_id.clone(),
            phase: self.phase.clone(),
            sender_id: self.sender_id,
        }
    }

    /// Same slot, different signed content
    pub fn equivocates(&self, other: &Message) -> bool {
        self.slot() == other.slot() && self.signing_payload() != other.signing_payload()
    }

    /// Whether `digest` is present and equals the SHA-256 of the canonical `value`
    pub fn digest_matches_value(&self) -> bool {
        self.digest
            .as_deref()
            .is_some_and(|digest| digest == value_digest(&self.value).as_slice())
    }
}

impl TryFrom<MessageParts> for Message {
    type Error = ValidationError;

    fn try_from(parts: MessageParts) -> Result<Self> {
        build(parts).map_err(|err| {
            debug!(field = err.field(), %err, "Message rejected");
            err
        })
    }
}

fn build(parts: MessageParts) -> Result<Message> {
    let session_id = required_text(parts.session_id, ValidationError::EmptySessionId)?;
    let protocol_id = required_text(parts.protocol_id, ValidationError::EmptyProtocolId)?;
    let phase = required_text(parts.phase, ValidationError::EmptyPhase)?;

    let round = parts.round.ok_or(ValidationError::MissingRound)?;
    let sender_id = parts.sender_id.ok_or(ValidationError::MissingSenderId)?;

    let signature = parts
        .signature
        .ok_or(ValidationError::MissingSignature)
        .and_then(|bytes| Signature::try_from(bytes.as_slice()))?;

    let aux = parts.aux.ok_or(ValidationError::MissingAux)?;

    Ok(Message {
        session_id,
        round,
        protocol_id,
        phase,
        sender_id,
        value: parts.value,
        digest: parts.digest,
        aux,
        signature,
    })
}

fn required_text(text: Option<String>, err: ValidationError) -> Result<String> {
    match text {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(err),
    }
}

fn check_text(text: &str, err: ValidationError) -> Result<()> {
    if text.is_empty() {
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::aux;
    use serde_json::json;

    fn sample() -> Message {
        Message::new(
            "test-session",
            5,
            "CoD",
            "SEND",
            3,
            "test-value",
            Some(vec![0u8; 32]),
            aux([("metadata", "test")]),
            [0u8; 64],
        )
        .unwrap()
    }

    fn sample_parts() -> MessageParts {
        sample().into_parts()
    }

    fn vote(value: impl Into<Value>, digest: Option<Vec<u8>>, aux: Aux) -> Message {
        Message::new("s", 0, "BA", "VOTE", 0, value, digest, aux, [0u8; 64]).unwrap()
    }

    #[test]
    fn test_valid_message_creation() {
        let msg = sample();
        assert_eq!(msg.session_id(), "test-session");
        assert_eq!(msg.round(), 5);
        assert_eq!(msg.protocol_id(), "CoD");
        assert_eq!(msg.phase(), "SEND");
        assert_eq!(msg.sender_id(), 3);
        assert_eq!(msg.value(), &json!("test-value"));
        assert_eq!(msg.digest(), Some(&[0u8; 32][..]));
        assert_eq!(msg.aux().get("metadata"), Some(&json!("test")));
        assert_eq!(msg.signature(), &Signature::PLACEHOLDER);
        assert!(msg.validate().is_ok());
    }

    #[test]
    fn test_empty_ssid_rejected() {
        let parts = MessageParts {
            session_id: Some(String::new()),
            ..sample_parts()
        };
        assert_eq!(Message::try_from(parts), Err(ValidationError::EmptySessionId));

        let parts = MessageParts {
            session_id: None,
            ..sample_parts()
        };
        assert_eq!(Message::try_from(parts), Err(ValidationError::EmptySessionId));
    }

    #[test]
    fn test_empty_protocol_id_and_phase_rejected() {
        let err = Message::new("s", 1, "", "SEND", 0, "v", None, Aux::new(), [0u8; 64])
            .unwrap_err();
        assert_eq!(err, ValidationError::EmptyProtocolId);

        let err = Message::new("s", 1, "CoD", "", 0, "v", None, Aux::new(), [0u8; 64])
            .unwrap_err();
        assert_eq!(err, ValidationError::EmptyPhase);
    }

    #[test]
    fn test_missing_round_rejected() {
        let parts = MessageParts {
            round: None,
            ..sample_parts()
        };
        assert_eq!(Message::try_from(parts), Err(ValidationError::MissingRound));
    }

    #[test]
    fn test_missing_sender_id_rejected() {
        let parts = MessageParts {
            sender_id: None,
            ..sample_parts()
        };
        assert_eq!(Message::try_from(parts), Err(ValidationError::MissingSenderId));
    }

    #[test]
    fn test_missing_aux_rejected() {
        let parts = MessageParts {
            aux: None,
            ..sample_parts()
        };
        assert_eq!(Message::try_from(parts), Err(ValidationError::MissingAux));
    }

    #[test]
    fn test_missing_signature_rejected() {
        let parts = MessageParts {
            signature: None,
            ..sample_parts()
        };
        assert_eq!(Message::try_from(parts), Err(ValidationError::MissingSignature));
    }

    #[test]
    fn test_signature_wrong_length_rejected() {
        let err = Message::new("s", 1, "CoD", "SEND", 0, "v", None, Aux::new(), [0u8; 32])
            .unwrap_err();
        assert_eq!(
            err,
            ValidationError::SignatureLength { expected: 64, actual: 32 }
        );
    }

    #[test]
    fn test_first_violation_reported() {
        let parts = MessageParts {
            session_id: Some(String::new()),
            round: None,
            signature: None,
            ..sample_parts()
        };
        assert_eq!(Message::try_from(parts), Err(ValidationError::EmptySessionId));
    }

    #[test]
    fn test_digest_length_not_enforced() {
        for len in [0, 1, 16, 32, 100] {
            let msg = vote(json!(null), Some(vec![9u8; len]), Aux::new());
            assert_eq!(msg.digest().map(<[u8]>::len), Some(len));
        }
    }

    #[test]
    fn test_structural_equality() {
        assert_eq!(sample(), sample());
        let resigned = sample().with_signature(Signature::new([1u8; 64]));
        assert_ne!(sample(), resigned);
    }

    #[test]
    fn test_into_parts_roundtrip() {
        let msg = sample();
        assert_eq!(Message::try_from(msg.clone().into_parts()), Ok(msg));
    }

    #[test]
    fn test_canonical_fields_contains_all() {
        let msg = sample();
        let fields = msg.to_canonical_fields();
        assert_eq!(fields.keys().copied().collect::<Vec<_>>(), field::ALL.to_vec());
        assert_eq!(fields[field::ROUND], Field::Json(json!(5)));
        assert_eq!(fields[field::SIGNATURE], Field::Binary(Some(&[0u8; 64][..])));
    }

    #[test]
    fn test_signing_payload_exact_bytes() {
        let msg = Message::new(
            "exp-001",
            0,
            "CoD",
            "SEND",
            0,
            "value-A",
            Some(vec![0xab, 0x01]),
            aux([("z", 1), ("a", 2)]),
            [0u8; 64],
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(msg.signing_payload()).unwrap(),
            concat!(
                r#"{"aux":{"a":2,"z":1},"digest":"ab01","phase":"SEND","protocol_id":"CoD","#,
                r#""round":0,"sender_id":0,"ssid":"exp-001","value":"value-A"}"#,
            )
        );
    }

    #[test]
    fn test_signing_payload_null_digest() {
        let msg = vote(json!([1, 2]), None, Aux::new());
        let payload = String::from_utf8(msg.signing_payload()).unwrap();
        assert!(payload.contains(r#""digest":null"#));
    }

    #[test]
    fn test_signing_payload_empty_digest_distinct_from_absent() {
        let empty = String::from_utf8(vote("v", Some(Vec::new()), Aux::new()).signing_payload())
            .unwrap();
        let absent = String::from_utf8(vote("v", None, Aux::new()).signing_payload()).unwrap();

        assert!(empty.contains(r#""digest":"","#));
        assert!(absent.contains(r#""digest":null,"#));
        assert_ne!(empty, absent);
    }

    #[test]
    fn test_signing_payload_ignores_signature() {
        let a = sample();
        let b = sample().with_signature(Signature::new([0xff; 64]));
        assert_eq!(a.signing_payload(), b.signing_payload());
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn test_signing_payload_excludes_signature() {
        let payload = String::from_utf8(sample().signing_payload()).unwrap();
        assert!(!payload.contains("signature"));
    }

    #[test]
    fn test_signing_payload_changes_with_each_field() {
        let base = sample();
        let edits: [fn(&mut MessageParts); 8] = [
            |p| p.session_id = Some("other".into()),
            |p| p.round = Some(6),
            |p| p.protocol_id = Some("PoP".into()),
            |p| p.phase = Some("ECHO".into()),
            |p| p.sender_id = Some(4),
            |p| p.value = json!("B"),
            |p| p.digest = None,
            |p| p.aux = Some(Aux::new()),
        ];
        for edit in edits {
            let mut parts = sample_parts();
            edit(&mut parts);
            let changed = Message::try_from(parts).unwrap();
            assert_ne!(base.signing_payload(), changed.signing_payload());
        }
    }

    #[test]
    fn test_signing_payload_aux_order_independent() {
        let a = vote(1, None, aux([("z", 1), ("a", 2)]));
        let b = vote(1, None, aux([("a", 2), ("z", 1)]));
        assert_eq!(a.signing_payload(), b.signing_payload());
    }

    #[test]
    fn test_slot_and_equivocation() {
        let a = sample();
        let b = Message::try_from(MessageParts {
            value: json!("other-value"),
            ..sample_parts()
        })
        .unwrap();
        let later = Message::try_from(MessageParts {
            round: Some(6),
            value: json!("other-value"),
            ..sample_parts()
        })
        .unwrap();

        assert_eq!(a.slot(), b.slot());
        assert_eq!(a.slot().key(), b.slot().key());
        assert!(a.equivocates(&b));
        assert!(!a.equivocates(&a.clone().with_signature(Signature::new([3u8; 64]))));
        assert!(!a.equivocates(&later));
        assert_ne!(a.slot().key(), later.slot().key());
    }

    #[test]
    fn test_digest_matches_value() {
        let value = json!({"proposal": "A", "batch": [1, 2, 3]});
        let digest = value_digest(&value).to_vec();
        assert!(vote(value, Some(digest), Aux::new()).digest_matches_value());
        assert!(!vote("x", None, Aux::new()).digest_matches_value());
        assert!(!vote("x", Some(vec![1]), Aux::new()).digest_matches_value());
    }

    struct XorSigner(u8);

    impl Signer for XorSigner {
        fn sign(&self, payload: &[u8]) -> Signature {
            let mut out = [self.0; 64];
            for (i, b) in payload.iter().enumerate() {
                out[i % 64] ^= b;
            }
            Signature::new(out)
        }
    }

    impl Verifier for XorSigner {
        fn verify(&self, payload: &[u8], signature: &Signature) -> bool {
            self.sign(payload) == *signature
        }
    }

    #[test]
    fn test_sign_and_verify_use_signing_payload() {
        let key = XorSigner(0x5a);
        let signed = sample().sign(&key);
        assert_eq!(signed.signature(), &key.sign(&sample().signing_payload()));
        assert!(signed.verify(&key));
        assert!(!signed.verify(&XorSigner(0x01)));

        let tampered = Message::try_from(MessageParts {
            value: json!("tampered"),
            ..signed.clone().into_parts()
        })
        .unwrap();
        assert!(!tampered.verify(&key));
    }
}
