//! Canonical JSON codec
//!
//! Wire shape, keys always present and sorted byte-wise:
//!
//! ```text
//! {"aux":{..},"digest":<base64|null>,"phase":"..","protocol_id":"..","round":N,
//!  "sender_id":N,"signature":<base64>,"ssid":"..","value":<any>}
//! ```
//!
//! Binary fields use standard base64 with padding. Output has no
//! insignificant whitespace and nested objects are key-sorted too, so
//! encoding is deterministic.
//!
//! The parser stops at 128 levels of nesting, one of which is the message
//! object itself. Encode therefore rejects `value` and `aux` nested deeper
//! than [`MAX_PAYLOAD_DEPTH`] so that everything it emits decodes again.

use super::MessageSerializer;
use crate::{CodecConfig, DecodeError, Result};
use ba_message::canonical::{nesting_depth, to_canonical_bytes};
use ba_message::message::render_fields;
use ba_message::{field, Aux, Message, MessageParts, ValidationError, Value};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::de::{self, Deserialize, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde_json::Map;
use std::fmt;
use tracing::{debug, instrument, trace};

/// Deepest array/object nesting allowed in `value`, and in `aux` counting
/// the aux object itself
pub const MAX_PAYLOAD_DEPTH: usize = 126;

/// JSON serializer with canonical key ordering
#[derive(Debug, Clone, Default)]
pub struct JsonMessageSerializer {
    config: CodecConfig,
}

impl JsonMessageSerializer {
    /// Create a serializer with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a serializer with a custom configuration
    pub fn with_config(config: CodecConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    fn decode_message(&self, data: &[u8]) -> Result<Message> {
        if let Some(limit) = self.config.max_message_len {
            if data.len() > limit {
                return Err(DecodeError::TooLarge {
                    limit,
                    actual: data.len(),
                }
                .into());
            }
        }

        let parsed: Document = serde_json::from_slice(data).map_err(DecodeError::from)?;
        let Document::Object(object) = parsed else {
            return Err(DecodeError::NotAnObject.into());
        };

        let mut fields = WireFields::new(object)?;
        let parts = MessageParts {
            session_id: fields.text(field::SSID)?,
            round: fields.integer(field::ROUND)?,
            protocol_id: fields.text(field::PROTOCOL_ID)?,
            phase: fields.text(field::PHASE)?,
            sender_id: fields.integer(field::SENDER_ID)?,
            value: fields.take(field::VALUE),
            digest: fields.binary(field::DIGEST)?,
            aux: fields.object(field::AUX)?,
            signature: fields.binary(field::SIGNATURE)?,
        };

        let message = Message::try_from(parts)?;
        self.config.digest_policy.check(message.digest())?;
        Ok(message)
    }

    fn check_depth(&self, message: &Message) -> std::result::Result<(), ValidationError> {
        let value_depth = nesting_depth(message.value());
        if value_depth > MAX_PAYLOAD_DEPTH {
            return Err(ValidationError::NestingTooDeep {
                field: field::VALUE,
                limit: MAX_PAYLOAD_DEPTH,
                actual: value_depth,
            });
        }

        let aux_depth = 1 + message.aux().values().map(nesting_depth).max().unwrap_or(0);
        if aux_depth > MAX_PAYLOAD_DEPTH {
            return Err(ValidationError::NestingTooDeep {
                field: field::AUX,
                limit: MAX_PAYLOAD_DEPTH,
                actual: aux_depth,
            });
        }
        Ok(())
    }
}

impl MessageSerializer for JsonMessageSerializer {
    fn format(&self) -> &'static str {
        "json"
    }

    #[instrument(skip_all, fields(ssid = message.session_id(), round = message.round()))]
    fn encode(&self, message: &Message) -> Result<Vec<u8>> {
        message.validate()?;
        self.config.digest_policy.check(message.digest())?;
        self.check_depth(message)?;

        let object = render_fields(message.to_canonical_fields(), |bytes| STANDARD.encode(bytes));
        let bytes = to_canonical_bytes(&object);

        if let Some(limit) = self.config.max_message_len {
            if bytes.len() > limit {
                return Err(ValidationError::EncodedTooLarge {
                    limit,
                    actual: bytes.len(),
                }
                .into());
            }
        }

        trace!(len = bytes.len(), "Message encoded");
        Ok(bytes)
    }

    #[instrument(skip_all, fields(len = data.len()))]
    fn decode(&self, data: &[u8]) -> Result<Message> {
        let message = self.decode_message(data).map_err(|err| {
            debug!(%err, "Message decode rejected");
            err
        })?;

        trace!(sender = message.sender_id(), phase = message.phase(), "Message decoded");
        Ok(message)
    }
}

/// Top-level JSON document; objects with a repeated key are rejected
enum Document {
    Object(Map<String, Value>),
    Other,
}

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(DocumentVisitor)
    }
}

struct DocumentVisitor;

impl<'de> Visitor<'de> for DocumentVisitor {
    type Value = Document;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON document")
    }

    fn visit_map<A>(self, mut access: A) -> std::result::Result<Document, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut object = Map::new();
        while let Some(key) = access.next_key::<String>()? {
            if object.contains_key(&key) {
                return Err(de::Error::custom(format_args!("duplicate field `{}`", key)));
            }
            let value: Value = access.next_value()?;
            object.insert(key, value);
        }
        Ok(Document::Object(object))
    }

    fn visit_seq<A>(self, mut access: A) -> std::result::Result<Document, A::Error>
    where
        A: SeqAccess<'de>,
    {
        while access.next_element::<IgnoredAny>()?.is_some() {}
        Ok(Document::Other)
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> std::result::Result<Document, E> {
        Ok(Document::Other)
    }

    fn visit_i64<E: de::Error>(self, _: i64) -> std::result::Result<Document, E> {
        Ok(Document::Other)
    }

    fn visit_u64<E: de::Error>(self, _: u64) -> std::result::Result<Document, E> {
        Ok(Document::Other)
    }

    fn visit_f64<E: de::Error>(self, _: f64) -> std::result::Result<Document, E> {
        Ok(Document::Other)
    }

    fn visit_str<E: de::Error>(self, _: &str) -> std::result::Result<Document, E> {
        Ok(Document::Other)
    }

    fn visit_unit<E: de::Error>(self) -> std::result::Result<Document, E> {
        Ok(Document::Other)
    }
}

/// Top-level object of an encoded message, checked for exactly the wire keys
struct WireFields(Map<String, Value>);

impl WireFields {
    fn new(object: Map<String, Value>) -> std::result::Result<Self, DecodeError> {
        if let Some(missing) = field::ALL.iter().find(|name| !object.contains_key(**name)) {
            return Err(DecodeError::MissingField(*missing));
        }
        if let Some(unknown) = object.keys().find(|key| !field::ALL.contains(&key.as_str())) {
            return Err(DecodeError::UnknownField(unknown.clone()));
        }
        Ok(Self(object))
    }

    fn take(&mut self, name: &'static str) -> Value {
        self.0.remove(name).unwrap_or(Value::Null)
    }

    fn text(&mut self, name: &'static str) -> std::result::Result<Option<String>, DecodeError> {
        match self.take(name) {
            Value::Null => Ok(None),
            Value::String(text) => Ok(Some(text)),
            _ => Err(DecodeError::InvalidField {
                field: name,
                expected: "string",
            }),
        }
    }

    fn integer(&mut self, name: &'static str) -> std::result::Result<Option<u64>, DecodeError> {
        match self.take(name) {
            Value::Null => Ok(None),
            Value::Number(n) => n.as_u64().map(Some).ok_or(DecodeError::InvalidField {
                field: name,
                expected: "non-negative integer",
            }),
            _ => Err(DecodeError::InvalidField {
                field: name,
                expected: "non-negative integer",
            }),
        }
    }

    fn binary(&mut self, name: &'static str) -> std::result::Result<Option<Vec<u8>>, DecodeError> {
        match self.take(name) {
            Value::Null => Ok(None),
            Value::String(text) => STANDARD
                .decode(text)
                .map(Some)
                .map_err(|e| DecodeError::InvalidBase64 {
                    field: name,
                    reason: e.to_string(),
                }),
            _ => Err(DecodeError::InvalidField {
                field: name,
                expected: "base64 string",
            }),
        }
    }

    fn object(&mut self, name: &'static str) -> std::result::Result<Option<Aux>, DecodeError> {
        match self.take(name) {
            Value::Null => Ok(None),
            Value::Object(map) => Ok(Some(map.into_iter().collect())),
            _ => Err(DecodeError::InvalidField {
                field: name,
                expected: "object",
            }),
        }
    }
}
