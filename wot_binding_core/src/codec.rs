//! Content-type driven payload codec.
//!
//! Decoding never fails: a body that does not parse as its declared type is
//! passed through as [`Payload::Raw`].

use serde_json::Value;

/// `application/json`.
pub const APPLICATION_JSON: &str = "application/json";

/// `text/plain`.
pub const TEXT_PLAIN: &str = "text/plain";

/// `application/octet-stream`.
pub const APPLICATION_OCTET_STREAM: &str = "application/octet-stream";

/// `image/jpeg`.
pub const IMAGE_JPEG: &str = "image/jpeg";

/// A decoded (or passed-through) message payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// A structured JSON value.
    Json(Value),
    /// Text.
    Text(String),
    /// Unmodified bytes.
    Raw(Vec<u8>),
}

impl Payload {
    /// The JSON value, if this is [`Payload::Json`].
    #[must_use]
    pub const fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(v) => Some(v),
            Self::Text(_) | Self::Raw(_) => None,
        }
    }

    /// The value a schema should be checked against.
    ///
    /// Raw bytes have no JSON interpretation and are not validated.
    #[must_use]
    pub fn schema_instance(&self) -> Option<Value> {
        match self {
            Self::Json(v) => Some(v.clone()),
            Self::Text(s) => Some(Value::String(s.clone())),
            Self::Raw(_) => None,
        }
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// The media type without parameters, e.g. `text/plain; charset=utf-8` → `text/plain`.
#[must_use]
pub fn essence(content_type: &str) -> &str {
    content_type
        .split_once(';')
        .map_or(content_type, |(head, _)| head)
        .trim()
}

fn is(content_type: &str, media_type: &str) -> bool {
    essence(content_type).eq_ignore_ascii_case(media_type)
}

/// Whether a media type names binary content that must not be text-decoded.
#[must_use]
pub fn is_binary_type(content_type: &str) -> bool {
    is(content_type, IMAGE_JPEG) || is(content_type, APPLICATION_OCTET_STREAM)
}

/// Decode a body according to its content type.
///
/// - `application/json` → [`Payload::Json`], or [`Payload::Raw`] if it does not parse
/// - `text/plain` → [`Payload::Text`]
/// - anything else → [`Payload::Raw`]
#[must_use]
pub fn decode(content_type: &str, body: Vec<u8>) -> Payload {
    if is(content_type, APPLICATION_JSON) {
        match serde_json::from_slice(&body) {
            Ok(value) => Payload::Json(value),
            Err(e) => {
                tracing::debug!("body is not valid JSON, passing through raw: {e}");
                Payload::Raw(body)
            }
        }
    } else if is(content_type, TEXT_PLAIN) {
        Payload::Text(match String::from_utf8(body) {
            Ok(s) => s,
            Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
        })
    } else {
        Payload::Raw(body)
    }
}

/// Encode a payload for a request body of the given content type.
#[must_use]
pub fn encode(content_type: &str, payload: &Payload) -> Vec<u8> {
    match payload {
        Payload::Json(v) if is(content_type, APPLICATION_JSON) => v.to_string().into_bytes(),
        Payload::Json(Value::String(s)) => s.clone().into_bytes(),
        Payload::Json(v) => v.to_string().into_bytes(),
        Payload::Text(s) if is(content_type, APPLICATION_JSON) => {
            Value::String(s.clone()).to_string().into_bytes()
        }
        Payload::Text(s) => s.clone().into_bytes(),
        Payload::Raw(bytes) => bytes.clone(),
    }
}
