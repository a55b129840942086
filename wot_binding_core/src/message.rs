//! The transport-agnostic result of an interaction.

use core::fmt;

use crate::codec::Payload;

/// Where a [`Message`]'s status came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// HTTP status code.
    Http(u16),
    /// CoAP response code in dotted form, e.g. `2.05`.
    Coap(String),
    /// Transport failure code, e.g. `ETIMEDOUT`.
    Transport(String),
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Http(code) => write!(f, "{code}"),
            Self::Coap(code) | Self::Transport(code) => f.write_str(code),
        }
    }
}

/// A single result delivered to the caller.
///
/// Produced fresh per one-shot interaction or per inbound event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    /// Decoded payload, or raw bytes when decoding did not apply.
    pub payload: Option<Payload>,

    /// Status of the exchange.
    pub status: Option<Status>,

    /// Response headers with lower-case names.
    pub headers: Vec<(String, String)>,

    /// Final URL of the response (HTTP only).
    pub response_url: Option<String>,

    /// Error description, when the interaction failed.
    pub error: Option<String>,
}

impl Message {
    /// A message carrying only a payload.
    #[must_use]
    pub fn with_payload(payload: Payload) -> Self {
        Self {
            payload: Some(payload),
            ..Self::default()
        }
    }

    /// The diagnostic message for a failed request: payload `"<error>: <uri>"`.
    #[must_use]
    pub fn transport_error(code: impl Into<String>, error: &dyn fmt::Display, uri: &str) -> Self {
        let error = error.to_string();
        Self {
            payload: Some(Payload::Text(format!("{error}: {uri}"))),
            status: Some(Status::Transport(code.into())),
            error: Some(error),
            ..Self::default()
        }
    }

    /// A message carrying only an error, with no payload.
    #[must_use]
    pub fn failed(error: &dyn fmt::Display) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::default()
        }
    }

    /// Look up a header by name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Whether the interaction failed.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_formats_error_and_uri() {
        let msg = Message::transport_error("ECONNECT", &"connection refused", "http://d/p");
        assert_eq!(
            msg.payload,
            Some(Payload::Text("connection refused: http://d/p".into()))
        );
        assert_eq!(msg.status, Some(Status::Transport("ECONNECT".into())));
        assert!(msg.is_error());
    }

    #[test]
    fn failed_has_no_payload() {
        let msg = Message::failed(&"timeout");
        assert!(msg.payload.is_none());
        assert_eq!(msg.error.as_deref(), Some("timeout"));
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let msg = Message {
            headers: vec![("content-type".into(), "application/json".into())],
            ..Message::default()
        };
        assert_eq!(msg.header("Content-Type"), Some("application/json"));
        assert_eq!(msg.header("etag"), None);
    }

    #[test]
    fn status_display() {
        assert_eq!(Status::Http(204).to_string(), "204");
        assert_eq!(Status::Coap("2.05".into()).to_string(), "2.05");
    }
}
