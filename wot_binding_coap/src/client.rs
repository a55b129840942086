//! The CoAP transport seam.

use futures::future::BoxFuture;
use wot_binding_core::codec;

use crate::options::CoapRequestOptions;

/// A CoAP Content-Format option value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentFormat(pub u16);

impl ContentFormat {
    /// `text/plain;charset=utf-8`
    pub const TEXT_PLAIN: Self = Self(0);
    /// `application/link-format`
    pub const LINK_FORMAT: Self = Self(40);
    /// `application/xml`
    pub const XML: Self = Self(41);
    /// `application/octet-stream`
    pub const OCTET_STREAM: Self = Self(42);
    /// `application/exi`
    pub const EXI: Self = Self(47);
    /// `application/json`
    pub const JSON: Self = Self(50);
    /// `application/cbor`
    pub const CBOR: Self = Self(60);

    /// The registered media type, if known.
    #[must_use]
    pub const fn media_type(self) -> Option<&'static str> {
        match self.0 {
            0 => Some("text/plain;charset=utf-8"),
            40 => Some("application/link-format"),
            41 => Some("application/xml"),
            42 => Some(codec::APPLICATION_OCTET_STREAM),
            47 => Some("application/exi"),
            50 => Some(codec::APPLICATION_JSON),
            60 => Some("application/cbor"),
            _ => None,
        }
    }
}

/// A request ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoapRequest {
    /// Target and method.
    pub options: CoapRequestOptions,
    /// Request payload.
    pub payload: Option<Vec<u8>>,
}

/// A response, or one Observe notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoapResponse {
    /// Response code in dotted form, e.g. `2.05`.
    pub code: String,
    /// Content-Format option, if present.
    pub content_format: Option<ContentFormat>,
    /// Payload bytes.
    pub payload: Vec<u8>,
}

/// A minimal async CoAP client.
pub trait CoapClient: Clone + Send + Sync + 'static {
    /// The error type for CoAP exchanges.
    type Error: core::error::Error + Send + Sync + 'static;

    /// A live observation.
    type Observation: ObserveStream<Error = Self::Error>;

    /// Send a request and wait for its response.
    fn request(&self, request: CoapRequest) -> BoxFuture<'_, Result<CoapResponse, Self::Error>>;

    /// Register as an observer of a resource.
    fn observe(&self, request: CoapRequest)
        -> BoxFuture<'_, Result<Self::Observation, Self::Error>>;
}

/// Notifications from one Observe registration.
pub trait ObserveStream: Send + 'static {
    /// The error type for notifications.
    type Error: core::error::Error + Send + Sync + 'static;

    /// The next notification, or `None` once the server ends the
    /// observation.
    fn next_notification(&mut self) -> BoxFuture<'_, Option<Result<CoapResponse, Self::Error>>>;

    /// Deregister and release the stream.
    fn close(self) -> BoxFuture<'static, ()>;
}
