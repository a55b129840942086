//! Generic HTTP client trait.
//!
//! This abstracts over the HTTP client implementation so the bindings only
//! see what they need: one request in, one response (or error) out.

use futures::future::BoxFuture;
use wot_binding_core::security::Credential;

/// Maps a transport failure to a short error code for `Message::status`.
pub trait ErrorCode {
    /// Code such as `ETIMEDOUT` or `ECONNECT`.
    fn code(&self) -> &'static str;
}

/// A minimal async HTTP client.
///
/// Implementations apply the request's [`Credential`]: basic and bearer up
/// front, digest only in answer to a challenge.
pub trait HttpClient: Clone + Send + Sync + 'static {
    /// The error type for HTTP operations.
    type Error: core::error::Error + ErrorCode + Send + Sync + 'static;

    /// Send a request and return the response.
    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, Self::Error>>;
}

/// A minimal HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    /// Method name, e.g. `GET`.
    pub method: String,

    /// Absolute target URL.
    pub url: String,

    /// Extra request headers.
    pub headers: Vec<(String, String)>,

    /// Request body.
    pub body: Option<Vec<u8>>,

    /// Credential to authenticate with.
    pub credential: Option<Credential>,
}

impl HttpRequest {
    /// Look up a request header by name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A minimal HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// The HTTP status code.
    pub status: u16,

    /// The response body bytes.
    pub body: Vec<u8>,

    /// Response headers (lowercase keys).
    pub headers: Vec<(String, String)>,

    /// Final URL after redirects.
    pub url: String,
}

impl HttpResponse {
    /// Look up a response header by name (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        let lower = name.to_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| k == &lower)
            .map(|(_, v)| v.as_str())
    }
}
