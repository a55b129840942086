//! Request options derived from a form href.

use core::fmt;

use url::Url;

use crate::{error::CoapError, COAPS_PORT, COAP_PORT};

/// CoAP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoapMethod {
    /// `0.01`
    Get,
    /// `0.02`
    Post,
    /// `0.03`
    Put,
    /// `0.04`
    Delete,
}

impl CoapMethod {
    /// Map a `cov:methodName` value to a method.
    ///
    /// Accepts the short code (`"1"`), the dotted code (`"0.01"`) or the
    /// name in lower or upper case. Anything unrecognised is `GET`.
    #[must_use]
    pub fn from_code(code: &str) -> Self {
        match code {
            "2" | "0.02" | "post" | "POST" => Self::Post,
            "3" | "0.03" | "put" | "PUT" => Self::Put,
            "4" | "0.04" | "delete" | "DELETE" => Self::Delete,
            _ => Self::Get,
        }
    }

    /// Lower-case method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "get",
            Self::Post => "post",
            Self::Put => "put",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for CoapMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where and how to send a CoAP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoapRequestOptions {
    /// Host name or address, without IPv6 brackets.
    pub hostname: String,
    /// UDP port.
    pub port: u16,
    /// Resource path.
    pub path: String,
    /// Query string without the leading `?`.
    pub query: String,
    /// Request method.
    pub method: CoapMethod,
    /// Whether to register as an observer.
    pub observe: bool,
    /// Whether to use DTLS (`coaps`).
    pub secure: bool,
}

impl CoapRequestOptions {
    /// Parse an expanded href.
    ///
    /// # Errors
    ///
    /// Returns [`CoapError`] if the href is not an absolute `coap`/`coaps`
    /// URI with a host.
    pub fn from_href(uri: &str, method: CoapMethod, observe: bool) -> Result<Self, CoapError> {
        let url = Url::parse(uri).map_err(|source| CoapError::InvalidUri {
            uri: uri.to_string(),
            source,
        })?;

        let secure = match url.scheme() {
            "coap" => false,
            "coaps" => true,
            _ => return Err(CoapError::WrongScheme(uri.to_string())),
        };

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| CoapError::MissingHost(uri.to_string()))?;
        let hostname = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host)
            .to_string();

        let port = url
            .port()
            .unwrap_or(if secure { COAPS_PORT } else { COAP_PORT });

        let path = if url.path().is_empty() {
            "/".to_string()
        } else {
            url.path().to_string()
        };

        Ok(Self {
            hostname,
            port,
            path,
            query: url.query().unwrap_or_default().to_string(),
            method,
            observe,
            secure,
        })
    }
}
