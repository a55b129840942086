//! Error types for the HTTP bindings.

use thiserror::Error;

use crate::http_client::ErrorCode;

/// Errors from the reqwest-backed client.
#[cfg(feature = "reqwest")]
#[derive(Debug, Error)]
pub enum ReqwestHttpError {
    /// The request failed at the transport level.
    ///
    /// The URL is stripped; callers report the target themselves.
    #[error("{0}")]
    Request(#[source] reqwest::Error),

    /// The form named a method that is not a valid HTTP token.
    #[error("invalid HTTP method '{0}'")]
    InvalidMethod(String),

    /// A digest challenge could not be answered.
    #[error("digest authentication failed: {0}")]
    Digest(String),
}

#[cfg(feature = "reqwest")]
impl From<reqwest::Error> for ReqwestHttpError {
    fn from(e: reqwest::Error) -> Self {
        Self::Request(e.without_url())
    }
}

#[cfg(feature = "reqwest")]
impl ErrorCode for ReqwestHttpError {
    fn code(&self) -> &'static str {
        match self {
            Self::Request(e) if e.is_timeout() => "ETIMEDOUT",
            Self::Request(e) if e.is_connect() => "ECONNECT",
            Self::Request(e) if e.is_body() || e.is_decode() => "EBODY",
            Self::Request(e) if e.is_redirect() => "EREDIRECT",
            Self::Request(_) => "EREQUEST",
            Self::InvalidMethod(_) => "EMETHOD",
            Self::Digest(_) => "EAUTH",
        }
    }
}

/// Error used by the in-memory test client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ScriptedError {
    /// Code reported through [`ErrorCode`].
    pub code: &'static str,
    /// Display text.
    pub message: String,
}

impl ErrorCode for ScriptedError {
    fn code(&self) -> &'static str {
        self.code
    }
}
