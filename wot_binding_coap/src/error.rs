//! Error types for the CoAP bindings.

use thiserror::Error;

/// A form href that cannot be turned into CoAP request options.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoapError {
    /// The href is not a valid URI.
    #[error("invalid CoAP URI '{uri}': {source}")]
    InvalidUri {
        /// The offending href.
        uri: String,
        /// Parse failure.
        #[source]
        source: url::ParseError,
    },

    /// The href is not a `coap` or `coaps` URI.
    #[error("'{0}' is not a coap or coaps URI")]
    WrongScheme(String),

    /// The href has no host.
    #[error("CoAP URI '{0}' has no host")]
    MissingHost(String),
}

/// Error used by the in-memory test client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ScriptedCoapError(pub String);
