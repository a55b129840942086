//! Error types.

use thiserror::Error;

/// Problem while opening or reading a WebSocket.
#[derive(Debug, Error)]
pub enum WebSocketError {
    /// Socket-level I/O failure.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// WebSocket protocol or handshake failure.
    #[cfg(feature = "tokio_client")]
    #[error(transparent)]
    WebSocket(#[from] tungstenite::Error),

    /// The href is not a usable `ws`/`wss` URI.
    #[error("invalid WebSocket URI '{0}'")]
    InvalidUri(String),

    /// The credential cannot be expressed as a header value.
    #[error("invalid authorization header")]
    InvalidAuthorization,

    /// The HTTP proxy refused or garbled the CONNECT tunnel.
    #[error("proxy tunnel failed: {0}")]
    Proxy(String),
}
