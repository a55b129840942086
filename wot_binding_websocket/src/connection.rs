//! The WebSocket transport seam.

use futures::future::BoxFuture;
use wot_binding_core::security::Credential;

use crate::error::WebSocketError;

/// An inbound frame, as seen by the binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A text or binary data frame.
    Data(Vec<u8>),

    /// The peer closed the connection, or the stream ended.
    Close {
        /// Close code, if one was sent.
        code: Option<u16>,
        /// Close reason.
        reason: String,
    },
}

/// Where to connect and how to authenticate.
#[derive(Debug, Clone)]
pub struct WsTarget {
    /// Expanded `ws`/`wss` URI.
    pub uri: String,
    /// Credential sent in the opening handshake.
    pub credential: Option<Credential>,
}

/// One open WebSocket.
pub trait WsConnection: Send + 'static {
    /// Wait for the next data or close frame.
    ///
    /// Control frames are handled internally and never surface here.
    fn next_frame(&mut self) -> BoxFuture<'_, Result<Frame, WebSocketError>>;

    /// Close the socket.
    fn close(self: Box<Self>) -> BoxFuture<'static, ()>;
}

/// Opens WebSockets.
pub trait WsConnector: Clone + Send + Sync + 'static {
    /// Connect and complete the opening handshake.
    fn connect(
        &self,
        target: WsTarget,
    ) -> BoxFuture<'_, Result<Box<dyn WsConnection>, WebSocketError>>;
}
