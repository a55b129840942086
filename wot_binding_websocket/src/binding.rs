//! The WebSocket session loop.

use core::time::Duration;

use wot_binding_core::{
    codec,
    emitter::MessageSink,
    interaction::Interaction,
    message::Message,
    schema,
    session::{Phase, SessionControl, StatusReporter},
};

use crate::connection::{Frame, WsConnection, WsConnector, WsTarget};

/// How a connected socket stopped being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ended {
    /// Shutdown was requested.
    Shutdown,
    /// The socket closed or failed; reconnect.
    Closed,
    /// Nobody is listening any more.
    ReceiverGone,
}

/// Delivers every inbound WebSocket frame as a message, reconnecting after
/// a fixed delay whenever the socket closes.
#[derive(Debug, Clone)]
pub struct WebSocketBinding<W: WsConnector> {
    connector: W,
    delay: Duration,
}

impl<W: WsConnector> WebSocketBinding<W> {
    /// Connect through `connector`, waiting `delay` before each reconnect.
    pub const fn new(connector: W, delay: Duration) -> Self {
        Self { connector, delay }
    }

    /// Run the session until `control` is shut down.
    ///
    /// The socket is closed before any reconnect wait begins, so at most one
    /// socket is open at a time.
    pub async fn run(
        &self,
        interaction: Interaction,
        sink: MessageSink,
        control: SessionControl,
        status: StatusReporter,
    ) {
        while control.is_active() {
            let uri = interaction.target();
            status.set(Phase::Connecting, "WS Connecting...");
            tracing::trace!("connecting websocket: {uri}");

            let target = WsTarget {
                uri: uri.clone(),
                credential: interaction.credential.clone(),
            };
            let connected = tokio::select! {
                () = control.shutdown_requested() => break,
                result = self.connector.connect(target) => result,
            };

            match connected {
                Ok(mut conn) => {
                    status.set(Phase::Connected, "WS Connected");
                    tracing::debug!("websocket opened: {uri}");

                    let ended = receive(conn.as_mut(), &interaction, &sink, &control, &status).await;
                    conn.close().await;

                    if ended != Ended::Closed {
                        break;
                    }
                }
                Err(e) => {
                    tracing::warn!("websocket error: {e}");
                    status.set(Phase::Error, format!("WS Error: {e}"));
                }
            }

            if !control.is_active() {
                break;
            }
            status.set(Phase::Reconnecting, "WS Reconnecting...");
            if !control.wait(self.delay).await {
                break;
            }
        }

        status.clear();
    }
}

async fn receive(
    conn: &mut dyn WsConnection,
    interaction: &Interaction,
    sink: &MessageSink,
    control: &SessionControl,
    status: &StatusReporter,
) -> Ended {
    let content_type = interaction.form.response_content_type();

    loop {
        let frame = tokio::select! {
            () = control.shutdown_requested() => return Ended::Shutdown,
            frame = conn.next_frame() => frame,
        };

        match frame {
            Ok(Frame::Data(bytes)) => {
                status.set(Phase::Connected, "WS OK");
                let payload = codec::decode(content_type, bytes);
                let _advisory =
                    schema::check("output", interaction.output_schema.as_ref(), &payload);
                if !sink.emit(Message::with_payload(payload)) {
                    return Ended::ReceiverGone;
                }
            }
            Ok(Frame::Close { code, reason }) => {
                tracing::trace!("websocket closed (code={code:?}, reason={reason})");
                return Ended::Closed;
            }
            Err(e) => {
                tracing::warn!("websocket error: {e}");
                status.set(Phase::Error, format!("WS Error: {e}"));
                return Ended::Closed;
            }
        }
    }
}
