//! Transport selection.
//!
//! A form's URI scheme together with the operation picks exactly one
//! binding. One-shot operations on a scheme no binding handles are not
//! dispatched at all: nothing is emitted and the completion reports
//! [`Outcome::NotDispatched`](wot_binding_core::emitter::Outcome::NotDispatched).

use core::{fmt, time::Duration};

use futures::{future::BoxFuture, FutureExt};
use wot_binding_coap::{binding::CoapBinding, client::CoapClient};
use wot_binding_core::{
    emitter::{MessageSink, ResultEmitter},
    interaction::{Interaction, Operation},
    session::{SessionControl, StatusReporter},
};
use wot_binding_http::{binding::HttpBinding, http_client::HttpClient, longpoll::LongPollBinding};
use wot_binding_websocket::{binding::WebSocketBinding, connection::WsConnector};

/// The binding a form is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// One-shot HTTP request.
    Http,
    /// CoAP request, or CoAP Observe for subscriptions.
    Coap,
    /// WebSocket subscription.
    WebSocket,
    /// HTTP long-poll subscription.
    LongPoll,
    /// No binding handles this form for this operation.
    Unsupported,
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Http => "http",
            Self::Coap => "coap",
            Self::WebSocket => "websocket",
            Self::LongPoll => "long-poll",
            Self::Unsupported => "unsupported",
        })
    }
}

/// The lower-cased URI scheme of an href, if it has one.
fn scheme(href: &str) -> Option<String> {
    let (scheme, _) = href.split_once(':')?;
    let mut chars = scheme.chars();
    let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then(|| scheme.to_ascii_lowercase())
}

/// Pick the binding for `href` under `operation`.
///
/// | operation | `http(s)` | `coap(s)` | `ws(s)` | other |
/// |---|---|---|---|---|
/// | read / write / invoke | Http | Coap | Unsupported | Unsupported |
/// | observe / subscribe | LongPoll | Coap | WebSocket | LongPoll |
#[must_use]
pub fn classify(href: &str, operation: Operation) -> Route {
    let scheme = scheme(href);
    let scheme = scheme.as_deref();

    if operation.is_one_shot() {
        match scheme {
            Some("http" | "https") => Route::Http,
            Some("coap" | "coaps") => Route::Coap,
            _ => Route::Unsupported,
        }
    } else {
        match scheme {
            Some("ws" | "wss") => Route::WebSocket,
            Some("coap" | "coaps") => Route::Coap,
            _ => Route::LongPoll,
        }
    }
}

/// Owns one binding per transport and hands interactions to the right one.
#[derive(Debug, Clone)]
pub struct TransportRouter<H: HttpClient, C: CoapClient, W: WsConnector> {
    http: HttpBinding<H>,
    long_poll: LongPollBinding<H>,
    coap: CoapBinding<C>,
    websocket: WebSocketBinding<W>,
}

impl<H: HttpClient, C: CoapClient, W: WsConnector> TransportRouter<H, C, W> {
    /// Build a router over the given transports. Sessions wait
    /// `reconnect_delay` between attempts.
    pub fn new(http: H, coap: C, websocket: W, reconnect_delay: Duration) -> Self {
        Self {
            http: HttpBinding::new(http.clone()),
            long_poll: LongPollBinding::new(http, reconnect_delay),
            coap: CoapBinding::new(coap),
            websocket: WebSocketBinding::new(websocket, reconnect_delay),
        }
    }

    /// Run a one-shot interaction, delivering through `emitter`.
    ///
    /// The emitter is consumed on every path, so completion fires exactly
    /// once.
    pub async fn dispatch(&self, interaction: &Interaction, emitter: ResultEmitter) -> Route {
        let route = if interaction.operation.is_one_shot() {
            classify(&interaction.form.href, interaction.operation)
        } else {
            tracing::warn!(
                "{} is not a one-shot operation, not dispatching",
                interaction.operation
            );
            Route::Unsupported
        };

        match route {
            Route::Http => self.http.dispatch(interaction, emitter).await,
            Route::Coap => self.coap.dispatch(interaction, emitter).await,
            Route::WebSocket | Route::LongPoll | Route::Unsupported => {
                tracing::warn!(
                    "no binding for {} on '{}', not dispatched",
                    interaction.operation,
                    interaction.form.href
                );
                emitter.not_dispatched();
            }
        }

        route
    }

    /// The long-running task for a subscription, or `None` when the
    /// operation is one-shot.
    pub fn session_task(
        &self,
        interaction: Interaction,
        sink: MessageSink,
        control: SessionControl,
        status: StatusReporter,
    ) -> Option<(Route, BoxFuture<'static, ()>)> {
        if interaction.operation.is_one_shot() {
            return None;
        }

        let route = classify(&interaction.form.href, interaction.operation);
        let task = match route {
            Route::WebSocket => {
                let binding = self.websocket.clone();
                async move { binding.run(interaction, sink, control, status).await }.boxed()
            }
            Route::Coap => {
                let binding = self.coap.clone();
                async move { binding.observe(interaction, sink, control, status).await }.boxed()
            }
            Route::LongPoll => {
                let binding = self.long_poll.clone();
                async move { binding.run(interaction, sink, control, status).await }.boxed()
            }
            Route::Http | Route::Unsupported => return None,
        };

        Some((route, task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_shot_routes() {
        for op in [
            Operation::ReadProperty,
            Operation::WriteProperty,
            Operation::InvokeAction,
        ] {
            assert_eq!(classify("https://lamp/status", op), Route::Http);
            assert_eq!(classify("HTTP://lamp/status", op), Route::Http);
            assert_eq!(classify("coaps://lamp/status", op), Route::Coap);
            assert_eq!(classify("ws://lamp/status", op), Route::Unsupported);
            assert_eq!(classify("mqtt://lamp/status", op), Route::Unsupported);
            assert_eq!(classify("/relative/status", op), Route::Unsupported);
        }
    }

    #[test]
    fn subscription_routes() {
        for op in [Operation::ObserveProperty, Operation::SubscribeEvent] {
            assert_eq!(classify("wss://lamp/events", op), Route::WebSocket);
            assert_eq!(classify("coap://lamp/events", op), Route::Coap);
            assert_eq!(classify("http://lamp/events", op), Route::LongPoll);
            assert_eq!(classify("mqtt://lamp/events", op), Route::LongPoll);
        }
    }

    #[test]
    fn templated_href_still_has_a_scheme() {
        assert_eq!(
            classify("http://{host}/status{?unit}", Operation::ReadProperty),
            Route::Http
        );
        assert_eq!(scheme("1http://x"), None);
    }
}
