//! HTTP long-poll session loop.
//!
//! The fallback for observations and event subscriptions whose form is not
//! a WebSocket or CoAP URI. Each round issues one request, emits whatever
//! comes back (a response or a diagnostic), then waits out the reconnect
//! delay before polling again. There is no backoff and no attempt cap.

use core::{pin::pin, time::Duration};

use futures::future::{select, Either};
use wot_binding_core::{
    emitter::MessageSink,
    interaction::Interaction,
    message::Message,
    session::{Phase, SessionControl, StatusReporter},
};

use crate::{
    binding::{build_request, response_message},
    http_client::{ErrorCode, HttpClient},
};

/// Repeatedly polls a form until its session is shut down.
#[derive(Debug, Clone)]
pub struct LongPollBinding<H: HttpClient> {
    client: H,
    delay: Duration,
}

impl<H: HttpClient> LongPollBinding<H> {
    /// Poll through `client`, pausing `delay` between rounds.
    pub const fn new(client: H, delay: Duration) -> Self {
        Self { client, delay }
    }

    /// Run the poll loop.
    ///
    /// Returns once `control` is shut down or the message receiver is gone.
    /// An in-flight request is dropped (aborted) as soon as shutdown is
    /// requested.
    pub async fn run(
        &self,
        interaction: Interaction,
        sink: MessageSink,
        control: SessionControl,
        status: StatusReporter,
    ) {
        loop {
            if !control.is_active() {
                break;
            }

            let request = build_request(&interaction, "GET");
            let uri = request.url.clone();
            tracing::trace!("long-poll {} {uri}", request.method);
            status.set(Phase::Connecting, "Connecting...");

            let poll = pin!(self.client.execute(request));
            let cancel = pin!(control.shutdown_requested());

            let message = match select(poll, cancel).await {
                Either::Right(_) => {
                    tracing::debug!("long-poll of {uri} cancelled");
                    break;
                }
                Either::Left((Ok(resp), _)) => {
                    status.set(Phase::Connected, "OK");
                    response_message(&interaction.form, resp, interaction.output_schema.as_ref())
                }
                Either::Left((Err(e), _)) => {
                    tracing::warn!("long-poll of {uri} failed: {e}");
                    status.set(Phase::Error, "Polling error");
                    Message::transport_error(e.code(), &e, &uri)
                }
            };

            if !sink.emit(message) {
                tracing::debug!("long-poll of {uri} has no receiver, stopping");
                break;
            }

            if !control.wait(self.delay).await {
                break;
            }
        }

        status.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeHttpClient;
    use serde_json::json;
    use testresult::TestResult;
    use wot_binding_core::{
        codec::Payload,
        emitter::message_channel,
        interaction::Operation,
        message::Status,
        td::Form,
        DEFAULT_RECONNECT_DELAY,
    };

    fn observe(href: &str) -> Interaction {
        Interaction::new(
            Operation::ObserveProperty,
            Form {
                href: href.into(),
                content_type: "application/json".into(),
                security: None,
                http_method: None,
                coap_method: None,
                response_content_type: None,
                op: Vec::new(),
            },
        )
    }

    #[tokio::test(start_paused = true)]
    async fn failed_poll_is_emitted_and_retried_after_delay() -> TestResult {
        let client = FakeHttpClient::new();
        client.always_err("ECONNREFUSED", "connect ECONNREFUSED");
        let binding = LongPollBinding::new(client.clone(), DEFAULT_RECONNECT_DELAY);

        let (sink, rx) = message_channel();
        let control = SessionControl::new();
        let (status, status_rx) = StatusReporter::new();
        let task = tokio::spawn({
            let control = control.clone();
            async move {
                binding
                    .run(observe("http://lamp.local/props/on"), sink, control, status)
                    .await;
            }
        });

        let first = rx.recv().await?;
        assert_eq!(
            first.payload,
            Some(Payload::Text(
                "connect ECONNREFUSED: http://lamp.local/props/on".into()
            ))
        );
        assert_eq!(
            status_rx.borrow().as_ref().map(|s| s.text.clone()),
            Some("Polling error".to_string())
        );

        let second = rx.recv().await?;
        assert!(second.is_error());

        let times = client.request_times();
        assert!(times.len() >= 2);
        assert_eq!(times[1] - times[0], DEFAULT_RECONNECT_DELAY);

        control.begin_shutdown();
        task.await?;
        assert!(status_rx.borrow().is_none());
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn successful_polls_are_decoded() -> TestResult {
        let client = FakeHttpClient::new();
        client.push_ok(200, br#"{"on":true}"#.to_vec());
        client.push_ok(200, br#"{"on":false}"#.to_vec());
        let binding = LongPollBinding::new(client, Duration::from_secs(5));

        let (sink, rx) = message_channel();
        let control = SessionControl::new();
        let (status, _status_rx) = StatusReporter::new();
        let task = tokio::spawn({
            let control = control.clone();
            async move {
                binding
                    .run(observe("http://lamp.local/props/on"), sink, control, status)
                    .await;
            }
        });

        let first = rx.recv().await?;
        assert_eq!(first.payload, Some(Payload::Json(json!({ "on": true }))));
        assert_eq!(first.status, Some(Status::Http(200)));
        let second = rx.recv().await?;
        assert_eq!(second.payload, Some(Payload::Json(json!({ "on": false }))));

        control.begin_shutdown();
        task.await?;
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_aborts_in_flight_request() -> TestResult {
        let client = FakeHttpClient::new();
        let binding = LongPollBinding::new(client.clone(), DEFAULT_RECONNECT_DELAY);

        let (sink, rx) = message_channel();
        let control = SessionControl::new();
        let (status, _status_rx) = StatusReporter::new();
        let task = tokio::spawn({
            let control = control.clone();
            async move {
                binding
                    .run(observe("http://lamp.local/events/x"), sink, control, status)
                    .await;
            }
        });

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(client.requests().len(), 1);

        control.begin_shutdown();
        task.await?;
        assert!(rx.try_recv().is_err());
        assert_eq!(client.requests().len(), 1);
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_during_wait_prevents_next_poll() -> TestResult {
        let client = FakeHttpClient::new();
        client.push_ok(200, b"1".to_vec());
        let binding = LongPollBinding::new(client.clone(), DEFAULT_RECONNECT_DELAY);

        let (sink, rx) = message_channel();
        let control = SessionControl::new();
        let (status, _status_rx) = StatusReporter::new();
        let task = tokio::spawn({
            let control = control.clone();
            async move {
                binding
                    .run(observe("http://d/p"), sink, control, status)
                    .await;
            }
        });

        let _ = rx.recv().await?;
        tokio::time::sleep(Duration::from_secs(2)).await;
        control.begin_shutdown();
        task.await?;

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(client.requests().len(), 1);
        Ok(())
    }
}
