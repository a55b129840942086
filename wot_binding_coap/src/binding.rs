//! CoAP one-shot and Observe bindings.

use serde_json::Value;
use wot_binding_core::{
    codec,
    emitter::{MessageSink, ResultEmitter},
    interaction::{Interaction, Operation},
    message::{Message, Status},
    schema,
    session::{Phase, SessionControl, StatusReporter},
};

use crate::{
    client::{CoapClient, CoapRequest, CoapResponse, ObserveStream},
    error::CoapError,
    options::{CoapMethod, CoapRequestOptions},
};

/// Performs CoAP interactions through a [`CoapClient`].
#[derive(Debug, Clone)]
pub struct CoapBinding<C: CoapClient> {
    client: C,
}

impl<C: CoapClient> CoapBinding<C> {
    /// Wrap a CoAP client.
    pub const fn new(client: C) -> Self {
        Self { client }
    }

    /// Perform a read, write or invoke and return the single result.
    ///
    /// Failures yield a message with `error` set and no payload.
    pub async fn execute(&self, interaction: &Interaction) -> Message {
        let request = match build_request(interaction, false) {
            Ok(request) => request,
            Err(e) => {
                tracing::warn!("CoAP request error: {e}");
                return Message::failed(&e);
            }
        };
        tracing::trace!(
            "CoAP request: {:?}, {} payload bytes",
            request.options,
            request.payload.as_ref().map_or(0, Vec::len)
        );

        match self.client.request(request).await {
            Ok(resp) => response_message(resp, interaction.output_schema.as_ref()),
            Err(e) => {
                tracing::warn!("CoAP request error: {e}");
                Message::failed(&e)
            }
        }
    }

    /// Perform the interaction and deliver the result through `emitter`.
    pub async fn dispatch(&self, interaction: &Interaction, emitter: ResultEmitter) {
        let message = self.execute(interaction).await;
        emitter.deliver(message);
    }

    /// Observe a resource until shutdown or until the server ends the
    /// observation.
    ///
    /// Each notification becomes its own message, decoded by its own
    /// Content-Format. The observation is not re-established.
    pub async fn observe(
        &self,
        interaction: Interaction,
        sink: MessageSink,
        control: SessionControl,
        status: StatusReporter,
    ) {
        status.set(Phase::Connecting, "CoAP try to observe ...");

        let request = match build_request(&interaction, true) {
            Ok(request) => request,
            Err(e) => {
                report_failure(&e, &sink, &status);
                return;
            }
        };
        tracing::trace!("CoAP observe request: {:?}", request.options);

        let registered = tokio::select! {
            () = control.shutdown_requested() => None,
            result = self.client.observe(request) => Some(result),
        };
        let mut stream = match registered {
            None => {
                status.clear();
                return;
            }
            Some(Err(e)) => {
                report_failure(&e, &sink, &status);
                return;
            }
            Some(Ok(stream)) => stream,
        };

        status.set(Phase::Connected, "CoAP Observing");
        tracing::info!("observing {}", interaction.target());

        loop {
            let next = tokio::select! {
                () = control.shutdown_requested() => break,
                next = stream.next_notification() => next,
            };

            match next {
                Some(Ok(notification)) => {
                    let message = response_message(notification, interaction.output_schema.as_ref());
                    if !sink.emit(message) {
                        break;
                    }
                }
                Some(Err(e)) => {
                    report_failure(&e, &sink, &status);
                    break;
                }
                None => {
                    tracing::debug!("observation of {} ended by server", interaction.target());
                    break;
                }
            }
        }

        stream.close().await;
        if !control.is_active() {
            status.clear();
        }
    }
}

fn report_failure(e: &dyn core::error::Error, sink: &MessageSink, status: &StatusReporter) {
    tracing::warn!("CoAP request error: {e}");
    status.set(Phase::Error, format!("CoAP Error: {e}"));
    sink.emit(Message::failed(&e));
}

/// The method used when the form carries no `cov:methodName`.
#[must_use]
pub const fn default_method(operation: Operation) -> CoapMethod {
    match operation {
        Operation::WriteProperty => CoapMethod::Put,
        Operation::InvokeAction => CoapMethod::Post,
        Operation::ReadProperty | Operation::ObserveProperty | Operation::SubscribeEvent => {
            CoapMethod::Get
        }
    }
}

fn build_request(interaction: &Interaction, observe: bool) -> Result<CoapRequest, CoapError> {
    let form = &interaction.form;
    let method = form
        .coap_method
        .as_deref()
        .map_or_else(|| default_method(interaction.operation), CoapMethod::from_code);

    let options = CoapRequestOptions::from_href(&interaction.target(), method, observe)?;
    let payload = interaction
        .body
        .as_ref()
        .filter(|_| interaction.operation.has_body())
        .map(|body| codec::encode(&form.content_type, body));

    Ok(CoapRequest { options, payload })
}

fn response_message(resp: CoapResponse, output_schema: Option<&Value>) -> Message {
    let media_type = resp
        .content_format
        .and_then(|cf| cf.media_type())
        .unwrap_or(codec::APPLICATION_OCTET_STREAM);
    let payload = codec::decode(media_type, resp.payload);
    let _advisory = schema::check("output", output_schema, &payload);

    Message {
        payload: Some(payload),
        status: Some(Status::Coap(resp.code)),
        ..Message::default()
    }
}
