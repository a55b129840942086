//! One-shot HTTP interactions.

use serde_json::Value;
use wot_binding_core::{
    codec::{self, Payload},
    emitter::ResultEmitter,
    interaction::{Interaction, Operation},
    message::{Message, Status},
    schema,
    td::Form,
};

use crate::http_client::{ErrorCode, HttpClient, HttpRequest, HttpResponse};

/// Performs read, write and invoke operations over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBinding<H: HttpClient> {
    client: H,
}

impl<H: HttpClient> HttpBinding<H> {
    /// Wrap an HTTP client.
    pub const fn new(client: H) -> Self {
        Self { client }
    }

    /// The underlying client.
    pub const fn client(&self) -> &H {
        &self.client
    }

    /// Perform the interaction and return its single result message.
    ///
    /// Transport failures are folded into the returned message.
    pub async fn execute(&self, interaction: &Interaction) -> Message {
        let request = build_request(interaction, default_method(interaction.operation));
        let uri = request.url.clone();
        tracing::trace!("{} {} ({})", request.method, uri, interaction.operation);

        match self.client.execute(request).await {
            Ok(resp) => response_message(
                &interaction.form,
                resp,
                interaction.output_schema.as_ref(),
            ),
            Err(e) => {
                tracing::warn!("{} {uri} failed: {e}", interaction.operation);
                Message::transport_error(e.code(), &e, &uri)
            }
        }
    }

    /// Perform the interaction and deliver the result through `emitter`.
    pub async fn dispatch(&self, interaction: &Interaction, emitter: ResultEmitter) {
        let message = self.execute(interaction).await;
        emitter.deliver(message);
    }
}

/// The method used when the form carries no `htv:methodName`.
#[must_use]
pub const fn default_method(operation: Operation) -> &'static str {
    match operation {
        Operation::WriteProperty => "PUT",
        Operation::InvokeAction => "POST",
        Operation::ReadProperty | Operation::ObserveProperty | Operation::SubscribeEvent => "GET",
    }
}

/// Build the request for an interaction.
///
/// A body is attached only for writes and invocations whose method is POST
/// or PUT.
pub(crate) fn build_request(interaction: &Interaction, fallback_method: &str) -> HttpRequest {
    let form = &interaction.form;
    let method = form
        .http_method
        .as_deref()
        .unwrap_or(fallback_method)
        .to_ascii_uppercase();

    let mut headers = Vec::new();
    let mut body = None;
    if interaction.operation.has_body() && (method == "POST" || method == "PUT") {
        if let Some(payload) = &interaction.body {
            headers.push(("content-type".to_string(), form.content_type.clone()));
            body = Some(codec::encode(&form.content_type, payload));
        }
    }

    HttpRequest {
        method,
        url: interaction.target(),
        headers,
        body,
        credential: interaction.credential.clone(),
    }
}

/// Turn an HTTP response into a message, decoding by the form's declared
/// response content type.
pub(crate) fn response_message(
    form: &Form,
    resp: HttpResponse,
    output_schema: Option<&Value>,
) -> Message {
    let response_type = form.response_content_type();
    let json_response =
        codec::essence(response_type).eq_ignore_ascii_case(codec::APPLICATION_JSON);
    // A binary request type keeps the body as bytes unless JSON is expected back.
    let payload = if codec::is_binary_type(&form.content_type) && !json_response {
        Payload::Raw(resp.body)
    } else {
        codec::decode(response_type, resp.body)
    };
    let _advisory = schema::check("output", output_schema, &payload);

    Message {
        payload: Some(payload),
        status: Some(Status::Http(resp.status)),
        headers: resp.headers,
        response_url: Some(resp.url),
        error: None,
    }
}
