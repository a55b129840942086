//! The caller-facing entry point.

use std::sync::Arc;

use serde_json::{Map, Value};
use wot_binding_coap::client::CoapClient;
use wot_binding_core::{
    codec::Payload,
    config::BindingConfig,
    emitter::{completion, message_channel, MessageSink, Outcome, ResultEmitter},
    interaction::{Interaction, Operation},
    message::Message,
    schema,
    security::build_credential,
    session::{SessionControl, StatusReceiver, StatusReporter},
    td::{Affordance, AffordanceKind, ThingDescription},
};
use wot_binding_http::http_client::HttpClient;
use wot_binding_websocket::connection::WsConnector;

use crate::{
    error::{ClientError, SessionError},
    router::{Route, TransportRouter},
    session_manager::{SessionId, SessionManager, Spawn, TokioSpawn},
};

/// Which affordance, and which of its forms, an interaction goes through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffordanceRef {
    /// Affordance kind.
    pub kind: AffordanceKind,
    /// Affordance name.
    pub name: String,
    /// Index into the affordance's forms.
    pub form_index: usize,
}

impl AffordanceRef {
    /// A property, through its first form.
    #[must_use]
    pub fn property(name: impl Into<String>) -> Self {
        Self::new(AffordanceKind::Property, name)
    }

    /// An action, through its first form.
    #[must_use]
    pub fn action(name: impl Into<String>) -> Self {
        Self::new(AffordanceKind::Action, name)
    }

    /// An event, through its first form.
    #[must_use]
    pub fn event(name: impl Into<String>) -> Self {
        Self::new(AffordanceKind::Event, name)
    }

    fn new(kind: AffordanceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            form_index: 0,
        }
    }

    /// Use the form at `index` instead.
    #[must_use]
    pub const fn with_form(mut self, index: usize) -> Self {
        self.form_index = index;
        self
    }
}

/// Runs interactions against one Thing.
///
/// Owns the Thing Description, the configuration, one binding per
/// transport and every live subscription.
#[derive(Debug)]
pub struct ThingClient<H: HttpClient, C: CoapClient, W: WsConnector, S: Spawn = TokioSpawn> {
    td: Arc<ThingDescription>,
    config: BindingConfig,
    router: TransportRouter<H, C, W>,
    sessions: SessionManager<S>,
}

impl<H: HttpClient, C: CoapClient, W: WsConnector> ThingClient<H, C, W> {
    /// A client that runs sessions on the ambient Tokio runtime.
    pub fn new(td: ThingDescription, config: BindingConfig, http: H, coap: C, websocket: W) -> Self {
        Self::with_spawner(td, config, http, coap, websocket, TokioSpawn)
    }
}

impl<H: HttpClient, C: CoapClient, W: WsConnector, S: Spawn> ThingClient<H, C, W, S> {
    /// A client that runs sessions through `spawner`.
    pub fn with_spawner(
        td: ThingDescription,
        config: BindingConfig,
        http: H,
        coap: C,
        websocket: W,
        spawner: S,
    ) -> Self {
        let router = TransportRouter::new(http, coap, websocket, config.reconnect_delay);
        Self {
            td: Arc::new(td),
            config,
            router,
            sessions: SessionManager::new(spawner),
        }
    }

    /// The Thing Description.
    #[must_use]
    pub fn thing(&self) -> &ThingDescription {
        &self.td
    }

    /// Resolve an affordance and form and prepare the interaction.
    ///
    /// `input` becomes the URI Template variables when the affordance
    /// declares `uriVariables` (reads, observations, subscriptions and
    /// invocations) and the request body for writes and invocations. Every
    /// schema check here is advisory.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the affordance or form does not exist, or
    /// the operation does not apply to it.
    pub fn prepare(
        &self,
        operation: Operation,
        target: &AffordanceRef,
        input: Option<Payload>,
    ) -> Result<Interaction, ClientError> {
        if operation.affordance_kind() != target.kind {
            return Err(ClientError::OperationMismatch {
                operation,
                kind: target.kind,
            });
        }

        let affordance = self.td.affordance(target.kind, &target.name)?;
        let form = affordance.form(target.form_index)?.clone();
        let mut interaction = Interaction::new(operation, form);

        if operation != Operation::WriteProperty {
            interaction.uri_variables = uri_variables(affordance, input.as_ref());
        }
        if operation.has_body() {
            if let Some(body) = &input {
                let _advisory = schema::check("input", affordance.input_schema(), body);
            }
            interaction.body = input;
        }

        interaction.credential = build_credential(&self.td, &interaction.form, &self.config.secrets);
        interaction.output_schema = affordance.output_schema().cloned();
        Ok(interaction)
    }

    /// Run a one-shot interaction, delivering its result through `emitter`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the interaction cannot be prepared; the
    /// emitter is then dropped and its waiter sees cancellation.
    pub async fn invoke(
        &self,
        operation: Operation,
        target: &AffordanceRef,
        input: Option<Payload>,
        emitter: ResultEmitter,
    ) -> Result<Route, ClientError> {
        if !operation.is_one_shot() {
            return Err(ClientError::NotOneShot(operation));
        }
        let interaction = self.prepare(operation, target, input)?;
        Ok(self.router.dispatch(&interaction, emitter).await)
    }

    /// Run a one-shot interaction and wait for its result.
    ///
    /// Returns `Ok(None)` when no binding handles the form.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the interaction cannot be prepared.
    pub async fn call(
        &self,
        operation: Operation,
        target: &AffordanceRef,
        input: Option<Payload>,
    ) -> Result<Option<Message>, ClientError> {
        let (sink, rx) = message_channel();
        let (done, waiter) = completion();
        self.invoke(operation, target, input, ResultEmitter::new(sink, Some(done)))
            .await?;

        match waiter.await {
            Ok(Outcome::Delivered) => Ok(rx.try_recv().ok()),
            Ok(Outcome::NotDispatched) | Err(_) => Ok(None),
        }
    }

    /// Start an observation or event subscription. Every inbound payload is
    /// emitted into `sink` until [`unsubscribe`](Self::unsubscribe).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError`] if the interaction cannot be prepared or the
    /// operation is one-shot.
    pub async fn subscribe(
        &self,
        operation: Operation,
        target: &AffordanceRef,
        input: Option<Payload>,
        sink: MessageSink,
    ) -> Result<SessionId, ClientError> {
        if operation.is_one_shot() {
            return Err(ClientError::NotSubscription(operation));
        }
        let interaction = self.prepare(operation, target, input)?;

        let control = SessionControl::new();
        let (status, status_rx) = StatusReporter::new();
        let (route, task) = self
            .router
            .session_task(interaction, sink, control.clone(), status)
            .ok_or(ClientError::NotSubscription(operation))?;

        Ok(self.sessions.open(route, task, control, status_rx).await)
    }

    /// Status of a live subscription.
    pub async fn status(&self, id: SessionId) -> Option<StatusReceiver> {
        self.sessions.status(id).await
    }

    /// Stop one subscription.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Unknown`] if it is not live.
    pub async fn unsubscribe(&self, id: SessionId) -> Result<(), SessionError> {
        self.sessions.shutdown(id).await
    }

    /// Stop every subscription.
    pub async fn close(&self) {
        self.sessions.shutdown_all().await;
    }
}

/// The URI Template variables for an affordance, taken from the caller's
/// input when the affordance declares `uriVariables`.
///
/// `uriVariables` maps each variable to its own schema, so the input is
/// checked as an object with those properties.
fn uri_variables(affordance: &Affordance, input: Option<&Payload>) -> Map<String, Value> {
    let Some(declared) = affordance.uri_variables() else {
        return Map::new();
    };

    let Some(input) = input else {
        return Map::new();
    };
    let vars_schema = serde_json::json!({ "type": "object", "properties": declared });
    let _advisory = schema::check("uri variables", Some(&vars_schema), input);

    match input {
        Payload::Json(Value::Object(vars)) => vars.clone(),
        _ => {
            tracing::warn!(
                "{} '{}' declares uriVariables but the input is not an object",
                affordance.kind(),
                affordance.name()
            );
            Map::new()
        }
    }
}
