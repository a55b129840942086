//! End-to-end interactions through [`ThingClient`] over in-memory transports.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::{sync::OnceLock, time::Duration};

use serde_json::json;
use testresult::TestResult;
use wot_binding::{error::ClientError, AffordanceRef, Route, ThingClient};
use wot_binding_coap::{
    client::{CoapResponse, ContentFormat},
    options::CoapMethod,
    test_utils::FakeCoapClient,
};
use wot_binding_core::{
    codec::Payload,
    config::{BindingConfig, Secrets},
    emitter::{completion, message_channel, Outcome, ResultEmitter},
    interaction::Operation,
    message::Status,
    security::Credential,
    session::Phase,
    td::ThingDescription,
};
use wot_binding_http::test_utils::FakeHttpClient;
use wot_binding_websocket::test_utils::{FakeSocket, FakeWsConnector};

type TestClient = ThingClient<FakeHttpClient, FakeCoapClient, FakeWsConnector>;

fn init_tracing() {
    static ONCE: OnceLock<()> = OnceLock::new();
    ONCE.get_or_init(|| {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .with_test_writer()
            .init();
    });
}

fn lamp() -> ThingDescription {
    ThingDescription::from_value(json!({
        "@context": ["https://www.w3.org/2019/wot/td/v1"],
        "id": "urn:dev:ops:32473-WoTLamp-1234",
        "title": "MyLampThing",
        "securityDefinitions": {
            "basic_sc": { "scheme": "basic", "in": "header" },
            "nosec_sc": { "scheme": "nosec" }
        },
        "security": ["basic_sc"],
        "properties": {
            "status": {
                "type": "string",
                "forms": [
                    { "href": "https://mylamp.example.com/status" },
                    { "href": "ws://mylamp.example.com/status" }
                ]
            },
            "temperature": {
                "type": "number",
                "uriVariables": { "unit": { "type": "string" } },
                "forms": [{ "href": "http://mylamp.example.com/temp{?unit}" }]
            },
            "level": {
                "type": "integer",
                "observable": true,
                "forms": [{
                    "href": "coap://[2001:db8::1]/level",
                    "security": "nosec_sc"
                }]
            }
        },
        "actions": {
            "toggle": {
                "input": { "type": "object" },
                "forms": [{ "href": "https://mylamp.example.com/toggle" }]
            }
        },
        "events": {
            "overheating": {
                "data": { "type": "string" },
                "forms": [
                    { "href": "https://mylamp.example.com/oh" },
                    { "href": "wss://mylamp.example.com/oh" }
                ]
            }
        }
    }))
    .expect("lamp TD is valid")
}

fn config() -> BindingConfig {
    BindingConfig {
        secrets: Secrets {
            username: Some("admin".into()),
            password: Some("hunter2".into()),
            token: None,
        },
        ..BindingConfig::default()
    }
}

fn client() -> (TestClient, FakeHttpClient, FakeCoapClient, FakeWsConnector) {
    init_tracing();
    let http = FakeHttpClient::new();
    let coap = FakeCoapClient::new();
    let ws = FakeWsConnector::new();
    let client = ThingClient::new(lamp(), config(), http.clone(), coap.clone(), ws.clone());
    (client, http, coap, ws)
}

#[tokio::test]
async fn read_property_over_https() -> TestResult {
    let (client, http, _, _) = client();
    http.push_ok(200, br#"{"value":true}"#.to_vec());

    let msg = client
        .call(Operation::ReadProperty, &AffordanceRef::property("status"), None)
        .await?
        .expect("message delivered");

    assert_eq!(msg.payload, Some(Payload::Json(json!({ "value": true }))));
    assert_eq!(msg.status, Some(Status::Http(200)));

    let sent = http.requests();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].method, "GET");
    assert_eq!(sent[0].url, "https://mylamp.example.com/status");
    assert!(matches!(
        sent[0].credential,
        Some(Credential::Basic { ref username, .. }) if username == "admin"
    ));
    Ok(())
}

#[tokio::test]
async fn invoke_action_posts_json() -> TestResult {
    let (client, http, _, _) = client();
    http.push_ok(200, b"{}".to_vec());

    let (sink, rx) = message_channel();
    let (done, waiter) = completion();
    let route = client
        .invoke(
            Operation::InvokeAction,
            &AffordanceRef::action("toggle"),
            Some(Payload::Json(json!({}))),
            ResultEmitter::new(sink, Some(done)),
        )
        .await?;

    assert_eq!(route, Route::Http);
    assert_eq!(waiter.await?, Outcome::Delivered);
    assert_eq!(rx.len(), 1);

    let sent = http.requests();
    assert_eq!(sent[0].method, "POST");
    assert_eq!(sent[0].header("content-type"), Some("application/json"));
    assert_eq!(sent[0].body.as_deref(), Some(&b"{}"[..]));
    Ok(())
}

#[tokio::test]
async fn one_shot_on_websocket_form_is_not_dispatched() -> TestResult {
    let (client, http, _, ws) = client();

    let (sink, rx) = message_channel();
    let (done, waiter) = completion();
    let route = client
        .invoke(
            Operation::ReadProperty,
            &AffordanceRef::property("status").with_form(1),
            None,
            ResultEmitter::new(sink, Some(done)),
        )
        .await?;

    assert_eq!(route, Route::Unsupported);
    assert_eq!(waiter.await?, Outcome::NotDispatched);
    assert!(rx.is_empty());
    assert!(http.requests().is_empty());
    assert!(ws.targets().is_empty());
    Ok(())
}

#[tokio::test]
async fn uri_variables_expand_into_href() -> TestResult {
    let (client, http, _, _) = client();
    http.push_ok(200, b"21.5".to_vec());

    let msg = client
        .call(
            Operation::ReadProperty,
            &AffordanceRef::property("temperature"),
            Some(Payload::Json(json!({ "unit": "celsius" }))),
        )
        .await?
        .expect("message delivered");

    assert_eq!(msg.payload, Some(Payload::Json(json!(21.5))));
    assert_eq!(
        http.requests()[0].url,
        "http://mylamp.example.com/temp?unit=celsius"
    );
    Ok(())
}

#[tokio::test]
async fn invalid_write_is_still_sent() -> TestResult {
    let (client, http, _, _) = client();
    http.push_ok(204, Vec::new());

    let msg = client
        .call(
            Operation::WriteProperty,
            &AffordanceRef::property("status"),
            Some(Payload::Json(json!(42))),
        )
        .await?
        .expect("message delivered");

    assert_eq!(msg.status, Some(Status::Http(204)));
    let sent = http.requests();
    assert_eq!(sent[0].method, "PUT");
    assert_eq!(sent[0].body.as_deref(), Some(&b"42"[..]));
    Ok(())
}

#[tokio::test]
async fn read_property_over_coap() -> TestResult {
    let (client, _, coap, _) = client();
    coap.push_response(Ok(CoapResponse {
        code: "2.05".into(),
        content_format: Some(ContentFormat::JSON),
        payload: b"7".to_vec(),
    }));

    let msg = client
        .call(Operation::ReadProperty, &AffordanceRef::property("level"), None)
        .await?
        .expect("message delivered");

    assert_eq!(msg.payload, Some(Payload::Json(json!(7))));
    let sent = coap.requests();
    assert_eq!(sent[0].options.hostname, "2001:db8::1");
    assert_eq!(sent[0].options.method, CoapMethod::Get);
    Ok(())
}

#[tokio::test]
async fn misuse_is_rejected_before_dispatch() {
    let (client, http, _, _) = client();

    assert!(matches!(
        client
            .call(Operation::InvokeAction, &AffordanceRef::property("status"), None)
            .await,
        Err(ClientError::OperationMismatch { .. })
    ));
    assert!(matches!(
        client
            .call(Operation::ReadProperty, &AffordanceRef::property("missing"), None)
            .await,
        Err(ClientError::Td(_))
    ));
    assert!(matches!(
        client
            .call(
                Operation::ReadProperty,
                &AffordanceRef::property("status").with_form(9),
                None
            )
            .await,
        Err(ClientError::Td(_))
    ));

    let (sink, _rx) = message_channel();
    assert!(matches!(
        client
            .subscribe(
                Operation::ReadProperty,
                &AffordanceRef::property("status"),
                None,
                sink
            )
            .await,
        Err(ClientError::NotSubscription(_))
    ));
    assert!(http.requests().is_empty());
}

#[tokio::test(start_paused = true)]
async fn event_over_http_falls_back_to_long_poll() -> TestResult {
    let (client, http, _, _) = client();
    http.always_err("ECONNRESET", "socket hang up");

    let (sink, rx) = message_channel();
    let id = client
        .subscribe(
            Operation::SubscribeEvent,
            &AffordanceRef::event("overheating"),
            None,
            sink,
        )
        .await?;

    let first = rx.recv().await?;
    assert_eq!(
        first.payload,
        Some(Payload::Text(
            "socket hang up: https://mylamp.example.com/oh".into()
        ))
    );
    assert_eq!(first.status, Some(Status::Transport("ECONNRESET".into())));
    let _second = rx.recv().await?;

    let times = http.request_times();
    assert_eq!(times[1] - times[0], Duration::from_secs(5));

    let status = client.status(id).await.expect("session is live");
    assert_eq!(
        status.borrow().as_ref().map(|s| s.text.clone()),
        Some("Polling error".to_string())
    );

    client.unsubscribe(id).await?;
    assert!(client.status(id).await.is_none());
    assert!(status.borrow().is_none());

    let polls = http.requests().len();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(http.requests().len(), polls);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn event_over_websocket_reconnects() -> TestResult {
    let (client, _, _, ws) = client();
    ws.accept(FakeSocket::closing(vec![br#""hot""#.to_vec()]));
    ws.accept(FakeSocket::open(vec![br#""hotter""#.to_vec()]));

    let (sink, rx) = message_channel();
    let id = client
        .subscribe(
            Operation::SubscribeEvent,
            &AffordanceRef::event("overheating").with_form(1),
            None,
            sink,
        )
        .await?;

    assert_eq!(rx.recv().await?.payload, Some(Payload::Json(json!("hot"))));
    assert_eq!(rx.recv().await?.payload, Some(Payload::Json(json!("hotter"))));

    let times = ws.connect_times();
    assert_eq!(times.len(), 2);
    assert_eq!(times[1] - times[0], Duration::from_secs(5));
    assert_eq!(ws.max_open(), 1);
    assert!(matches!(
        ws.targets()[0].credential,
        Some(Credential::Basic { .. })
    ));

    client.unsubscribe(id).await?;
    assert_eq!(ws.open_count(), 0);
    Ok(())
}

#[tokio::test]
async fn observe_over_coap_emits_each_notification() -> TestResult {
    let (client, _, coap, _) = client();
    let notification = |format, payload: &[u8]| CoapResponse {
        code: "2.05".into(),
        content_format: Some(format),
        payload: payload.to_vec(),
    };
    let observation = coap.push_open_observation(vec![
        Ok(notification(ContentFormat::JSON, b"1")),
        Ok(notification(ContentFormat::JSON, b"2")),
        Ok(notification(ContentFormat::OCTET_STREAM, &[3])),
    ]);

    let (sink, rx) = message_channel();
    let id = client
        .subscribe(
            Operation::ObserveProperty,
            &AffordanceRef::property("level"),
            None,
            sink,
        )
        .await?;

    assert_eq!(rx.recv().await?.payload, Some(Payload::Json(json!(1))));
    assert_eq!(rx.recv().await?.payload, Some(Payload::Json(json!(2))));
    assert_eq!(rx.recv().await?.payload, Some(Payload::Raw(vec![3])));

    let status = client.status(id).await.expect("session is live");
    assert_eq!(
        status.borrow().as_ref().map(|s| s.phase),
        Some(Phase::Connected)
    );

    client.close().await;
    assert!(observation.is_closed());
    assert_eq!(coap.observe_count(), 1);
    assert!(client.status(id).await.is_none());
    Ok(())
}
