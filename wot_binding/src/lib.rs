//! # WoT Protocol Bindings
//!
//! Invoke the interaction affordances of a Web of Things Thing Description
//! without knowing which protocol the device speaks.
//!
//! A [`ThingClient`] owns a Thing Description and one binding per
//! transport. One-shot operations (read, write, invoke) go over HTTP or
//! CoAP and deliver exactly one [`Message`]; observations and event
//! subscriptions run as long-lived sessions over WebSocket, CoAP Observe or
//! HTTP long-poll until unsubscribed.
//!
//! ```no_run
//! use wot_binding::{AffordanceRef, ThingClient};
//! use wot_binding_core::{config::BindingConfig, interaction::Operation, td::ThingDescription};
//! # async fn demo<C: wot_binding_coap::client::CoapClient>(td_json: &str, coap: C) -> Result<(), Box<dyn std::error::Error>> {
//! let config = BindingConfig::default().with_env_proxy();
//! let http = wot_binding_http::reqwest_client::ReqwestHttpClient::new(&config)?;
//! let ws = wot_binding_websocket::tokio::TokioWsConnector::new(config.proxy.clone());
//! let client = ThingClient::new(ThingDescription::from_json(td_json)?, config, http, coap, ws);
//!
//! if let Some(msg) = client
//!     .call(Operation::ReadProperty, &AffordanceRef::property("status"), None)
//!     .await?
//! {
//!     println!("{:?}", msg.payload);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`Message`]: wot_binding_core::message::Message

pub mod client;
pub mod error;
pub mod router;
pub mod session_manager;

pub use client::{AffordanceRef, ThingClient};
pub use router::Route;
pub use session_manager::{SessionId, SessionManager, Spawn, TokioSpawn};
