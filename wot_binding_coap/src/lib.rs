//! # WoT CoAP Bindings
//!
//! One-shot CoAP requests and CoAP Observe subscriptions for forms whose
//! href uses the `coap` or `coaps` scheme.
//!
//! The wire protocol lives behind the [`CoapClient`](client::CoapClient)
//! trait; this crate decides what to send and how to turn responses and
//! notifications into [`Message`](wot_binding_core::message::Message)s.
//! Observations are never re-established: when the server ends one, the
//! session is over.

pub mod binding;
pub mod client;
pub mod error;
pub mod options;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

/// Default port for `coap://`.
pub const COAP_PORT: u16 = 5683;

/// Default port for `coaps://`.
pub const COAPS_PORT: u16 = 5684;
