//! # WoT HTTP Bindings
//!
//! One-shot HTTP interactions ([`binding::HttpBinding`]) and the long-poll
//! loop used as the universal fallback for observations and event
//! subscriptions ([`longpoll::LongPollBinding`]).
//!
//! Both run over the minimal [`HttpClient`](http_client::HttpClient) trait so
//! the transport can be swapped; [`ReqwestHttpClient`](reqwest_client::ReqwestHttpClient)
//! is the default implementation.
//!
//! # Trust
//!
//! The reqwest client skips TLS certificate verification unless configured
//! otherwise, because devices commonly serve self-signed certificates. This
//! trades server authentication for reachability; set
//! `BindingConfig::accept_invalid_certs` to `false` where devices carry
//! verifiable certificates.

pub mod binding;
pub mod error;
pub mod http_client;
pub mod longpoll;

#[cfg(feature = "reqwest")]
pub mod reqwest_client;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
