//! # WoT WebSocket Binding
//!
//! Subscriptions over `ws`/`wss` forms. A session owns at most one socket
//! at a time: when it closes, the session waits a fixed delay and opens a
//! new one, until it is shut down.

pub mod binding;
pub mod connection;
pub mod error;

#[cfg(feature = "tokio_client")]
pub mod tokio;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
