//! # WoT Binding Core
//!
//! Transport-agnostic building blocks shared by every protocol binding:
//!
//! - [`td`]: the validated, normalised Thing Description model
//! - [`codec`]: content-type driven payload decoding and encoding
//! - [`schema`]: advisory JSON Schema validation
//! - [`security`]: mapping a form's security scheme to a [`Credential`](security::Credential)
//! - [`uri_template`]: RFC 6570 expansion of templated form targets
//! - [`message`] and [`emitter`]: the normalised result and how it reaches the caller
//! - [`session`]: shutdown control and status reporting for long-lived sessions
//! - [`config`]: the explicit configuration value passed at construction

pub mod codec;
pub mod config;
pub mod emitter;
pub mod error;
pub mod interaction;
pub mod message;
pub mod schema;
pub mod security;
pub mod session;
pub mod td;
pub mod uri_template;

/// Default delay between reconnection (or re-poll) attempts.
pub const DEFAULT_RECONNECT_DELAY: core::time::Duration = core::time::Duration::from_secs(5);
