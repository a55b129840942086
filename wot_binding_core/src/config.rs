//! Binding configuration.
//!
//! Everything a binding needs from its host is passed in a [`BindingConfig`]
//! at construction; nothing is read from ambient global state afterwards.

use core::{fmt, time::Duration};

use serde::Deserialize;

use crate::DEFAULT_RECONNECT_DELAY;

/// Stored secrets used to build credentials.
#[derive(Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Secrets {
    /// Username for basic/digest.
    pub username: Option<String>,
    /// Password for basic/digest.
    pub password: Option<String>,
    /// Token for bearer.
    pub token: Option<String>,
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Configuration shared by every binding of one Thing client.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BindingConfig {
    /// Credentials source.
    pub secrets: Secrets,

    /// Fixed delay before reconnecting a WebSocket or re-issuing a long-poll.
    #[serde(with = "millis")]
    pub reconnect_delay: Duration,

    /// Overall timeout for one-shot requests. `None` waits indefinitely.
    #[serde(with = "opt_millis")]
    pub request_timeout: Option<Duration>,

    /// Skip TLS certificate verification for HTTP(S).
    ///
    /// Devices commonly present self-signed certificates, so this is on by
    /// default. Turning it off restores normal verification.
    pub accept_invalid_certs: bool,

    /// HTTP proxy used to tunnel WebSocket connections.
    pub proxy: Option<String>,
}

impl BindingConfig {
    /// Fill [`proxy`](Self::proxy) from `http_proxy` / `HTTP_PROXY` if unset.
    #[must_use]
    pub fn with_env_proxy(mut self) -> Self {
        if self.proxy.is_none() {
            self.proxy = std::env::var("http_proxy")
                .or_else(|_| std::env::var("HTTP_PROXY"))
                .ok()
                .filter(|p| !p.is_empty());
        }
        self
    }
}

impl Default for BindingConfig {
    fn default() -> Self {
        Self {
            secrets: Secrets::default(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            request_timeout: None,
            accept_invalid_certs: true,
            proxy: None,
        }
    }
}

mod millis {
    use core::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

mod opt_millis {
    use core::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(
        d: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(d).map(|ms| ms.map(Duration::from_millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use testresult::TestResult;

    #[test]
    fn defaults() {
        let config = BindingConfig::default();
        assert_eq!(config.reconnect_delay, Duration::from_secs(5));
        assert!(config.accept_invalid_certs);
        assert!(config.request_timeout.is_none());
    }

    #[test]
    fn deserializes_partial_documents() -> TestResult {
        let config: BindingConfig = serde_json::from_str(
            r#"{ "secrets": { "username": "u" }, "request_timeout": 2500 }"#,
        )?;
        assert_eq!(config.secrets.username.as_deref(), Some("u"));
        assert_eq!(config.request_timeout, Some(Duration::from_millis(2500)));
        assert_eq!(config.reconnect_delay, DEFAULT_RECONNECT_DELAY);
        Ok(())
    }

    #[test]
    fn explicit_proxy_wins_over_environment() {
        let config = BindingConfig {
            proxy: Some("http://proxy:3128".into()),
            ..BindingConfig::default()
        }
        .with_env_proxy();
        assert_eq!(config.proxy.as_deref(), Some("http://proxy:3128"));
    }

    #[test]
    fn secrets_debug_is_redacted() {
        let secrets = Secrets {
            username: Some("u".into()),
            password: Some("hunter2".into()),
            token: None,
        };
        assert!(!format!("{secrets:?}").contains("hunter2"));
    }
}
