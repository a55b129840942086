//! Security schemes and per-invocation credentials.
//!
//! A form references exactly one scheme; combinations are never attempted.

use core::fmt;

use crate::{config::Secrets, td::Form, td::ThingDescription};

/// A declared security scheme.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityScheme {
    /// `nosec`.
    NoSec,
    /// HTTP Basic, credentials sent with the first request.
    Basic,
    /// HTTP Digest, credentials sent only after a challenge.
    Digest,
    /// Bearer token.
    Bearer,
    /// Any scheme this engine does not speak.
    Other(String),
}

impl SecurityScheme {
    /// Map a TD `scheme` value.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        match name {
            "nosec" => Self::NoSec,
            "basic" => Self::Basic,
            "digest" => Self::Digest,
            "bearer" => Self::Bearer,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Credentials for a single invocation or session.
#[derive(Clone, PartialEq, Eq)]
pub enum Credential {
    /// Username and password, sent proactively.
    Basic {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// Username and password, withheld until challenged.
    Digest {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// Bearer token.
    Bearer {
        /// Token.
        token: String,
    },
}

impl Credential {
    /// Whether the credential goes out with the first request.
    #[must_use]
    pub const fn sends_immediately(&self) -> bool {
        !matches!(self, Self::Digest { .. })
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::Digest { username, .. } => f
                .debug_struct("Digest")
                .field("username", username)
                .finish_non_exhaustive(),
            Self::Bearer { .. } => f.debug_struct("Bearer").finish_non_exhaustive(),
        }
    }
}

/// Build the credential for the scheme a form declares.
///
/// Returns `None` when the form declares no scheme, `nosec`, or a scheme
/// outside basic/digest/bearer. Missing secrets become empty strings.
#[must_use]
pub fn build_credential(td: &ThingDescription, form: &Form, secrets: &Secrets) -> Option<Credential> {
    let scheme = td.security_scheme(form)?;
    let username = || secrets.username.clone().unwrap_or_default();
    let password = || secrets.password.clone().unwrap_or_default();

    match scheme {
        SecurityScheme::Basic => Some(Credential::Basic {
            username: username(),
            password: password(),
        }),
        SecurityScheme::Digest => Some(Credential::Digest {
            username: username(),
            password: password(),
        }),
        SecurityScheme::Bearer => Some(Credential::Bearer {
            token: secrets.token.clone().unwrap_or_default(),
        }),
        SecurityScheme::NoSec => None,
        SecurityScheme::Other(name) => {
            tracing::debug!("security scheme '{name}' is not supported, sending no credentials");
            None
        }
    }
}
