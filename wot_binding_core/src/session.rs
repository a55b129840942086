//! Shutdown control and status reporting for long-lived sessions.
//!
//! A session task holds a [`SessionControl`] and checks it before every
//! reconnection. Shutdown flips the state and cancels the pending reconnect
//! timer in one step, so a close event racing with shutdown can never arm
//! another attempt.

use core::{fmt, time::Duration};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Running; reconnection is allowed.
    Active,
    /// Shutdown requested; no further connection attempts.
    ShuttingDown,
}

/// Shared handle controlling one session's lifetime.
#[derive(Debug, Clone, Default)]
pub struct SessionControl {
    token: CancellationToken,
}

impl SessionControl {
    /// A fresh, active control.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.token.is_cancelled() {
            SessionState::ShuttingDown
        } else {
            SessionState::Active
        }
    }

    /// Whether reconnection is still allowed.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state() == SessionState::Active
    }

    /// Disable reconnection and cancel any pending timer.
    pub fn begin_shutdown(&self) {
        self.token.cancel();
    }

    /// Resolves once shutdown has been requested.
    pub async fn shutdown_requested(&self) {
        self.token.cancelled().await;
    }

    /// Sleep for `delay` unless shutdown is requested first.
    ///
    /// Returns `true` if the full delay elapsed while still active.
    pub async fn wait(&self, delay: Duration) -> bool {
        tokio::select! {
            () = self.token.cancelled() => false,
            () = tokio::time::sleep(delay) => self.is_active(),
        }
    }
}

/// Connection phase shown to observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Opening the transport.
    Connecting,
    /// Transport open and receiving.
    Connected,
    /// The last attempt failed.
    Error,
    /// Waiting to reconnect.
    Reconnecting,
}

/// A phase plus human-readable text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    /// Machine-readable phase.
    pub phase: Phase,
    /// Display text, e.g. `WS Reconnecting...`.
    pub text: String,
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Observer side of a session's status. `None` means cleared.
pub type StatusReceiver = watch::Receiver<Option<SessionStatus>>;

/// Publishes status changes for one session.
#[derive(Debug)]
pub struct StatusReporter {
    tx: watch::Sender<Option<SessionStatus>>,
}

impl StatusReporter {
    /// Create a reporter and its first receiver.
    #[must_use]
    pub fn new() -> (Self, StatusReceiver) {
        let (tx, rx) = watch::channel(None);
        (Self { tx }, rx)
    }

    /// Publish a new status.
    pub fn set(&self, phase: Phase, text: impl Into<String>) {
        self.tx.send_replace(Some(SessionStatus {
            phase,
            text: text.into(),
        }));
    }

    /// Clear the status.
    pub fn clear(&self) {
        self.tx.send_replace(None);
    }

    /// Another receiver for the same status.
    #[must_use]
    pub fn subscribe(&self) -> StatusReceiver {
        self.tx.subscribe()
    }
}
