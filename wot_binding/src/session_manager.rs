//! Task-per-session manager for observations and event subscriptions.
//!
//! Each session runs as its own spawned task that owns its transport
//! handle. Shutdown proceeds in a fixed order:
//!
//! 1. the session's state flips to shutting down and its pending reconnect
//!    timer is cancelled (one [`SessionControl::begin_shutdown`] call),
//! 2. the task notices, closes its transport handle and returns,
//! 3. if it has not returned within the grace period, it is aborted.

use core::{
    fmt,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use std::collections::BTreeMap;

use async_lock::Mutex;
use futures::{
    channel::oneshot,
    future::{AbortHandle, Abortable, BoxFuture},
    FutureExt,
};
use wot_binding_core::session::{SessionControl, StatusReceiver};

use crate::{error::SessionError, router::Route};

/// How long a session may take to close its transport before it is aborted.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Trait for spawning session tasks.
///
/// Implement this for your runtime.
pub trait Spawn {
    /// Spawn a future as a background task.
    ///
    /// The returned [`AbortHandle`] cancels the task.
    fn spawn(&self, fut: BoxFuture<'static, ()>) -> AbortHandle;
}

/// Spawns onto the ambient Tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSpawn;

impl Spawn for TokioSpawn {
    fn spawn(&self, fut: BoxFuture<'static, ()>) -> AbortHandle {
        let (handle, reg) = AbortHandle::new_pair();
        tokio::spawn(Abortable::new(fut, reg));
        handle
    }
}

/// Identifies one session within a [`SessionManager`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// A running subscription.
#[derive(Debug)]
pub struct ObserveSession {
    id: SessionId,
    route: Route,
    control: SessionControl,
    status: StatusReceiver,
    abort: AbortHandle,
    done: oneshot::Receiver<()>,
}

impl ObserveSession {
    /// This session's id.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// The transport it runs over.
    #[must_use]
    pub const fn route(&self) -> Route {
        self.route
    }

    /// A receiver for its status.
    #[must_use]
    pub fn status(&self) -> StatusReceiver {
        self.status.clone()
    }

    /// Stop the session. Consumes it, so this happens exactly once.
    pub async fn shutdown(self, grace: Duration) {
        self.control.begin_shutdown();

        match tokio::time::timeout(grace, self.done).await {
            Ok(_) => tracing::debug!("{} ({}) closed", self.id, self.route),
            Err(_) => {
                tracing::warn!(
                    "{} ({}) did not close within {grace:?}, aborting",
                    self.id,
                    self.route
                );
                self.abort.abort();
            }
        }
    }
}

/// Owns every live session.
#[derive(Debug)]
pub struct SessionManager<S: Spawn> {
    spawner: S,
    grace: Duration,
    next_id: AtomicU64,
    sessions: Mutex<BTreeMap<SessionId, ObserveSession>>,
}

impl<S: Spawn> SessionManager<S> {
    /// A manager that spawns through `spawner`.
    pub fn new(spawner: S) -> Self {
        Self::with_grace(spawner, DEFAULT_SHUTDOWN_GRACE)
    }

    /// A manager with a custom shutdown grace period.
    pub fn with_grace(spawner: S, grace: Duration) -> Self {
        Self {
            spawner,
            grace,
            next_id: AtomicU64::new(0),
            sessions: Mutex::new(BTreeMap::new()),
        }
    }

    /// Spawn `task` as a new session.
    ///
    /// `control` must be the control the task watches, and `status` a
    /// receiver of the reporter it publishes to.
    pub async fn open(
        &self,
        route: Route,
        task: BoxFuture<'static, ()>,
        control: SessionControl,
        status: StatusReceiver,
    ) -> SessionId {
        let id = SessionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (done_tx, done) = oneshot::channel();

        let abort = self.spawner.spawn(
            task.map(move |()| {
                let _ = done_tx.send(());
            })
            .boxed(),
        );
        tracing::debug!("{id} opened ({route})");

        let session = ObserveSession {
            id,
            route,
            control,
            status,
            abort,
            done,
        };
        self.sessions.lock().await.insert(id, session);
        id
    }

    /// Status receiver of a live session.
    pub async fn status(&self, id: SessionId) -> Option<StatusReceiver> {
        self.sessions.lock().await.get(&id).map(ObserveSession::status)
    }

    /// Transport of a live session.
    pub async fn route(&self, id: SessionId) -> Option<Route> {
        self.sessions.lock().await.get(&id).map(ObserveSession::route)
    }

    /// Number of live sessions.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }

    /// Whether no sessions are live.
    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.is_empty()
    }

    /// Shut one session down.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Unknown`] if no such session is live, which
    /// includes one that was already shut down.
    pub async fn shutdown(&self, id: SessionId) -> Result<(), SessionError> {
        let session = self
            .sessions
            .lock()
            .await
            .remove(&id)
            .ok_or(SessionError::Unknown(id))?;
        session.shutdown(self.grace).await;
        Ok(())
    }

    /// Shut every session down.
    pub async fn shutdown_all(&self) {
        let sessions = core::mem::take(&mut *self.sessions.lock().await);
        futures::future::join_all(
            sessions
                .into_values()
                .map(|session| session.shutdown(self.grace)),
        )
        .await;
    }
}

impl<S: Spawn> Drop for SessionManager<S> {
    fn drop(&mut self) {
        for session in self.sessions.get_mut().values() {
            session.control.begin_shutdown();
        }
    }
}
