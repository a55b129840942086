//! In-memory [`CoapClient`] for tests.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use futures::{future::BoxFuture, FutureExt};

use crate::{
    client::{CoapClient, CoapRequest, CoapResponse, ObserveStream},
    error::ScriptedCoapError,
};

type Scripted = Result<CoapResponse, ScriptedCoapError>;

#[derive(Debug)]
enum ScriptedObservation {
    Stream {
        notifications: VecDeque<Scripted>,
        stay_open: bool,
        closed: Arc<AtomicBool>,
    },
    Failed(ScriptedCoapError),
}

#[derive(Debug, Default)]
struct State {
    responses: VecDeque<Scripted>,
    observations: VecDeque<ScriptedObservation>,
    requests: Vec<CoapRequest>,
    observe_count: usize,
}

/// A scripted CoAP client that records every request.
///
/// Unscripted requests and observations never complete.
#[derive(Debug, Clone, Default)]
pub struct FakeCoapClient {
    state: Arc<Mutex<State>>,
}

/// Test-side view of one scripted observation.
#[derive(Debug, Clone)]
pub struct ObservationHandle {
    closed: Arc<AtomicBool>,
}

impl ObservationHandle {
    /// Whether the binding closed the stream.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

fn scripted(item: Result<CoapResponse, &str>) -> Scripted {
    item.map_err(|e| ScriptedCoapError(e.to_string()))
}

impl FakeCoapClient {
    /// A client with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Queue the outcome of the next one-shot request.
    pub fn push_response(&self, response: Result<CoapResponse, &str>) {
        self.lock().responses.push_back(scripted(response));
    }

    /// Queue an observation that ends after delivering `notifications`.
    pub fn push_observation(
        &self,
        notifications: Vec<Result<CoapResponse, &str>>,
    ) -> ObservationHandle {
        self.push_stream(notifications, false)
    }

    /// Queue an observation that stays open after delivering `notifications`.
    pub fn push_open_observation(
        &self,
        notifications: Vec<Result<CoapResponse, &str>>,
    ) -> ObservationHandle {
        self.push_stream(notifications, true)
    }

    /// Queue an observation whose registration fails.
    pub fn push_failed_observation(&self, error: &str) {
        self.lock()
            .observations
            .push_back(ScriptedObservation::Failed(ScriptedCoapError(
                error.to_string(),
            )));
    }

    fn push_stream(
        &self,
        notifications: Vec<Result<CoapResponse, &str>>,
        stay_open: bool,
    ) -> ObservationHandle {
        let closed = Arc::new(AtomicBool::new(false));
        self.lock()
            .observations
            .push_back(ScriptedObservation::Stream {
                notifications: notifications.into_iter().map(scripted).collect(),
                stay_open,
                closed: closed.clone(),
            });
        ObservationHandle { closed }
    }

    /// Requests seen so far, one-shot and observe alike.
    #[must_use]
    pub fn requests(&self) -> Vec<CoapRequest> {
        self.lock().requests.clone()
    }

    /// Number of observe registrations attempted.
    #[must_use]
    pub fn observe_count(&self) -> usize {
        self.lock().observe_count
    }
}

impl CoapClient for FakeCoapClient {
    type Error = ScriptedCoapError;
    type Observation = FakeObservation;

    fn request(&self, request: CoapRequest) -> BoxFuture<'_, Result<CoapResponse, Self::Error>> {
        let next = {
            let mut state = self.lock();
            state.requests.push(request);
            state.responses.pop_front()
        };

        async move {
            match next {
                Some(result) => result,
                None => futures::future::pending().await,
            }
        }
        .boxed()
    }

    fn observe(
        &self,
        request: CoapRequest,
    ) -> BoxFuture<'_, Result<Self::Observation, Self::Error>> {
        let next = {
            let mut state = self.lock();
            state.requests.push(request);
            state.observe_count += 1;
            state.observations.pop_front()
        };

        async move {
            match next {
                Some(ScriptedObservation::Stream {
                    notifications,
                    stay_open,
                    closed,
                }) => Ok(FakeObservation {
                    notifications,
                    stay_open,
                    closed,
                }),
                Some(ScriptedObservation::Failed(e)) => Err(e),
                None => futures::future::pending().await,
            }
        }
        .boxed()
    }
}

/// Observation handed out by [`FakeCoapClient`].
#[derive(Debug)]
pub struct FakeObservation {
    notifications: VecDeque<Scripted>,
    stay_open: bool,
    closed: Arc<AtomicBool>,
}

impl ObserveStream for FakeObservation {
    type Error = ScriptedCoapError;

    fn next_notification(
        &mut self,
    ) -> BoxFuture<'_, Option<Result<CoapResponse, Self::Error>>> {
        let next = self.notifications.pop_front();
        let stay_open = self.stay_open;
        async move {
            match next {
                Some(item) => Some(item),
                None if stay_open => futures::future::pending().await,
                None => None,
            }
        }
        .boxed()
    }

    fn close(self) -> BoxFuture<'static, ()> {
        self.closed.store(true, Ordering::SeqCst);
        async {}.boxed()
    }
}
