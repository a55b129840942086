//! In-memory [`HttpClient`] for tests.

#![allow(clippy::missing_panics_doc)]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
};

use futures::{future::BoxFuture, FutureExt};
use tokio::time::Instant;

use crate::{
    error::ScriptedError,
    http_client::{HttpClient, HttpRequest, HttpResponse},
};

#[derive(Debug, Clone)]
enum Scripted {
    Ok { status: u16, body: Vec<u8> },
    Err { code: &'static str, message: String },
}

#[derive(Debug, Default)]
struct State {
    queue: VecDeque<Scripted>,
    fallback: Option<Scripted>,
    requests: Vec<(Instant, HttpRequest)>,
}

/// A scripted HTTP client that records every request.
///
/// Responses are taken from a queue; once it is empty the fallback (if
/// any) is repeated, otherwise the request never completes.
#[derive(Debug, Clone, Default)]
pub struct FakeHttpClient {
    state: Arc<Mutex<State>>,
}

impl FakeHttpClient {
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

    /// Queue a successful response.
    pub fn push_ok(&self, status: u16, body: Vec<u8>) {
        self.lock().queue.push_back(Scripted::Ok { status, body });
    }

    /// Queue a transport failure.
    pub fn push_err(&self, code: &'static str, message: &str) {
        self.lock().queue.push_back(Scripted::Err {
            code,
            message: message.to_string(),
        });
    }

    /// Answer every unscripted request with this response.
    pub fn always_ok(&self, status: u16, body: Vec<u8>) {
        self.lock().fallback = Some(Scripted::Ok { status, body });
    }

    /// Fail every unscripted request.
    pub fn always_err(&self, code: &'static str, message: &str) {
        self.lock().fallback = Some(Scripted::Err {
            code,
            message: message.to_string(),
        });
    }

    /// Requests seen so far, in order.
    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().requests.iter().map(|(_, r)| r.clone()).collect()
    }

    /// When each request was issued.
    #[must_use]
    pub fn request_times(&self) -> Vec<Instant> {
        self.lock().requests.iter().map(|(at, _)| *at).collect()
    }
}

impl HttpClient for FakeHttpClient {
    type Error = ScriptedError;

    fn execute(&self, request: HttpRequest) -> BoxFuture<'_, Result<HttpResponse, Self::Error>> {
        let url = request.url.clone();
        let next = {
            let mut state = self.lock();
            state.requests.push((Instant::now(), request));
            state.queue.pop_front().or_else(|| state.fallback.clone())
        };

        async move {
            match next {
                Some(Scripted::Ok { status, body }) => Ok(HttpResponse {
                    status,
                    headers: vec![("content-length".into(), body.len().to_string())],
                    body,
                    url,
                }),
                Some(Scripted::Err { code, message }) => Err(ScriptedError { code, message }),
                None => futures::future::pending().await,
            }
        }
        .boxed()
    }
}
