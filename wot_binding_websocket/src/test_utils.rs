//! In-memory [`WsConnector`] for tests.

use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex, MutexGuard,
    },
};

use futures::{future::BoxFuture, FutureExt};
use tokio::time::Instant;

use crate::{
    connection::{Frame, WsConnection, WsConnector, WsTarget},
    error::WebSocketError,
};

/// Script for one accepted socket.
#[derive(Debug, Clone)]
pub struct FakeSocket {
    frames: VecDeque<Vec<u8>>,
    then_close: bool,
}

impl FakeSocket {
    /// Delivers `frames`, then stays open.
    #[must_use]
    pub fn open(frames: Vec<Vec<u8>>) -> Self {
        Self {
            frames: frames.into(),
            then_close: false,
        }
    }

    /// Delivers `frames`, then the peer closes.
    #[must_use]
    pub fn closing(frames: Vec<Vec<u8>>) -> Self {
        Self {
            frames: frames.into(),
            then_close: true,
        }
    }
}

#[derive(Debug)]
enum Scripted {
    Accept(FakeSocket),
    Refuse(String),
}

#[derive(Debug, Default)]
struct State {
    script: VecDeque<Scripted>,
    attempts: Vec<(Instant, WsTarget)>,
}

/// A scripted connector that records every attempt and tracks open sockets.
///
/// Unscripted attempts never complete.
#[derive(Debug, Clone, Default)]
pub struct FakeWsConnector {
    state: Arc<Mutex<State>>,
    open: Arc<AtomicUsize>,
    max_open: Arc<AtomicUsize>,
}

impl FakeWsConnector {
    /// A connector with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Accept the next attempt with this socket.
    pub fn accept(&self, socket: FakeSocket) {
        self.lock().script.push_back(Scripted::Accept(socket));
    }

    /// Fail the next attempt.
    pub fn refuse(&self, reason: &str) {
        self.lock()
            .script
            .push_back(Scripted::Refuse(reason.to_string()));
    }

    /// When each attempt was made.
    #[must_use]
    pub fn connect_times(&self) -> Vec<Instant> {
        self.lock().attempts.iter().map(|(at, _)| *at).collect()
    }

    /// Every target asked for.
    #[must_use]
    pub fn targets(&self) -> Vec<WsTarget> {
        self.lock().attempts.iter().map(|(_, t)| t.clone()).collect()
    }

    /// Sockets currently open.
    #[must_use]
    pub fn open_count(&self) -> usize {
        self.open.load(Ordering::SeqCst)
    }

    /// Most sockets ever open at once.
    #[must_use]
    pub fn max_open(&self) -> usize {
        self.max_open.load(Ordering::SeqCst)
    }
}

impl WsConnector for FakeWsConnector {
    fn connect(
        &self,
        target: WsTarget,
    ) -> BoxFuture<'_, Result<Box<dyn WsConnection>, WebSocketError>> {
        let next = {
            let mut state = self.lock();
            state.attempts.push((Instant::now(), target));
            state.script.pop_front()
        };

        async move {
            match next {
                Some(Scripted::Accept(socket)) => {
                    let now_open = self.open.fetch_add(1, Ordering::SeqCst) + 1;
                    self.max_open.fetch_max(now_open, Ordering::SeqCst);
                    let conn: Box<dyn WsConnection> = Box::new(FakeConnection {
                        socket,
                        open: self.open.clone(),
                    });
                    Ok(conn)
                }
                Some(Scripted::Refuse(reason)) => Err(WebSocketError::Io(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    reason,
                ))),
                None => futures::future::pending().await,
            }
        }
        .boxed()
    }
}

struct FakeConnection {
    socket: FakeSocket,
    open: Arc<AtomicUsize>,
}

impl WsConnection for FakeConnection {
    fn next_frame(&mut self) -> BoxFuture<'_, Result<Frame, WebSocketError>> {
        let next = self.socket.frames.pop_front();
        let then_close = self.socket.then_close;
        async move {
            match next {
                Some(data) => Ok(Frame::Data(data)),
                None if then_close => Ok(Frame::Close {
                    code: Some(1000),
                    reason: String::new(),
                }),
                None => futures::future::pending().await,
            }
        }
        .boxed()
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, ()> {
        self.open.fetch_sub(1, Ordering::SeqCst);
        async {}.boxed()
    }
}
