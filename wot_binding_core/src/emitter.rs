//! Delivering [`Message`]s to the caller.
//!
//! Two halves mirror the host contract:
//!
//! - [`MessageSink`]: the emission side, used for one-shot results and for
//!   every event of a subscription.
//! - [`Completion`]: the single-fire completion signal of a one-shot
//!   interaction. It is consumed when fired, so it cannot fire twice, and a
//!   dropped `Completion` is seen by its [`CompletionWaiter`] as cancelled
//!   rather than left hanging.
//!
//! [`ResultEmitter`] bundles both for one-shot interactions.

use core::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
};

use futures::channel::oneshot;

use crate::message::Message;

/// Receiving end of a [`MessageSink`].
pub type MessageReceiver = async_channel::Receiver<Message>;

/// Create a connected sink / receiver pair.
#[must_use]
pub fn message_channel() -> (MessageSink, MessageReceiver) {
    let (tx, rx) = async_channel::unbounded();
    (MessageSink { tx }, rx)
}

/// Where emitted messages go.
#[derive(Debug, Clone)]
pub struct MessageSink {
    tx: async_channel::Sender<Message>,
}

impl MessageSink {
    /// Emit a message. Returns `false` if the receiver is gone.
    pub fn emit(&self, message: Message) -> bool {
        match self.tx.try_send(message) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!("message receiver closed, dropping message: {e}");
                false
            }
        }
    }

    /// Whether the receiving side has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// How a one-shot interaction ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A binding ran and emitted exactly one message.
    Delivered,
    /// No binding handles the form's scheme; nothing was emitted.
    NotDispatched,
}

/// Create a connected completion pair.
#[must_use]
pub fn completion() -> (Completion, CompletionWaiter) {
    let (tx, rx) = oneshot::channel();
    (Completion { tx }, CompletionWaiter { rx })
}

/// Single-fire completion signal.
#[derive(Debug)]
pub struct Completion {
    tx: oneshot::Sender<Outcome>,
}

impl Completion {
    /// Fire the signal.
    pub fn complete(self, outcome: Outcome) {
        if self.tx.send(outcome).is_err() {
            tracing::trace!("completion waiter dropped before {outcome:?}");
        }
    }
}

/// Resolves once the matching [`Completion`] fires or is dropped.
#[derive(Debug)]
pub struct CompletionWaiter {
    rx: oneshot::Receiver<Outcome>,
}

impl Future for CompletionWaiter {
    type Output = Result<Outcome, oneshot::Canceled>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx)
    }
}

/// Packages the result of a one-shot interaction.
#[derive(Debug)]
pub struct ResultEmitter {
    sink: MessageSink,
    completion: Option<Completion>,
}

impl ResultEmitter {
    /// Emit into `sink`, optionally signalling `completion` afterwards.
    #[must_use]
    pub const fn new(sink: MessageSink, completion: Option<Completion>) -> Self {
        Self { sink, completion }
    }

    /// Emit the single result message, then signal completion.
    pub fn deliver(self, message: Message) {
        self.sink.emit(message);
        if let Some(completion) = self.completion {
            completion.complete(Outcome::Delivered);
        }
    }

    /// Emit nothing, but still signal completion.
    pub fn not_dispatched(self) {
        if let Some(completion) = self.completion {
            completion.complete(Outcome::NotDispatched);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Payload;
    use testresult::TestResult;

    #[tokio::test]
    async fn deliver_emits_once_then_completes() -> TestResult {
        let (sink, rx) = message_channel();
        let (done, waiter) = completion();

        ResultEmitter::new(sink, Some(done)).deliver(Message::with_payload(Payload::Text("x".into())));

        assert_eq!(waiter.await?, Outcome::Delivered);
        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
        Ok(())
    }

    #[tokio::test]
    async fn not_dispatched_emits_nothing() -> TestResult {
        let (sink, rx) = message_channel();
        let (done, waiter) = completion();

        ResultEmitter::new(sink, Some(done)).not_dispatched();

        assert_eq!(waiter.await?, Outcome::NotDispatched);
        assert!(rx.try_recv().is_err());
        Ok(())
    }

    #[tokio::test]
    async fn dropped_completion_is_observed_as_cancelled() {
        let (done, waiter) = completion();
        drop(done);
        assert!(waiter.await.is_err());
    }

    #[test]
    fn emit_reports_closed_receiver() {
        let (sink, rx) = message_channel();
        drop(rx);
        assert!(sink.is_closed());
        assert!(!sink.emit(Message::default()));
    }
}
