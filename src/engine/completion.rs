//! Single-assignment completion handles.
//!
//! Every submitted command carries a `Completion` through the pipeline; the
//! caller keeps the matching `Pending` future. A `Completion` that is dropped
//! without being resolved (because its task was cancelled or its queue was
//! flushed) resolves the caller with `AxiError::Flushed`, so no caller can be
//! left waiting after a reset.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::common::{AxiError, AxiResult};

/// Producer side of a completion, owned by the pipeline.
pub(crate) struct Completion<T> {
    tx: Option<oneshot::Sender<AxiResult<T>>>,
}

impl<T> Completion<T> {
    pub(crate) fn new() -> (Self, Pending<T>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Some(tx) }, Pending { rx })
    }

    /// Resolves the caller. Consumes the handle so it cannot fire twice.
    pub(crate) fn complete(mut self, result: AxiResult<T>) {
        if let Some(tx) = self.tx.take() {
            // The caller may have dropped its handle.
            let _ = tx.send(result);
        }
    }
}

impl<T> Drop for Completion<T> {
    fn drop(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(Err(AxiError::Flushed));
        }
    }
}

/// Caller side of a submitted operation.
///
/// Resolves to the operation's response, to `AxiError::Flushed` if a reset
/// discarded it, or to the error that terminated it.
#[must_use = "a pending operation does nothing unless awaited"]
#[derive(Debug)]
pub struct Pending<T> {
    rx: oneshot::Receiver<AxiResult<T>>,
}

impl<T> Future for Pending<T> {
    type Output = AxiResult<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.get_mut().rx)
            .poll(cx)
            .map(|r| r.unwrap_or(Err(AxiError::Flushed)))
    }
}
