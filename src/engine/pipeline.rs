//! Task lifecycle shared by the write and read engines.

use std::future::Future;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Handles of every task one engine has spawned.
#[derive(Default)]
pub(crate) struct TaskSet {
    handles: Vec<JoinHandle<()>>,
}

impl TaskSet {
    pub(crate) fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.handles.push(tokio::spawn(task));
    }

    /// Aborts every task and waits until each has been dropped.
    ///
    /// State owned by a task (queued descriptors, raw responses, the command
    /// it was issuing) is dropped with it.
    pub(crate) async fn cancel(self) {
        for handle in &self.handles {
            handle.abort();
        }
        for handle in self.handles {
            let _ = handle.await;
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.handles.len()
    }
}

/// Run state of an engine's tasks.
pub(crate) enum Pipeline<C> {
    /// Held in reset. Commands submitted meanwhile wait in the receiver.
    Parked(mpsc::UnboundedReceiver<C>),
    Running(TaskSet),
}

/// Per-ID queue pair: descriptors from the issue stage, raw response beats
/// from the collect stage. Both receivers go to that ID's reassembly task.
pub(crate) struct IdQueues<D, B> {
    pub(crate) desc_tx: Vec<mpsc::UnboundedSender<D>>,
    pub(crate) beat_tx: Vec<mpsc::UnboundedSender<B>>,
    pub(crate) slots: Vec<(mpsc::UnboundedReceiver<D>, mpsc::UnboundedReceiver<B>)>,
}

impl<D, B> IdQueues<D, B> {
    pub(crate) fn new(id_count: usize) -> Self {
        let mut desc_tx = Vec::with_capacity(id_count);
        let mut beat_tx = Vec::with_capacity(id_count);
        let mut slots = Vec::with_capacity(id_count);
        for _ in 0..id_count {
            let (dtx, drx) = mpsc::unbounded_channel();
            let (btx, brx) = mpsc::unbounded_channel();
            desc_tx.push(dtx);
            beat_tx.push(btx);
            slots.push((drx, brx));
        }
        Self {
            desc_tx,
            beat_tx,
            slots,
        }
    }
}
