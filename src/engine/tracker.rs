//! Outstanding-transaction bookkeeping.
//!
//! The tracker holds the per-ID outstanding-burst counters, the engine-wide
//! in-flight command count with its idle signal, and the fault latch raised
//! by a protocol violation. The issue stage only increments a counter; the
//! response-collect stage is the only task that decrements one, and it
//! refuses to go below zero.

use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::sync::watch;

use crate::common::AxiError;

pub struct Tracker {
    outstanding: Box<[AtomicUsize]>,
    in_flight: watch::Sender<usize>,
    fault: watch::Sender<Option<AxiError>>,
}

impl Tracker {
    pub fn new(id_count: usize) -> Self {
        Self {
            outstanding: (0..id_count).map(|_| AtomicUsize::new(0)).collect(),
            in_flight: watch::Sender::new(0),
            fault: watch::Sender::new(None),
        }
    }

    pub fn id_count(&self) -> usize {
        self.outstanding.len()
    }

    /// Number of submitted commands whose completion has not resolved.
    pub fn in_flight(&self) -> usize {
        *self.in_flight.borrow()
    }

    pub fn idle(&self) -> bool {
        self.in_flight() == 0
    }

    /// Suspends until the in-flight count reaches zero.
    pub async fn wait_idle(&self) {
        let mut rx = self.in_flight.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|n| *n == 0).await;
    }

    /// Bursts issued on `id` that have not been matched with a response.
    pub fn outstanding(&self, id: usize) -> usize {
        self.outstanding
            .get(id)
            .map_or(0, |n| n.load(Ordering::Acquire))
    }

    pub(crate) fn begin(&self) {
        self.in_flight.send_modify(|n| *n += 1);
    }

    pub(crate) fn finish(&self) {
        self.in_flight.send_modify(|n| *n = n.saturating_sub(1));
    }

    pub(crate) fn burst_issued(&self, id: usize) {
        self.outstanding[id].fetch_add(1, Ordering::AcqRel);
    }

    /// Matches one response with an outstanding burst on `id`.
    ///
    /// Returns `false` without touching the counter if nothing is
    /// outstanding on that ID.
    pub(crate) fn claim_burst(&self, id: usize) -> bool {
        match self.outstanding.get(id) {
            Some(n) => n
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
                .is_ok(),
            None => false,
        }
    }

    /// The protocol violation that stopped the engine, if any.
    pub fn fault(&self) -> Option<AxiError> {
        self.fault.borrow().clone()
    }

    pub(crate) fn raise_fault(&self, err: AxiError) {
        self.fault.send_modify(|f| {
            if f.is_none() {
                *f = Some(err);
            }
        });
    }

    /// Suspends until a protocol violation is recorded.
    pub async fn wait_fault(&self) -> AxiError {
        fault_raised(&mut self.watch_fault()).await
    }

    /// Receiver for the fault latch, used by the pipeline tasks.
    pub(crate) fn watch_fault(&self) -> watch::Receiver<Option<AxiError>> {
        self.fault.subscribe()
    }

    /// Zeroes every counter, clears the fault latch and signals idle.
    ///
    /// Returns the number of commands that were in flight.
    pub(crate) fn clear(&self) -> usize {
        for n in self.outstanding.iter() {
            n.store(0, Ordering::Release);
        }
        self.fault.send_replace(None);
        self.in_flight.send_replace(0)
    }
}

/// Resolves with the latched fault, immediately if one is already set.
pub(crate) async fn fault_raised(rx: &mut watch::Receiver<Option<AxiError>>) -> AxiError {
    match rx.wait_for(Option::is_some).await {
        Ok(fault) => fault.clone().unwrap_or(AxiError::Flushed),
        Err(_) => AxiError::Flushed,
    }
}
