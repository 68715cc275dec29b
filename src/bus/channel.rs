//! Point-to-point bus channel.
//!
//! A `BusChannel` models one AXI channel (AW, W, B, AR or R) between a master
//! and a slave. It is a FIFO with an optional occupancy limit: `send` suspends
//! while the channel holds `depth` beats, which is the only backpressure the
//! interconnect applies. Both endpoints hold clones of the same channel so a
//! reset can `clear` it from either side.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::Notify;

struct Inner<T> {
    name: &'static str,
    queue: Mutex<VecDeque<T>>,
    depth: AtomicUsize,
    readable: Notify,
    writable: Notify,
}

/// Shared handle to a single bus channel.
pub struct BusChannel<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for BusChannel<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> BusChannel<T> {
    /// Creates a channel. A `depth` of 0 leaves it unbounded.
    pub fn new(name: &'static str, depth: usize) -> Self {
        Self {
            inner: Arc::new(Inner {
                name,
                queue: Mutex::new(VecDeque::new()),
                depth: AtomicUsize::new(depth),
                readable: Notify::new(),
                writable: Notify::new(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<T>> {
        self.inner.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Places a beat on the channel, suspending while it is full.
    pub async fn send(&self, beat: T) {
        loop {
            // Register before checking so a broadcast wakeup cannot be missed.
            let notified = self.inner.writable.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            {
                let mut queue = self.queue();
                let depth = self.depth();
                if depth == 0 || queue.len() < depth {
                    queue.push_back(beat);
                    drop(queue);
                    self.inner.readable.notify_one();
                    return;
                }
            }
            notified.await;
        }
    }

    /// Takes the oldest beat, suspending until one arrives.
    pub async fn recv(&self) -> T {
        loop {
            if let Some(beat) = self.try_recv() {
                return beat;
            }
            self.inner.readable.notified().await;
        }
    }

    /// Takes the oldest beat if one is queued.
    pub fn try_recv(&self) -> Option<T> {
        let beat = self.queue().pop_front();
        if beat.is_some() {
            self.inner.writable.notify_one();
        }
        beat
    }

    /// Discards every queued beat and wakes all blocked senders.
    pub fn clear(&self) {
        let dropped = {
            let mut queue = self.queue();
            let n = queue.len();
            queue.clear();
            n
        };
        if dropped > 0 {
            log::trace!("[{}] cleared {} beats", self.name(), dropped);
        }
        self.inner.writable.notify_waiters();
    }

    pub fn len(&self) -> usize {
        self.queue().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue().is_empty()
    }

    pub fn depth(&self) -> usize {
        self.inner.depth.load(Ordering::Relaxed)
    }

    /// Changes the occupancy limit. Beats already queued are kept.
    pub fn set_depth(&self, depth: usize) {
        self.inner.depth.store(depth, Ordering::Relaxed);
        self.inner.writable.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_fifo_order() {
        let ch = BusChannel::new("t", 0);
        for i in 0..4u32 {
            ch.send(i).await;
        }
        assert_eq!(ch.len(), 4);
        for i in 0..4u32 {
            assert_eq!(ch.recv().await, i);
        }
        assert!(ch.is_empty());
    }

    #[tokio::test]
    async fn test_send_blocks_when_full() {
        let ch = BusChannel::new("t", 2);
        ch.send(1u32).await;
        ch.send(2u32).await;

        let blocked = tokio::time::timeout(Duration::from_millis(20), ch.send(3)).await;
        assert!(blocked.is_err());

        assert_eq!(ch.try_recv(), Some(1));
        ch.send(3).await;
        assert_eq!(ch.len(), 2);
    }

    #[tokio::test]
    async fn test_clear_releases_sender() {
        let ch = BusChannel::new("t", 1);
        ch.send(1u32).await;

        let tx = ch.clone();
        let pending = tokio::spawn(async move { tx.send(2).await });
        tokio::task::yield_now().await;
        ch.clear();

        pending.await.unwrap();
        assert_eq!(ch.try_recv(), Some(2));
    }

    #[tokio::test]
    async fn test_raising_depth_releases_sender() {
        let ch = BusChannel::new("t", 1);
        ch.send(1u32).await;

        let tx = ch.clone();
        let pending = tokio::spawn(async move { tx.send(2).await });
        tokio::task::yield_now().await;
        assert_eq!(ch.len(), 1);

        ch.set_depth(2);
        pending.await.unwrap();
        assert_eq!(ch.len(), 2);
        assert_eq!(ch.depth(), 2);
    }

    #[tokio::test]
    async fn test_clear_releases_every_sender() {
        let ch = BusChannel::new("t", 2);
        ch.send(1u32).await;
        ch.send(2u32).await;

        let senders: Vec<_> = (3..5u32)
            .map(|v| {
                let tx = ch.clone();
                tokio::spawn(async move { tx.send(v).await })
            })
            .collect();
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        assert_eq!(ch.len(), 2);

        ch.clear();
        for s in senders {
            tokio::time::timeout(Duration::from_secs(1), s)
                .await
                .expect("sender stayed blocked after clear")
                .unwrap();
        }
        assert_eq!(ch.len(), 2);
    }

    #[tokio::test]
    async fn test_raising_depth_releases_every_sender() {
        let ch = BusChannel::new("t", 1);
        ch.send(0u32).await;

        let senders: Vec<_> = (1..3u32)
            .map(|v| {
                let tx = ch.clone();
                tokio::spawn(async move { tx.send(v).await })
            })
            .collect();
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        assert_eq!(ch.len(), 1);

        ch.set_depth(3);
        for s in senders {
            tokio::time::timeout(Duration::from_secs(1), s)
                .await
                .expect("sender stayed blocked after raising depth")
                .unwrap();
        }
        assert_eq!(ch.len(), 3);
    }

    #[tokio::test]
    async fn test_recv_waits_for_beat() {
        let ch = BusChannel::new("t", 0);
        let rx = ch.clone();
        let waiter = tokio::spawn(async move { rx.recv().await });
        tokio::task::yield_now().await;
        ch.send(7u32).await;
        assert_eq!(waiter.await.unwrap(), 7);
    }
}
