//! Bounded FIFO between the auth gate and the delivery worker.
//!
//! Producers are the connection tasks, one per in-flight authentication;
//! the single consumer is the delivery worker. When the queue is full,
//! `submit` suspends the producing connection until a slot frees, so a
//! stalled worker slows authentication down instead of dropping attempts.

use log::trace;
use tokio::sync::mpsc::{self, error::TryRecvError};

use super::types::Attempt;
use crate::error_handling::types::CaptureError;

/// Default capacity of the attempt queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

/// Creates a queue holding at most `capacity` attempts (at least one).
pub fn attempt_queue(capacity: usize) -> (AttemptSender, AttemptReceiver) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    (AttemptSender { tx }, AttemptReceiver { rx })
}

#[derive(Clone, Debug)]
pub struct AttemptSender {
    tx: mpsc::Sender<Attempt>,
}

impl AttemptSender {
    /// Publishes an attempt, waiting for a free slot if the queue is full.
    ///
    /// Fails only once the consumer side has been closed or dropped.
    pub async fn submit(&self, attempt: Attempt) -> Result<(), CaptureError> {
        trace!(
            "queueing attempt from {} ({} free slot(s))",
            attempt.origin,
            self.tx.capacity()
        );
        self.tx
            .send(attempt)
            .await
            .map_err(|_| CaptureError::QueueClosed)
    }

    /// Number of attempts that can be submitted right now without waiting.
    pub fn available_slots(&self) -> usize {
        self.tx.capacity()
    }
}

#[derive(Debug)]
pub struct AttemptReceiver {
    rx: mpsc::Receiver<Attempt>,
}

impl AttemptReceiver {
    /// Next attempt in arrival order, or `None` once every sender is gone
    /// and the queue is empty.
    pub async fn recv(&mut self) -> Option<Attempt> {
        self.rx.recv().await
    }

    /// Next buffered attempt without waiting.
    pub fn try_recv(&mut self) -> Option<Attempt> {
        match self.rx.try_recv() {
            Ok(attempt) => Some(attempt),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Refuses further submissions; attempts already queued can still be
    /// received.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio_test::{assert_pending, assert_ready_ok, task};

    fn attempt(n: usize) -> Attempt {
        Attempt::now(&format!("user{}", n), "secret", "192.0.2.10:40000")
    }

    #[tokio::test]
    async fn test_receives_in_arrival_order() {
        let (tx, mut rx) = attempt_queue(DEFAULT_QUEUE_CAPACITY);

        for n in 0..5 {
            tx.submit(attempt(n)).await.unwrap();
        }

        for n in 0..5 {
            assert_eq!(rx.recv().await.unwrap().user, format!("user{}", n));
        }
    }

    #[tokio::test]
    async fn test_submit_waits_when_full() {
        let (tx, mut rx) = attempt_queue(2);
        tx.submit(attempt(1)).await.unwrap();
        tx.submit(attempt(2)).await.unwrap();
        assert_eq!(tx.available_slots(), 0);

        let mut third = task::spawn(tx.submit(attempt(3)));
        assert_pending!(third.poll());

        // Consuming one entry frees exactly one slot.
        assert_eq!(rx.recv().await.unwrap().user, "user1");
        assert!(third.is_woken());
        assert_ready_ok!(third.poll());

        assert_eq!(rx.recv().await.unwrap().user, "user2");
        assert_eq!(rx.recv().await.unwrap().user, "user3");
    }

    #[tokio::test(start_paused = true)]
    async fn test_blocked_submit_stays_blocked_without_consumer() {
        let (tx, _rx) = attempt_queue(1);
        tx.submit(attempt(1)).await.unwrap();

        let res = tokio::time::timeout(Duration::from_secs(60), tx.submit(attempt(2))).await;
        assert!(res.is_err());
    }

    #[tokio::test]
    async fn test_submit_fails_after_close() {
        let (tx, mut rx) = attempt_queue(4);
        tx.submit(attempt(1)).await.unwrap();
        rx.close();

        assert!(matches!(
            tx.submit(attempt(2)).await,
            Err(CaptureError::QueueClosed)
        ));
        assert_eq!(rx.try_recv().unwrap().user, "user1");
        assert!(rx.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_recv_ends_when_senders_dropped() {
        let (tx, mut rx) = attempt_queue(4);
        tx.submit(attempt(1)).await.unwrap();
        drop(tx);

        assert!(rx.recv().await.is_some());
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        let (tx, _rx) = attempt_queue(0);
        assert_eq!(tx.available_slots(), 1);
    }
}
