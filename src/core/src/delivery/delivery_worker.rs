//! # Delivery worker
//!
//! The single background task that moves captured attempts from the
//! attempt queue into the activity store.
//!
//! ```text
//! ┌──────────────┐    ┌────────────────────┐    ┌───────────────┐
//! │ AttemptQueue │───▶│  DeliveryWorker    │───▶│ ActivityStore │
//! │ (bounded)    │    │                    │    └───────────────┘
//! └──────────────┘    │ - Backlog (FIFO)   │
//!                     │ - Backoff on stall │
//!                     └────────────────────┘
//! ```
//!
//! For every queued attempt the worker writes it to the store. A failed
//! write parks the attempt at the tail of the backlog and triggers a
//! reconnect; if the reconnect fails as well the worker pauses according to
//! its backoff policy and moves on to the next queued attempt without
//! retrying the parked one. Whenever a write (or the reconnect that followed
//! a failed one) succeeds, the backlog is replayed from its head until the
//! first failure. Only the written prefix is removed, so the backlog never
//! changes order.
//!
//! The worker owns both the store and the backlog. Nothing else touches
//! either, which is why neither needs a lock.

use log::{debug, error, info, warn};
use tokio::sync::watch;

use super::backlog::Backlog;
use super::backoff::Backoff;
use crate::capture::{Attempt, AttemptReceiver};
use crate::storage::storage_trait::ActivityStore;

/// What happened to one queued attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Written on the first try.
    Delivered,
    /// The write failed, the attempt joined the backlog and the reconnect
    /// succeeded, so the backlog was replayed.
    Buffered,
    /// Both the write and the reconnect failed. The attempt stays in the
    /// backlog and the worker should back off.
    Stalled,
}

/// Counters kept over the lifetime of a worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStats {
    /// Attempts written on their first try
    pub delivered: u64,
    /// Attempts that went through the backlog
    pub buffered: u64,
    /// Backlog entries written on replay
    pub replayed: u64,
    /// Backlog entries evicted by a bounded backlog
    pub dropped: u64,
    /// Entries still in the backlog
    pub pending: usize,
}

pub struct DeliveryWorker<S, B> {
    store: S,
    backoff: B,
    backlog: Backlog,
    stats: DeliveryStats,
}

impl<S, B> DeliveryWorker<S, B>
where
    S: ActivityStore,
    B: Backoff,
{
    pub fn new(store: S, backoff: B, backlog: Backlog) -> Self {
        Self {
            store,
            backoff,
            backlog,
            stats: DeliveryStats::default(),
        }
    }

    pub fn backlog(&self) -> &Backlog {
        &self.backlog
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn stats(&self) -> DeliveryStats {
        DeliveryStats {
            dropped: self.backlog.dropped(),
            pending: self.backlog.len(),
            ..self.stats
        }
    }

    /// Handles one queued attempt. Never pauses by itself; the caller
    /// decides what to do with [`DeliveryOutcome::Stalled`].
    pub async fn deliver(&mut self, attempt: Attempt) -> DeliveryOutcome {
        match self.store.write_attempt(&attempt).await {
            Ok(()) => {
                self.stats.delivered += 1;
                self.flush_backlog().await;
                DeliveryOutcome::Delivered
            }
            Err(e) => {
                warn!(
                    "Failed to write attempt from {}: {}, buffering it ({} already buffered)",
                    attempt.origin,
                    e,
                    self.backlog.len()
                );
                self.buffer(attempt);

                if let Err(e) = self.store.login().await {
                    error!("Reconnect to the activity store failed: {}", e);
                    return DeliveryOutcome::Stalled;
                }
                info!("Reconnected to the activity store");
                self.flush_backlog().await;
                DeliveryOutcome::Buffered
            }
        }
    }

    /// Writes backlog entries from the head until one fails.
    ///
    /// Returns how many entries were written and removed.
    pub async fn flush_backlog(&mut self) -> usize {
        let mut written = 0usize;
        while let Some(attempt) = self.backlog.front() {
            if let Err(e) = self.store.write_attempt(attempt).await {
                debug!(
                    "Backlog replay stopped at attempt from {} ({}): {}",
                    attempt.origin, attempt.timestamp, e
                );
                break;
            }
            self.backlog.pop_front();
            written += 1;
        }

        if written > 0 {
            self.stats.replayed += written as u64;
            info!(
                "Replayed {} buffered attempt(s), {} remaining",
                written,
                self.backlog.len()
            );
        }
        written
    }

    fn buffer(&mut self, attempt: Attempt) {
        self.stats.buffered += 1;
        self.backlog.push(attempt);
    }

    /// Consumes the queue until it closes or `shutdown` fires, then makes
    /// one last delivery pass and returns the final counters.
    ///
    /// The last pass moves whatever is still queued into the backlog and
    /// replays it. When that replay stops early the worker logs in once and
    /// replays again, without pausing. Attempts that are still undelivered
    /// after it are lost when the process exits.
    pub async fn run(
        mut self,
        mut queue: AttemptReceiver,
        mut shutdown: watch::Receiver<bool>,
    ) -> DeliveryStats {
        info!("Delivery worker started");

        loop {
            if *shutdown.borrow() {
                break;
            }

            let attempt = tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                next = queue.recv() => match next {
                    Some(attempt) => attempt,
                    None => {
                        info!("Attempt queue closed");
                        break;
                    }
                },
            };

            if self.deliver(attempt).await == DeliveryOutcome::Stalled {
                debug!(
                    "Activity store unreachable, backing off ({} buffered)",
                    self.backlog.len()
                );
                tokio::select! {
                    _ = self.backoff.pause() => {}
                    _ = shutdown.changed() => break,
                }
            }
        }

        self.finish(queue).await
    }

    async fn finish(mut self, mut queue: AttemptReceiver) -> DeliveryStats {
        queue.close();
        while let Some(attempt) = queue.try_recv() {
            self.buffer(attempt);
        }

        if !self.backlog.is_empty() {
            info!(
                "Flushing {} undelivered attempt(s) before exit",
                self.backlog.len()
            );
            self.flush_backlog().await;

            // The store may have recovered while the worker was stalled, but
            // its connection is only re-established by a login.
            if !self.backlog.is_empty() {
                match self.store.login().await {
                    Ok(()) => {
                        info!("Reconnected to the activity store for the final flush");
                        self.flush_backlog().await;
                    }
                    Err(e) => warn!("Final reconnect to the activity store failed: {}", e),
                }
            }
        }
        if !self.backlog.is_empty() {
            warn!(
                "{} attempt(s) could not be delivered and will be lost",
                self.backlog.len()
            );
        }

        let stats = self.stats();
        info!(
            "Delivery worker stopped: {} delivered, {} buffered, {} replayed, {} dropped, {} lost",
            stats.delivered, stats.buffered, stats.replayed, stats.dropped, stats.pending
        );
        stats
    }
}
