//! Deferred purge of soft-deleted books.
//!
//! Every successful soft delete puts one signal into a bounded queue. A
//! single background task wakes on a fixed interval and, only when the queue
//! is at capacity, drains it and asks the book store to purge every flagged
//! record in one transaction.
//!
//! ```text
//!   Idle ──(queue full AND tick)──▶ Purging ──ok──▶ Idle
//!    │                                 │
//!    └──cancel──▶ Stopped ◀──purge error┘
//! ```
//!
//! A purge failure stops the loop and is reported on the fatal-error channel;
//! it is never retried.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::StoreError;
use crate::metrics::Metrics;
use crate::store::BookStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Purging,
    Stopped,
}

impl SchedulerState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => SchedulerState::Idle,
            1 => SchedulerState::Purging,
            _ => SchedulerState::Stopped,
        }
    }
}

/// Shared, lock-free view of the scheduler for health checks.
#[derive(Debug, Clone, Default)]
pub struct PurgeStatus {
    state: Arc<AtomicU8>,
    failed: Arc<AtomicBool>,
}

impl PurgeStatus {
    pub fn state(&self) -> SchedulerState {
        SchedulerState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// True once the loop stopped because a purge failed.
    pub fn failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    fn set(&self, state: SchedulerState) {
        self.state.store(state as u8, Ordering::Release);
    }

    fn mark_failed(&self) {
        self.failed.store(true, Ordering::Release);
        self.set(SchedulerState::Stopped);
    }
}

/// Producer side of the delete-signal queue. Cheap to clone.
#[derive(Debug, Clone)]
pub struct PurgeQueue {
    tx: mpsc::Sender<()>,
    coalesced: Arc<AtomicU64>,
}

impl PurgeQueue {
    /// Records one delete. Never blocks.
    ///
    /// When the queue is already full the signal is coalesced instead of
    /// queued: a full queue guarantees the next tick purges, and a purge
    /// removes every flagged book, this one included.
    pub fn notify(&self) {
        match self.tx.try_send(()) {
            Ok(()) => {}
            Err(TrySendError::Full(())) => {
                self.coalesced.fetch_add(1, Ordering::Relaxed);
                tracing::debug!("Purge queue full, delete signal coalesced");
            }
            Err(TrySendError::Closed(())) => {
                tracing::warn!("Purge scheduler stopped, delete signal not queued");
            }
        }
    }

    /// Signals that arrived while the queue was full.
    pub fn coalesced(&self) -> u64 {
        self.coalesced.load(Ordering::Relaxed)
    }
}

/// Creates a delete-signal queue holding at most `capacity` signals.
pub fn channel(capacity: usize) -> (PurgeQueue, mpsc::Receiver<()>) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        PurgeQueue {
            tx,
            coalesced: Arc::new(AtomicU64::new(0)),
        },
        rx,
    )
}

/// Result of a single wake-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Queue below capacity; nothing happened.
    Waiting { queued: usize },
    /// Queue was full, drained, and the store purged `removed` records.
    Purged { removed: u64 },
}

pub struct PurgeScheduler {
    store: Arc<dyn BookStore>,
    rx: mpsc::Receiver<()>,
    capacity: usize,
    interval: Duration,
    status: PurgeStatus,
    metrics: Metrics,
}

impl PurgeScheduler {
    pub fn new(
        store: Arc<dyn BookStore>,
        rx: mpsc::Receiver<()>,
        capacity: usize,
        interval: Duration,
        metrics: Metrics,
    ) -> Self {
        Self {
            store,
            rx,
            capacity,
            interval,
            status: PurgeStatus::default(),
            metrics,
        }
    }

    pub fn status(&self) -> PurgeStatus {
        self.status.clone()
    }

    /// One wake-up of the scheduler.
    pub async fn tick(&mut self) -> Result<TickOutcome, StoreError> {
        let queued = self.rx.len();
        tracing::debug!(queued, capacity = self.capacity, "Purge queue check");
        if queued < self.capacity {
            return Ok(TickOutcome::Waiting { queued });
        }

        self.status.set(SchedulerState::Purging);
        for _ in 0..self.capacity {
            if self.rx.try_recv().is_err() {
                break;
            }
        }

        match self.store.purge_deleted().await {
            Ok(removed) => {
                self.metrics.inc_purge_runs();
                self.metrics.add_books_purged(removed);
                tracing::info!(removed, "Purged deleted books");
                self.status.set(SchedulerState::Idle);
                Ok(TickOutcome::Purged { removed })
            }
            Err(e) => {
                self.metrics.inc_purge_failures();
                self.status.mark_failed();
                Err(e)
            }
        }
    }

    /// Runs until `cancel` fires or a purge fails. A failure is sent on
    /// `fatal` before returning.
    pub async fn run(mut self, cancel: CancellationToken, fatal: mpsc::Sender<anyhow::Error>) {
        let mut ticker = time::interval_at(time::Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::debug!(interval_secs = self.interval.as_secs(), "Purge scheduler started");

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.status.set(SchedulerState::Stopped);
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        tracing::error!(error = %e, "Purge failed, stopping purge scheduler");
                        let _ = fatal.send(anyhow::Error::new(e).context("purge of deleted books failed")).await;
                        break;
                    }
                }
            }
        }
        tracing::debug!("Purge scheduler stopped");
    }
}
