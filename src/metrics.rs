use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Counters for monitoring
#[derive(Clone, Debug)]
pub struct Metrics {
    pub users_registered: Arc<AtomicUsize>,
    pub logins_failed: Arc<AtomicUsize>,
    pub books_added: Arc<AtomicUsize>,
    pub books_deleted: Arc<AtomicUsize>,
    pub purge_runs: Arc<AtomicUsize>,
    pub books_purged: Arc<AtomicU64>,
    pub purge_failures: Arc<AtomicUsize>,
    pub start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            users_registered: Arc::new(AtomicUsize::new(0)),
            logins_failed: Arc::new(AtomicUsize::new(0)),
            books_added: Arc::new(AtomicUsize::new(0)),
            books_deleted: Arc::new(AtomicUsize::new(0)),
            purge_runs: Arc::new(AtomicUsize::new(0)),
            books_purged: Arc::new(AtomicU64::new(0)),
            purge_failures: Arc::new(AtomicUsize::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn inc_users_registered(&self) {
        self.users_registered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_logins_failed(&self) {
        self.logins_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_books_added(&self) {
        self.books_added.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_books_deleted(&self) {
        self.books_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_purge_runs(&self) {
        self.purge_runs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_books_purged(&self, count: u64) {
        self.books_purged.fetch_add(count, Ordering::Relaxed);
    }

    pub fn inc_purge_failures(&self) {
        self.purge_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            users_registered: self.users_registered.load(Ordering::Relaxed),
            logins_failed: self.logins_failed.load(Ordering::Relaxed),
            books_added: self.books_added.load(Ordering::Relaxed),
            books_deleted: self.books_deleted.load(Ordering::Relaxed),
            purge_runs: self.purge_runs.load(Ordering::Relaxed),
            books_purged: self.books_purged.load(Ordering::Relaxed),
            purge_failures: self.purge_failures.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub users_registered: usize,
    pub logins_failed: usize,
    pub books_added: usize,
    pub books_deleted: usize,
    pub purge_runs: usize,
    pub books_purged: u64,
    pub purge_failures: usize,
    pub uptime_seconds: u64,
}
