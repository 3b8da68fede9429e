use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

#[derive(Default)]
struct BookingMetricsInner {
    bookings: AtomicU64,
    commit_retries: AtomicU64,
    conflicts_surfaced: AtomicU64,
    rejected_full: AtomicU64,
    rejected_blocked: AtomicU64,
    cancellations: AtomicU64,
    transitions: AtomicU64,
}

/// Cheap shared counters for the booking paths; cloned handles observe the
/// same totals.
#[derive(Clone, Default)]
pub struct BookingMetrics {
    inner: Arc<BookingMetricsInner>,
}

pub struct BookingMetricsSnapshot {
    pub bookings: u64,
    pub commit_retries: u64,
    pub conflicts_surfaced: u64,
    pub rejected_full: u64,
    pub rejected_blocked: u64,
    pub cancellations: u64,
    pub transitions: u64,
}

impl BookingMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_bookings(&self) {
        self.inner.bookings.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_commit_retries(&self) {
        self.inner.commit_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_conflicts_surfaced(&self) {
        self.inner.conflicts_surfaced.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rejected_full(&self) {
        self.inner.rejected_full.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_rejected_blocked(&self) {
        self.inner.rejected_blocked.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_cancellations(&self) {
        self.inner.cancellations.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_transitions(&self) {
        self.inner.transitions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> BookingMetricsSnapshot {
        BookingMetricsSnapshot {
            bookings: self.inner.bookings.load(Ordering::Relaxed),
            commit_retries: self.inner.commit_retries.load(Ordering::Relaxed),
            conflicts_surfaced: self.inner.conflicts_surfaced.load(Ordering::Relaxed),
            rejected_full: self.inner.rejected_full.load(Ordering::Relaxed),
            rejected_blocked: self.inner.rejected_blocked.load(Ordering::Relaxed),
            cancellations: self.inner.cancellations.load(Ordering::Relaxed),
            transitions: self.inner.transitions.load(Ordering::Relaxed),
        }
    }
}
