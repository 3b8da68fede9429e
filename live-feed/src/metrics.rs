use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

#[derive(Default)]
struct FeedMetricsInner {
    events_published: AtomicU64,
    notifications_delivered: AtomicU64,
    subscriptions_opened: AtomicU64,
    subscriptions_active: AtomicU64,
}

/// Shared counters for the feed hub; cloned handles observe the same
/// totals.
#[derive(Clone, Default)]
pub struct FeedMetrics {
    inner: Arc<FeedMetricsInner>,
}

pub struct FeedMetricsSnapshot {
    pub events_published: u64,
    pub notifications_delivered: u64,
    pub subscriptions_opened: u64,
    pub subscriptions_active: u64,
}

impl FeedMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_events(&self) {
        self.inner.events_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_notifications(&self) {
        self.inner
            .notifications_delivered
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn subscription_opened(&self) {
        self.inner.subscriptions_opened.fetch_add(1, Ordering::Relaxed);
        self.inner.subscriptions_active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn subscription_closed(&self) {
        let prev = self.inner.subscriptions_active.load(Ordering::Relaxed);
        if prev > 0 {
            self.inner
                .subscriptions_active
                .fetch_sub(1, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> FeedMetricsSnapshot {
        FeedMetricsSnapshot {
            events_published: self.inner.events_published.load(Ordering::Relaxed),
            notifications_delivered: self
                .inner
                .notifications_delivered
                .load(Ordering::Relaxed),
            subscriptions_opened: self.inner.subscriptions_opened.load(Ordering::Relaxed),
            subscriptions_active: self.inner.subscriptions_active.load(Ordering::Relaxed),
        }
    }
}
