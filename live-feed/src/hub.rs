// Copyright (c) James Kassemi, SC, US. All rights reserved.

use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use chrono::NaiveDate;
use log::{debug, warn};
use parking_lot::RwLock;
use tokio::sync::watch;

use core_types::{
    config::FeedConfig,
    types::{Token, TokenChangeSink, TokenStatus},
};

use crate::{
    metrics::FeedMetrics,
    subscription::{FeedSubscription, SubShared},
};

/// What a subscriber watches: one department's queue or the whole office.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub enum FeedScope {
    AllDepartments,
    Department(String),
}

#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct FeedKey {
    pub scope: FeedScope,
    pub date: NaiveDate,
}

struct Topic {
    /// Latest revision of every token seen for this scope/date.
    tokens: HashMap<String, Token>,
    current_tx: watch::Sender<Option<Token>>,
    roster_tx: watch::Sender<Vec<Token>>,
}

impl Topic {
    fn new() -> Self {
        let (current_tx, _) = watch::channel(None);
        let (roster_tx, _) = watch::channel(Vec::new());
        Self {
            tokens: HashMap::new(),
            current_tx,
            roster_tx,
        }
    }

    /// Re-derives the two published views from the token set. The current
    /// token is the most recently touched `called` token; ties break on id
    /// so the winner is deterministic.
    fn refresh(&mut self, roster_enabled: bool) {
        let current = self
            .tokens
            .values()
            .filter(|t| t.status == TokenStatus::Called)
            .max_by(|a, b| {
                a.effective_updated_at()
                    .cmp(&b.effective_updated_at())
                    .then_with(|| a.id.cmp(&b.id))
            })
            .cloned();
        self.current_tx.send_if_modified(|cur| {
            if *cur != current {
                *cur = current;
                true
            } else {
                false
            }
        });

        if roster_enabled {
            let mut roster: Vec<Token> = self.tokens.values().cloned().collect();
            roster.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
            self.roster_tx.send_if_modified(|cur| {
                if *cur != roster {
                    *cur = roster;
                    true
                } else {
                    false
                }
            });
        }
    }
}

/// Publish/subscribe hub for the live display screens.
///
/// Keyed by `(scope, booking date)`; every committed token change fans out
/// to the department topic and the all-departments topic for its day.
/// Publishing is synchronous and lock-brief: it updates topic state and
/// flips `watch` channels, never waiting on subscribers, so the booking
/// paths cannot stall behind a slow display. Each subscriber is an
/// independent forwarder task that only ever sees the latest value
/// (intermediate states may coalesce; nothing queues unboundedly).
///
/// Subscriptions spawn onto the ambient tokio runtime, so `subscribe_*`
/// must be called from within one.
pub struct FeedHub {
    topics: RwLock<HashMap<FeedKey, Topic>>,
    next_sub_id: AtomicU64,
    roster_enabled: bool,
    metrics: FeedMetrics,
}

impl FeedHub {
    pub fn new(config: &FeedConfig) -> Self {
        Self {
            topics: RwLock::new(HashMap::new()),
            next_sub_id: AtomicU64::new(1),
            roster_enabled: config.roster_enabled,
            metrics: FeedMetrics::new(),
        }
    }

    pub fn metrics(&self) -> FeedMetrics {
        self.metrics.clone()
    }

    /// Ingests one committed token change. Called by the booking engine
    /// after every create/update; also usable directly in tests.
    pub fn publish(&self, token: &Token) {
        self.metrics.inc_events();
        let keys = [
            FeedKey {
                scope: FeedScope::Department(token.department_id.clone()),
                date: token.booking_date,
            },
            FeedKey {
                scope: FeedScope::AllDepartments,
                date: token.booking_date,
            },
        ];
        let mut topics = self.topics.write();
        for key in keys {
            let topic = topics.entry(key).or_insert_with(Topic::new);
            topic.tokens.insert(token.id.clone(), token.clone());
            topic.refresh(self.roster_enabled);
        }
    }

    /// Point-in-time read of the current called token for a scope/date.
    pub fn current_for(&self, scope: FeedScope, date: NaiveDate) -> Option<Token> {
        let topics = self.topics.read();
        topics
            .get(&FeedKey { scope, date })
            .and_then(|topic| topic.current_tx.borrow().clone())
    }

    /// Follows the "now serving" token for a scope/date. The callback
    /// receives the current value immediately, then again on every change
    /// (`None` when no token is being served).
    pub fn subscribe_current<F>(
        &self,
        scope: FeedScope,
        date: NaiveDate,
        mut on_change: F,
    ) -> FeedSubscription
    where
        F: FnMut(Option<Token>) + Send + 'static,
    {
        let mut rx = {
            let mut topics = self.topics.write();
            topics
                .entry(FeedKey {
                    scope: scope.clone(),
                    date,
                })
                .or_insert_with(Topic::new)
                .current_tx
                .subscribe()
        };
        let id = self.next_sub_id.fetch_add(1, Ordering::Relaxed);
        let shared = SubShared::new();
        let task_shared = Arc::clone(&shared);
        let metrics = self.metrics.clone();
        self.metrics.subscription_opened();
        debug!("[live-feed] subscription {id} opened for {scope:?} on {date}");

        tokio::spawn(async move {
            loop {
                let value = rx.borrow_and_update().clone();
                if !task_shared.deliver(value, &mut on_change) {
                    break;
                }
                metrics.inc_notifications();
                tokio::select! {
                    _ = task_shared.cancel.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            metrics.subscription_closed();
        });

        FeedSubscription::new(id, shared)
    }

    /// Follows the full day roster (every token for the scope/date in
    /// arrival order), the admin dashboard view. Requires
    /// `feed.roster_enabled`; otherwise only the initial empty roster is
    /// ever delivered.
    pub fn subscribe_roster<F>(
        &self,
        scope: FeedScope,
        date: NaiveDate,
        mut on_change: F,
    ) -> FeedSubscription
    where
        F: FnMut(Vec<Token>) + Send + 'static,
    {
        if !self.roster_enabled {
            warn!("[live-feed] roster subscription requested but feed.roster_enabled is off");
        }
        let mut rx = {
            let mut topics = self.topics.write();
            topics
                .entry(FeedKey {
                    scope: scope.clone(),
                    date,
                })
                .or_insert_with(Topic::new)
                .roster_tx
                .subscribe()
        };
        let id = self.next_sub_id.fetch_add(1, Ordering::Relaxed);
        let shared = SubShared::new();
        let task_shared = Arc::clone(&shared);
        let metrics = self.metrics.clone();
        self.metrics.subscription_opened();
        debug!("[live-feed] roster subscription {id} opened for {scope:?} on {date}");

        tokio::spawn(async move {
            loop {
                let value = rx.borrow_and_update().clone();
                if !task_shared.deliver(value, &mut on_change) {
                    break;
                }
                metrics.inc_notifications();
                tokio::select! {
                    _ = task_shared.cancel.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
            metrics.subscription_closed();
        });

        FeedSubscription::new(id, shared)
    }
}

impl Default for FeedHub {
    fn default() -> Self {
        Self::new(&FeedConfig::default())
    }
}

impl TokenChangeSink for FeedHub {
    fn token_changed(&self, token: &Token) {
        self.publish(token);
    }
}
