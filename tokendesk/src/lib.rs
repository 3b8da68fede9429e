// Copyright (c) James Kassemi, SC, US. All rights reserved.

//! Citizen appointment token engine: slot reservation, token lifecycle,
//! and the live "now serving" feed, assembled behind one handle.
//!
//! [`TokenDesk`] wires a [`BookingStore`] substrate, the
//! [`BookingController`] coordinators, and the [`FeedHub`] display layer.
//! It is a library-level engine: transports, identity, catalogs, and
//! rendering live outside and call in. Booking and cancellation are async
//! (optimistic commits retry with backoff under contention); everything
//! else is synchronous. Feed subscriptions require an ambient tokio
//! runtime.

use std::sync::Arc;

use chrono::NaiveDate;

pub use core_types::{
    catalog::{validate_department, CatalogError, DepartmentCatalog, HolidayCalendar},
    config::{BookingConfig, DeskConfig, FeedConfig},
    retry::RetryPolicy,
    types::{Department, NewSlot, Slot, Token, TokenChangeSink, TokenStatus},
};
pub use live_feed::{FeedHub, FeedMetricsSnapshot, FeedScope, FeedSubscription};
pub use slot_space::{
    BookingController, BookingError, BookingMetricsSnapshot, BookingRequest, BookingStore, Result,
};

/// The assembled engine. Construct once, share freely (`Arc<TokenDesk>`);
/// every operation takes `&self`.
pub struct TokenDesk {
    controller: BookingController,
    feed: Arc<FeedHub>,
}

impl TokenDesk {
    pub fn new(config: DeskConfig) -> Self {
        let store = Arc::new(BookingStore::new());
        let feed = Arc::new(FeedHub::new(&config.feed));
        let controller = BookingController::new(store, &config.booking)
            .with_change_sink(Arc::clone(&feed) as Arc<dyn TokenChangeSink>);
        Self { controller, feed }
    }

    pub fn with_defaults() -> Self {
        Self::new(DeskConfig::default())
    }

    pub fn controller(&self) -> &BookingController {
        &self.controller
    }

    pub fn feed(&self) -> &FeedHub {
        &self.feed
    }

    pub async fn book(&self, request: BookingRequest) -> Result<Token> {
        self.controller.book(request).await
    }

    pub async fn cancel(&self, token_id: &str) -> Result<Token> {
        self.controller.cancel(token_id).await
    }

    pub fn user_tokens(&self, user_id: &str) -> Vec<Token> {
        self.controller.user_tokens(user_id)
    }

    pub fn slots_for_department_date(&self, department_id: &str, date: NaiveDate) -> Vec<Slot> {
        self.controller.slots_for_department_date(department_id, date)
    }

    /// Calls a pending token up for service.
    pub fn call(&self, token_id: &str) -> Result<Token> {
        self.controller.advance_status(token_id, TokenStatus::Called)
    }

    /// Marks a called token as served.
    pub fn complete(&self, token_id: &str) -> Result<Token> {
        self.controller
            .advance_status(token_id, TokenStatus::Completed)
    }

    pub fn token(&self, token_id: &str) -> Result<Token> {
        self.controller.token(token_id)
    }

    pub fn tokens_for_department_date(&self, department_id: &str, date: NaiveDate) -> Vec<Token> {
        self.controller.tokens_for_department_date(department_id, date)
    }

    pub fn tokens_for_date(&self, date: NaiveDate) -> Vec<Token> {
        self.controller.tokens_for_date(date)
    }

    pub fn tokens_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<Token> {
        self.controller.tokens_in_range(start, end)
    }

    pub fn provision_slot(&self, new_slot: NewSlot) -> Result<Slot> {
        self.controller.provision_slot(new_slot)
    }

    pub fn set_manual_block(&self, slot_id: &str, blocked: bool) -> Result<Slot> {
        self.controller.set_manual_block(slot_id, blocked)
    }

    pub fn subscribe_current<F>(
        &self,
        scope: FeedScope,
        date: NaiveDate,
        on_change: F,
    ) -> FeedSubscription
    where
        F: FnMut(Option<Token>) + Send + 'static,
    {
        self.feed.subscribe_current(scope, date, on_change)
    }

    pub fn subscribe_roster<F>(
        &self,
        scope: FeedScope,
        date: NaiveDate,
        on_change: F,
    ) -> FeedSubscription
    where
        F: FnMut(Vec<Token>) + Send + 'static,
    {
        self.feed.subscribe_roster(scope, date, on_change)
    }

    pub fn booking_metrics(&self) -> BookingMetricsSnapshot {
        self.controller.metrics().snapshot()
    }

    pub fn feed_metrics(&self) -> FeedMetricsSnapshot {
        self.feed.metrics().snapshot()
    }
}
