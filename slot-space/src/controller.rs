// Copyright (c) James Kassemi, SC, US. All rights reserved.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use log::{info, warn};

use core_types::{
    config::BookingConfig,
    retry::RetryPolicy,
    types::{NewSlot, Slot, Token, TokenChangeSink, TokenStatus},
    uid::{slot_uid, token_uid, uid_hex},
};

use crate::{
    error::{BookingError, Result},
    metrics::BookingMetrics,
    sequencer::{compose_token_number, SerialKey},
    store::{BookingStore, CommitBooking},
};

/// Everything the citizen-facing caller supplies for one booking. The
/// department code and display names come from the catalog the caller has
/// already read; the engine records them verbatim on the token.
#[derive(Clone, Debug)]
pub struct BookingRequest {
    pub user_id: String,
    pub user_name: String,
    pub department_id: String,
    pub department_code: String,
    pub department_name: String,
    pub slot_id: String,
    pub booking_date: NaiveDate,
}

/// Orchestrates the atomic booking and cancellation units, staff status
/// transitions, slot provisioning, and history queries over one
/// [`BookingStore`].
///
/// Booking and cancellation run optimistically: snapshot-read, compute,
/// then commit with expected versions; version conflicts are retried with
/// jittered backoff before `ConcurrencyConflict` surfaces to the caller.
pub struct BookingController {
    store: Arc<BookingStore>,
    retry: RetryPolicy,
    serial_width: usize,
    sink: Option<Arc<dyn TokenChangeSink>>,
    metrics: BookingMetrics,
}

impl BookingController {
    pub fn new(store: Arc<BookingStore>, config: &BookingConfig) -> Self {
        Self {
            store,
            retry: config.retry_policy(),
            serial_width: config.serial_width,
            sink: None,
            metrics: BookingMetrics::new(),
        }
    }

    /// Wires the live feed (or any other observer) into the mutation
    /// paths. Every committed create/update is forwarded.
    pub fn with_change_sink(mut self, sink: Arc<dyn TokenChangeSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn metrics(&self) -> BookingMetrics {
        self.metrics.clone()
    }

    fn notify(&self, token: &Token) {
        if let Some(sink) = &self.sink {
            sink.token_changed(token);
        }
    }

    /// Reserves one seat in a slot and mints the next token for the
    /// department/date, as one all-or-nothing unit.
    pub async fn book(&self, request: BookingRequest) -> Result<Token> {
        validate_booking_request(&request)?;
        let result = self
            .retry
            .retry_async(BookingError::is_retryable, |attempt| {
                self.try_book(&request, attempt)
            })
            .await;
        match &result {
            Ok(token) => {
                self.metrics.inc_bookings();
                info!(
                    "[booking] token {} ({}) booked for slot {}",
                    token.token_number, token.id, token.slot_id
                );
            }
            Err(BookingError::ConcurrencyConflict { attempts }) => {
                self.metrics.inc_conflicts_surfaced();
                warn!(
                    "[booking] giving up on slot {} after {} conflicting attempts",
                    request.slot_id, attempts
                );
            }
            Err(_) => {}
        }
        result
    }

    async fn try_book(&self, request: &BookingRequest, attempt: usize) -> Result<Token> {
        if attempt > 0 {
            self.metrics.inc_commit_retries();
        }

        let slot = self
            .store
            .slot(&request.slot_id)
            .map_err(|err| BookingError::from_store(err, attempt + 1))?;
        if slot.department_id != request.department_id {
            return Err(BookingError::Validation(
                "slot does not belong to the requested department",
            ));
        }
        if slot.date != request.booking_date {
            return Err(BookingError::Validation(
                "slot date does not match the booking date",
            ));
        }
        // Capacity is checked ahead of the blocked flag so that a slot
        // which auto-blocked by filling up reports SlotFull, and
        // SlotBlocked is left to mean an operator block.
        if !slot.has_capacity() {
            self.metrics.inc_rejected_full();
            return Err(BookingError::SlotFull {
                slot_id: slot.id.clone(),
                capacity: slot.max_capacity,
            });
        }
        if slot.blocked {
            self.metrics.inc_rejected_blocked();
            return Err(BookingError::SlotBlocked {
                slot_id: slot.id.clone(),
            });
        }

        let serial_key = SerialKey::new(request.department_id.clone(), request.booking_date);
        let last_serial = self.store.last_serial(&serial_key);
        let serial = last_serial + 1;
        let token_number = compose_token_number(
            &request.department_code,
            request.booking_date,
            serial,
            self.serial_width,
        );
        let id = uid_hex(&token_uid(
            &request.department_id,
            request.booking_date,
            serial,
            &request.user_id,
        ));
        let verification_payload = serde_json::json!({
            "token_id": id,
            "token_number": token_number,
            "user_id": request.user_id,
            "department_id": request.department_id,
        })
        .to_string();

        let token = Token {
            id,
            user_id: request.user_id.clone(),
            user_name: request.user_name.clone(),
            department_id: request.department_id.clone(),
            department_name: request.department_name.clone(),
            slot_id: slot.id.clone(),
            slot_time: slot.slot_time.clone(),
            booking_date: request.booking_date,
            token_number,
            status: TokenStatus::Pending,
            verification_payload,
            version: 0,
            created_at: Utc::now(),
            updated_at: None,
        };

        let (_, token) = self
            .store
            .commit_booking(CommitBooking {
                slot_id: slot.id,
                expected_slot_version: slot.version,
                serial_key,
                expected_serial: last_serial,
                token,
            })
            .map_err(|err| BookingError::from_store(err, attempt + 1))?;

        self.notify(&token);
        Ok(token)
    }

    /// Cancels a pending token and returns its seat to the slot, as one
    /// all-or-nothing unit. Capacity is released at most once per token; a
    /// second call fails with `InvalidStatusTransition`.
    pub async fn cancel(&self, token_id: &str) -> Result<Token> {
        if token_id.is_empty() {
            return Err(BookingError::Validation("token_id is required"));
        }
        let result = self
            .retry
            .retry_async(BookingError::is_retryable, |attempt| {
                self.try_cancel(token_id, attempt)
            })
            .await;
        match &result {
            Ok(token) => {
                self.metrics.inc_cancellations();
                info!("[booking] token {} cancelled", token.token_number);
            }
            Err(BookingError::ConcurrencyConflict { .. }) => {
                self.metrics.inc_conflicts_surfaced();
            }
            Err(_) => {}
        }
        result
    }

    async fn try_cancel(&self, token_id: &str, attempt: usize) -> Result<Token> {
        if attempt > 0 {
            self.metrics.inc_commit_retries();
        }

        let token = self
            .store
            .token(token_id)
            .map_err(|err| BookingError::from_store(err, attempt + 1))?;
        if token.status != TokenStatus::Pending {
            return Err(BookingError::InvalidStatusTransition {
                from: token.status,
                to: TokenStatus::Cancelled,
            });
        }

        let (token, slot) = self
            .store
            .commit_cancellation(token_id, token.version, Utc::now())
            .map_err(|err| BookingError::from_store(err, attempt + 1))?;
        if slot.is_none() {
            warn!(
                "[booking] slot {} gone while cancelling token {}; capacity not adjusted",
                token.slot_id, token.token_number
            );
        }

        self.notify(&token);
        Ok(token)
    }

    /// Staff-driven lifecycle step (`called`, `completed`). Cancellation
    /// is deliberately excluded: it releases slot capacity and must go
    /// through [`cancel`](Self::cancel).
    pub fn advance_status(&self, token_id: &str, target: TokenStatus) -> Result<Token> {
        if token_id.is_empty() {
            return Err(BookingError::Validation("token_id is required"));
        }
        if target == TokenStatus::Cancelled {
            return Err(BookingError::Validation(
                "cancellation must go through cancel() so slot capacity is released",
            ));
        }
        let token = self
            .store
            .transition_token(token_id, target, Utc::now())
            .map_err(|err| BookingError::from_store(err, 1))?;
        self.metrics.inc_transitions();
        info!(
            "[booking] token {} -> {}",
            token.token_number,
            target.label()
        );
        self.notify(&token);
        Ok(token)
    }

    /// Consumes the external slot-provisioning operation. The
    /// `(department, date, time)` triple must be unused.
    pub fn provision_slot(&self, new_slot: NewSlot) -> Result<Slot> {
        if new_slot.department_id.is_empty() {
            return Err(BookingError::Validation("department_id is required"));
        }
        if new_slot.slot_time.is_empty() {
            return Err(BookingError::Validation("slot_time is required"));
        }
        if new_slot.max_capacity == 0 {
            return Err(BookingError::Validation("max_capacity must be positive"));
        }
        let slot = Slot {
            id: uid_hex(&slot_uid(
                &new_slot.department_id,
                new_slot.date,
                &new_slot.slot_time,
            )),
            department_id: new_slot.department_id,
            date: new_slot.date,
            slot_time: new_slot.slot_time,
            max_capacity: new_slot.max_capacity,
            booked_count: 0,
            manual_block: false,
            blocked: false,
            version: 0,
            created_at: Utc::now(),
        };
        let slot = self
            .store
            .insert_slot(slot)
            .map_err(|err| BookingError::from_store(err, 1))?;
        info!(
            "[booking] slot {} provisioned for {} on {} ({} seats)",
            slot.id, slot.department_id, slot.date, slot.max_capacity
        );
        Ok(slot)
    }

    /// Operator block/unblock of a slot.
    pub fn set_manual_block(&self, slot_id: &str, blocked: bool) -> Result<Slot> {
        if slot_id.is_empty() {
            return Err(BookingError::Validation("slot_id is required"));
        }
        let slot = self
            .store
            .set_manual_block(slot_id, blocked)
            .map_err(|err| BookingError::from_store(err, 1))?;
        info!(
            "[booking] slot {} manual block set to {}",
            slot.id, blocked
        );
        Ok(slot)
    }

    pub fn slot(&self, slot_id: &str) -> Result<Slot> {
        self.store
            .slot(slot_id)
            .map_err(|err| BookingError::from_store(err, 1))
    }

    pub fn token(&self, token_id: &str) -> Result<Token> {
        self.store
            .token(token_id)
            .map_err(|err| BookingError::from_store(err, 1))
    }

    pub fn slots_for_department_date(&self, department_id: &str, date: NaiveDate) -> Vec<Slot> {
        self.store.slots_for_department_date(department_id, date)
    }

    pub fn user_tokens(&self, user_id: &str) -> Vec<Token> {
        self.store.user_tokens(user_id)
    }

    pub fn tokens_for_department_date(&self, department_id: &str, date: NaiveDate) -> Vec<Token> {
        self.store.tokens_for_date(Some(department_id), date)
    }

    pub fn tokens_for_date(&self, date: NaiveDate) -> Vec<Token> {
        self.store.tokens_for_date(None, date)
    }

    pub fn tokens_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<Token> {
        self.store.tokens_in_range(start, end)
    }
}

fn validate_booking_request(request: &BookingRequest) -> Result<()> {
    if request.user_id.is_empty() {
        return Err(BookingError::Validation("user_id is required"));
    }
    if request.department_id.is_empty() {
        return Err(BookingError::Validation("department_id is required"));
    }
    if request.department_code.is_empty() {
        return Err(BookingError::Validation("department_code is required"));
    }
    if request.slot_id.is_empty() {
        return Err(BookingError::Validation("slot_id is required"));
    }
    Ok(())
}
