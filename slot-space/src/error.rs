use chrono::NaiveDate;
use thiserror::Error;

use core_types::types::TokenStatus;

pub type Result<T> = std::result::Result<T, BookingError>;

/// Failures raised by the versioned document store itself.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("slot {slot_id} not found")]
    SlotNotFound { slot_id: String },
    #[error("token {token_id} not found")]
    TokenNotFound { token_id: String },
    #[error("slot already provisioned for {department_id} on {date} at {slot_time}")]
    DuplicateSlot {
        department_id: String,
        date: NaiveDate,
        slot_time: String,
    },
    #[error("version conflict on {doc}: expected {expected}, actual {actual}")]
    VersionConflict {
        doc: &'static str,
        expected: u32,
        actual: u32,
    },
    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidTransition { from: TokenStatus, to: TokenStatus },
}

/// Caller-facing failures of the booking engine. `ConcurrencyConflict` is
/// the one recoverable kind: the caller may retry the whole request.
#[derive(Debug, Error)]
pub enum BookingError {
    #[error("slot {slot_id} not found")]
    SlotNotFound { slot_id: String },
    #[error("token {token_id} not found")]
    TokenNotFound { token_id: String },
    #[error("slot {slot_id} is blocked")]
    SlotBlocked { slot_id: String },
    #[error("slot {slot_id} is fully booked ({capacity} seats)")]
    SlotFull { slot_id: String, capacity: u32 },
    #[error("slot already provisioned for {department_id} on {date} at {slot_time}")]
    DuplicateSlot {
        department_id: String,
        date: NaiveDate,
        slot_time: String,
    },
    #[error("invalid status transition: {from:?} -> {to:?}")]
    InvalidStatusTransition { from: TokenStatus, to: TokenStatus },
    #[error("conflicting concurrent writes after {attempts} attempts")]
    ConcurrencyConflict { attempts: usize },
    #[error("invalid request: {0}")]
    Validation(&'static str),
}

impl BookingError {
    /// Only version conflicts are worth another optimistic attempt; every
    /// other kind is terminal for the request.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BookingError::ConcurrencyConflict { .. })
    }

    pub(crate) fn from_store(err: StoreError, attempts: usize) -> Self {
        match err {
            StoreError::SlotNotFound { slot_id } => BookingError::SlotNotFound { slot_id },
            StoreError::TokenNotFound { token_id } => BookingError::TokenNotFound { token_id },
            StoreError::DuplicateSlot {
                department_id,
                date,
                slot_time,
            } => BookingError::DuplicateSlot {
                department_id,
                date,
                slot_time,
            },
            StoreError::VersionConflict { .. } => BookingError::ConcurrencyConflict { attempts },
            StoreError::InvalidTransition { from, to } => {
                BookingError::InvalidStatusTransition { from, to }
            }
        }
    }
}
