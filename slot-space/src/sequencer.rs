//! Serial allocation for human-readable token numbers.
//!
//! Serials are monotonically increasing per `(department, date)`, starting
//! at 1, and are consumed inside the booking commit itself: the counter is
//! compare-and-swapped alongside the slot version, so two concurrent
//! bookings can never mint the same number.

use chrono::{Datelike, NaiveDate};

pub type Serial = u32;

/// Counter identity: one serial sequence per department per booking day.
#[derive(Clone, Debug, Hash, PartialEq, Eq)]
pub struct SerialKey {
    pub department_id: String,
    pub date: NaiveDate,
}

impl SerialKey {
    pub fn new(department_id: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            department_id: department_id.into(),
            date,
        }
    }
}

/// Public token number: `<CODE>-<YEAR>-<SERIAL>`, serial zero-padded to
/// `width` digits (wider serials keep all their digits, so numbers stay
/// unique past 10^width - 1 bookings).
pub fn compose_token_number(code: &str, date: NaiveDate, serial: Serial, width: usize) -> String {
    format!(
        "{}-{}-{:0width$}",
        code.to_uppercase(),
        date.year(),
        serial,
        width = width
    )
}
