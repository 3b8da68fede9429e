// Copyright (c) James Kassemi, SC, US. All rights reserved.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Service lifecycle of a booked token.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenStatus {
    #[default]
    Pending = 0,
    Called = 1,
    Completed = 2,
    Cancelled = 3,
}

impl TokenStatus {
    pub const ALL: [Self; 4] = [
        TokenStatus::Pending,
        TokenStatus::Called,
        TokenStatus::Completed,
        TokenStatus::Cancelled,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TokenStatus::Pending => "pending",
            TokenStatus::Called => "called",
            TokenStatus::Completed => "completed",
            TokenStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TokenStatus::Completed | TokenStatus::Cancelled)
    }

    /// Transition table for staff-driven status changes. Same-state writes
    /// and writes out of a terminal state are rejected.
    pub fn can_transition(&self, target: TokenStatus) -> bool {
        matches!(
            (self, target),
            (TokenStatus::Pending, TokenStatus::Called)
                | (TokenStatus::Pending, TokenStatus::Cancelled)
                | (TokenStatus::Called, TokenStatus::Completed)
        )
    }
}

/// Department record consumed read-only from the external catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Department {
    pub id: String,
    pub code: String,
    pub name: String,
    pub location: String,
    pub active: bool,
}

/// Input to slot provisioning (an external administrative operation the
/// engine consumes as a constructor).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NewSlot {
    pub department_id: String,
    pub date: NaiveDate,
    pub slot_time: String,
    pub max_capacity: u32,
}

/// Fixed-capacity reservation unit for one department on one calendar day.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    pub id: String,
    pub department_id: String,
    pub date: NaiveDate,
    pub slot_time: String,
    pub max_capacity: u32,
    pub booked_count: u32,
    pub manual_block: bool,
    pub blocked: bool,
    pub version: u32,
    pub created_at: DateTime<Utc>,
}

impl Slot {
    pub fn has_capacity(&self) -> bool {
        self.booked_count < self.max_capacity
    }

    /// Counts one more booking against the slot and re-derives `blocked`.
    pub fn apply_booking(&mut self) {
        self.booked_count += 1;
        self.recompute_blocked();
    }

    /// Returns one booking's worth of capacity, floored at zero. The
    /// blocked flag is cleared outright; a standing manual block is not
    /// re-asserted on this path (`set_manual_block` re-derives it).
    pub fn release_booking(&mut self) {
        self.booked_count = self.booked_count.saturating_sub(1);
        self.blocked = false;
    }

    pub fn recompute_blocked(&mut self) {
        self.blocked = self.booked_count >= self.max_capacity || self.manual_block;
    }
}

/// A citizen's reservation against a slot, carrying the human-readable
/// sequence number and lifecycle status. Never physically deleted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub department_id: String,
    pub department_name: String,
    pub slot_id: String,
    pub slot_time: String,
    pub booking_date: NaiveDate,
    pub token_number: String,
    pub status: TokenStatus,
    pub verification_payload: String,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl Token {
    /// Recency key used by the live feed: `updated_at` when set, creation
    /// time otherwise.
    pub fn effective_updated_at(&self) -> DateTime<Utc> {
        self.updated_at.unwrap_or(self.created_at)
    }
}

/// Seam between the booking paths and the live feed. Invoked after every
/// committed token creation or mutation; implementations must not block.
pub trait TokenChangeSink: Send + Sync {
    fn token_changed(&self, token: &Token);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_table_is_closed() {
        use TokenStatus::*;
        let allowed = [(Pending, Called), (Pending, Cancelled), (Called, Completed)];
        for from in TokenStatus::ALL {
            for to in TokenStatus::ALL {
                let expect = allowed.contains(&(from, to));
                assert_eq!(from.can_transition(to), expect, "{from:?} -> {to:?}");
            }
        }
    }

    #[test]
    fn terminal_states_accept_nothing() {
        for from in [TokenStatus::Completed, TokenStatus::Cancelled] {
            assert!(from.is_terminal());
            for to in TokenStatus::ALL {
                assert!(!from.can_transition(to));
            }
        }
    }

    #[test]
    fn slot_blocks_at_capacity_and_releases() {
        let mut slot = Slot {
            id: "s1".to_string(),
            department_id: "d1".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            slot_time: "09:00-09:30".to_string(),
            max_capacity: 2,
            booked_count: 1,
            manual_block: false,
            blocked: false,
            version: 0,
            created_at: Utc::now(),
        };
        slot.apply_booking();
        assert_eq!(slot.booked_count, 2);
        assert!(slot.blocked);

        slot.release_booking();
        assert_eq!(slot.booked_count, 1);
        assert!(!slot.blocked);

        slot.release_booking();
        slot.release_booking();
        assert_eq!(slot.booked_count, 0, "release floors at zero");
    }

    #[test]
    fn manual_block_survives_recompute() {
        let mut slot = Slot {
            id: "s1".to_string(),
            department_id: "d1".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            slot_time: "09:00-09:30".to_string(),
            max_capacity: 5,
            booked_count: 0,
            manual_block: true,
            blocked: false,
            version: 0,
            created_at: Utc::now(),
        };
        slot.recompute_blocked();
        assert!(slot.blocked);
    }
}
