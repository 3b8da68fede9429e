// Copyright (c) James Kassemi, SC, US. All rights reserved.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use parking_lot::RwLock;

use core_types::types::{Slot, Token, TokenStatus};

use crate::{
    error::StoreError,
    sequencer::{Serial, SerialKey},
};

/// All writes for one booking: the slot delta, the serial increment, and
/// the new token commit together or not at all.
#[derive(Debug)]
pub struct CommitBooking {
    pub slot_id: String,
    pub expected_slot_version: u32,
    pub serial_key: SerialKey,
    /// Serial value observed before the increment; a concurrent booking on
    /// the same department/date moves it and fails the commit.
    pub expected_serial: Serial,
    pub token: Token,
}

#[derive(Default)]
struct StoreInner {
    slots: HashMap<String, Slot>,
    /// `(department_id, date, slot_time)` identity index for duplicate
    /// provisioning checks.
    slot_keys: HashMap<(String, NaiveDate, String), String>,
    tokens: HashMap<String, Token>,
    serials: HashMap<SerialKey, Serial>,
}

/// In-memory persistence substrate for the booking engine: versioned slot
/// and token documents plus per-(department, date) serial counters.
///
/// One lock guards all three document families, which makes the
/// multi-document commits (`commit_booking`, `commit_cancellation`)
/// all-or-nothing by construction. Writers stage nothing: every method
/// validates its expected versions first and only then mutates. Readers
/// clone snapshots and never observe partial state.
pub struct BookingStore {
    inner: RwLock<StoreInner>,
}

impl BookingStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(StoreInner::default()),
        }
    }

    /// Adds a freshly provisioned slot; the `(department, date, time)`
    /// triple must be unused.
    pub fn insert_slot(&self, slot: Slot) -> Result<Slot, StoreError> {
        let mut inner = self.inner.write();
        let key = (
            slot.department_id.clone(),
            slot.date,
            slot.slot_time.clone(),
        );
        if inner.slot_keys.contains_key(&key) {
            return Err(StoreError::DuplicateSlot {
                department_id: slot.department_id,
                date: slot.date,
                slot_time: slot.slot_time,
            });
        }
        inner.slot_keys.insert(key, slot.id.clone());
        inner.slots.insert(slot.id.clone(), slot.clone());
        Ok(slot)
    }

    pub fn slot(&self, slot_id: &str) -> Result<Slot, StoreError> {
        let inner = self.inner.read();
        inner
            .slots
            .get(slot_id)
            .cloned()
            .ok_or_else(|| StoreError::SlotNotFound {
                slot_id: slot_id.to_string(),
            })
    }

    /// Operator block/unblock. Applied read-modify-write under the lock;
    /// re-derives the effective blocked flag.
    pub fn set_manual_block(&self, slot_id: &str, blocked: bool) -> Result<Slot, StoreError> {
        let mut inner = self.inner.write();
        let slot = inner
            .slots
            .get_mut(slot_id)
            .ok_or_else(|| StoreError::SlotNotFound {
                slot_id: slot_id.to_string(),
            })?;
        slot.manual_block = blocked;
        slot.recompute_blocked();
        slot.version += 1;
        Ok(slot.clone())
    }

    pub fn slots_for_department_date(&self, department_id: &str, date: NaiveDate) -> Vec<Slot> {
        let inner = self.inner.read();
        let mut slots: Vec<Slot> = inner
            .slots
            .values()
            .filter(|s| s.department_id == department_id && s.date == date)
            .cloned()
            .collect();
        slots.sort_by(|a, b| a.slot_time.cmp(&b.slot_time));
        slots
    }

    pub fn token(&self, token_id: &str) -> Result<Token, StoreError> {
        let inner = self.inner.read();
        inner
            .tokens
            .get(token_id)
            .cloned()
            .ok_or_else(|| StoreError::TokenNotFound {
                token_id: token_id.to_string(),
            })
    }

    /// Staff-driven status transition. Single-document: validates against
    /// the lifecycle table and never touches slot state.
    pub fn transition_token(
        &self,
        token_id: &str,
        target: TokenStatus,
        now: DateTime<Utc>,
    ) -> Result<Token, StoreError> {
        let mut inner = self.inner.write();
        let token = inner
            .tokens
            .get_mut(token_id)
            .ok_or_else(|| StoreError::TokenNotFound {
                token_id: token_id.to_string(),
            })?;
        if !token.status.can_transition(target) {
            return Err(StoreError::InvalidTransition {
                from: token.status,
                to: target,
            });
        }
        token.status = target;
        token.updated_at = Some(now);
        token.version += 1;
        Ok(token.clone())
    }

    /// Last serial committed for a department/date; zero before the first
    /// booking of the day.
    pub fn last_serial(&self, key: &SerialKey) -> Serial {
        let inner = self.inner.read();
        inner.serials.get(key).copied().unwrap_or(0)
    }

    /// The booking commit: checks both expected versions, then applies the
    /// slot increment, the serial increment, and the token insert under
    /// one critical section. Any failed check leaves everything untouched.
    pub fn commit_booking(&self, commit: CommitBooking) -> Result<(Slot, Token), StoreError> {
        let mut inner = self.inner.write();

        let slot_version = inner
            .slots
            .get(&commit.slot_id)
            .map(|s| s.version)
            .ok_or_else(|| StoreError::SlotNotFound {
                slot_id: commit.slot_id.clone(),
            })?;
        if slot_version != commit.expected_slot_version {
            return Err(StoreError::VersionConflict {
                doc: "slot",
                expected: commit.expected_slot_version,
                actual: slot_version,
            });
        }
        let serial = inner
            .serials
            .get(&commit.serial_key)
            .copied()
            .unwrap_or(0);
        if serial != commit.expected_serial {
            return Err(StoreError::VersionConflict {
                doc: "serial",
                expected: commit.expected_serial,
                actual: serial,
            });
        }

        let slot = inner
            .slots
            .get_mut(&commit.slot_id)
            .expect("slot checked above");
        slot.apply_booking();
        slot.version += 1;
        let slot = slot.clone();
        inner.serials.insert(commit.serial_key, serial + 1);
        inner
            .tokens
            .insert(commit.token.id.clone(), commit.token.clone());
        Ok((slot, commit.token))
    }

    /// The cancellation commit: CAS on the token version (double-cancel
    /// and cancel-vs-call races land here), then releases slot capacity
    /// and marks the token cancelled in one critical section. A missing
    /// slot is tolerated; the token is still cancelled.
    pub fn commit_cancellation(
        &self,
        token_id: &str,
        expected_token_version: u32,
        now: DateTime<Utc>,
    ) -> Result<(Token, Option<Slot>), StoreError> {
        let mut inner = self.inner.write();

        let (token_version, slot_id) = inner
            .tokens
            .get(token_id)
            .map(|t| (t.version, t.slot_id.clone()))
            .ok_or_else(|| StoreError::TokenNotFound {
                token_id: token_id.to_string(),
            })?;
        if token_version != expected_token_version {
            return Err(StoreError::VersionConflict {
                doc: "token",
                expected: expected_token_version,
                actual: token_version,
            });
        }

        let slot = inner.slots.get_mut(&slot_id).map(|slot| {
            slot.release_booking();
            slot.version += 1;
            slot.clone()
        });

        let token = inner.tokens.get_mut(token_id).expect("token checked above");
        token.status = TokenStatus::Cancelled;
        token.updated_at = Some(now);
        token.version += 1;
        Ok((token.clone(), slot))
    }

    /// A user's booking history, newest first.
    pub fn user_tokens(&self, user_id: &str) -> Vec<Token> {
        let inner = self.inner.read();
        let mut tokens: Vec<Token> = inner
            .tokens
            .values()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        tokens.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        tokens
    }

    /// Tokens for one booking day in arrival order, optionally narrowed to
    /// a department.
    pub fn tokens_for_date(&self, department_id: Option<&str>, date: NaiveDate) -> Vec<Token> {
        let inner = self.inner.read();
        let mut tokens: Vec<Token> = inner
            .tokens
            .values()
            .filter(|t| t.booking_date == date)
            .filter(|t| department_id.map_or(true, |d| t.department_id == d))
            .cloned()
            .collect();
        tokens.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        tokens
    }

    /// Report/export feed: every token whose booking date falls inside the
    /// inclusive range, ordered by booking date then arrival.
    pub fn tokens_in_range(&self, start: NaiveDate, end: NaiveDate) -> Vec<Token> {
        let inner = self.inner.read();
        let mut tokens: Vec<Token> = inner
            .tokens
            .values()
            .filter(|t| t.booking_date >= start && t.booking_date <= end)
            .cloned()
            .collect();
        tokens.sort_by(|a, b| {
            a.booking_date
                .cmp(&b.booking_date)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.id.cmp(&b.id))
        });
        tokens
    }
}

impl Default for BookingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
    }

    fn slot(id: &str, capacity: u32) -> Slot {
        Slot {
            id: id.to_string(),
            department_id: "dept-1".to_string(),
            date: date(),
            slot_time: "09:00-09:30".to_string(),
            max_capacity: capacity,
            booked_count: 0,
            manual_block: false,
            blocked: false,
            version: 0,
            created_at: Utc::now(),
        }
    }

    fn token(id: &str, slot_id: &str) -> Token {
        Token {
            id: id.to_string(),
            user_id: "user-1".to_string(),
            user_name: "Asha".to_string(),
            department_id: "dept-1".to_string(),
            department_name: "RTO Office".to_string(),
            slot_id: slot_id.to_string(),
            slot_time: "09:00-09:30".to_string(),
            booking_date: date(),
            token_number: "RTO-2026-001".to_string(),
            status: TokenStatus::Pending,
            verification_payload: String::new(),
            version: 0,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    fn commit(store: &BookingStore, slot_id: &str, token_id: &str) -> Result<(), StoreError> {
        let slot = store.slot(slot_id)?;
        let key = SerialKey::new("dept-1", date());
        let serial = store.last_serial(&key);
        store.commit_booking(CommitBooking {
            slot_id: slot_id.to_string(),
            expected_slot_version: slot.version,
            serial_key: key,
            expected_serial: serial,
            token: token(token_id, slot_id),
        })?;
        Ok(())
    }

    #[test]
    fn duplicate_slot_identity_rejected() {
        let store = BookingStore::new();
        store.insert_slot(slot("s1", 5)).unwrap();
        let mut dup = slot("s2", 5);
        dup.id = "s2".to_string();
        let err = store.insert_slot(dup).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateSlot { .. }));
    }

    #[test]
    fn booking_commit_moves_slot_serial_and_token_together() {
        let store = BookingStore::new();
        store.insert_slot(slot("s1", 2)).unwrap();

        commit(&store, "s1", "t1").unwrap();
        let slot = store.slot("s1").unwrap();
        assert_eq!(slot.booked_count, 1);
        assert_eq!(slot.version, 1);
        assert_eq!(store.last_serial(&SerialKey::new("dept-1", date())), 1);
        assert!(store.token("t1").is_ok());
    }

    #[test]
    fn stale_slot_version_conflicts_without_side_effects() {
        let store = BookingStore::new();
        store.insert_slot(slot("s1", 2)).unwrap();
        commit(&store, "s1", "t1").unwrap();

        let err = store
            .commit_booking(CommitBooking {
                slot_id: "s1".to_string(),
                expected_slot_version: 0, // stale read
                serial_key: SerialKey::new("dept-1", date()),
                expected_serial: 1,
                token: token("t2", "s1"),
            })
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::VersionConflict { doc: "slot", .. }
        ));
        assert_eq!(store.slot("s1").unwrap().booked_count, 1);
        assert!(store.token("t2").is_err(), "no partial commit");
        assert_eq!(store.last_serial(&SerialKey::new("dept-1", date())), 1);
    }

    #[test]
    fn stale_serial_conflicts_even_with_fresh_slot() {
        let store = BookingStore::new();
        store.insert_slot(slot("s1", 5)).unwrap();
        commit(&store, "s1", "t1").unwrap();

        let slot_doc = store.slot("s1").unwrap();
        let err = store
            .commit_booking(CommitBooking {
                slot_id: "s1".to_string(),
                expected_slot_version: slot_doc.version,
                serial_key: SerialKey::new("dept-1", date()),
                expected_serial: 0, // another booking already took serial 1
                token: token("t2", "s1"),
            })
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::VersionConflict { doc: "serial", .. }
        ));
    }

    #[test]
    fn cancellation_requires_current_token_version() {
        let store = BookingStore::new();
        store.insert_slot(slot("s1", 2)).unwrap();
        commit(&store, "s1", "t1").unwrap();

        let (cancelled, touched_slot) = store
            .commit_cancellation("t1", 0, Utc::now())
            .unwrap();
        assert_eq!(cancelled.status, TokenStatus::Cancelled);
        assert!(cancelled.updated_at.is_some());
        assert_eq!(touched_slot.unwrap().booked_count, 0);

        // Second attempt sees the bumped version.
        let err = store.commit_cancellation("t1", 0, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            StoreError::VersionConflict { doc: "token", .. }
        ));
    }

    #[test]
    fn cancellation_tolerates_missing_slot() {
        let store = BookingStore::new();
        let mut orphan = token("t1", "gone");
        orphan.version = 0;
        store.inner.write().tokens.insert("t1".to_string(), orphan);

        let (cancelled, touched_slot) = store
            .commit_cancellation("t1", 0, Utc::now())
            .unwrap();
        assert_eq!(cancelled.status, TokenStatus::Cancelled);
        assert!(touched_slot.is_none());
    }

    #[test]
    fn transition_enforces_lifecycle_table() {
        let store = BookingStore::new();
        store.insert_slot(slot("s1", 2)).unwrap();
        commit(&store, "s1", "t1").unwrap();

        let called = store
            .transition_token("t1", TokenStatus::Called, Utc::now())
            .unwrap();
        assert_eq!(called.status, TokenStatus::Called);

        let err = store
            .transition_token("t1", TokenStatus::Called, Utc::now())
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidTransition { .. }));

        store
            .transition_token("t1", TokenStatus::Completed, Utc::now())
            .unwrap();
        let err = store
            .transition_token("t1", TokenStatus::Completed, Utc::now())
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::InvalidTransition {
                from: TokenStatus::Completed,
                ..
            }
        ));
    }

    #[test]
    fn transition_never_touches_slot_state() {
        let store = BookingStore::new();
        store.insert_slot(slot("s1", 2)).unwrap();
        commit(&store, "s1", "t1").unwrap();
        let before = store.slot("s1").unwrap();

        store
            .transition_token("t1", TokenStatus::Called, Utc::now())
            .unwrap();
        assert_eq!(store.slot("s1").unwrap(), before);
    }

    #[test]
    fn queries_sort_as_documented() {
        let store = BookingStore::new();
        store.insert_slot(slot("s1", 10)).unwrap();
        for id in ["t1", "t2", "t3"] {
            commit(&store, "s1", id).unwrap();
        }

        let day = store.tokens_for_date(Some("dept-1"), date());
        assert_eq!(day.len(), 3);
        assert!(day.windows(2).all(|w| w[0].created_at <= w[1].created_at));

        let mine = store.user_tokens("user-1");
        assert_eq!(mine.len(), 3);
        assert!(mine.windows(2).all(|w| w[0].created_at >= w[1].created_at));

        assert_eq!(store.tokens_for_date(Some("dept-2"), date()).len(), 0);
        assert_eq!(store.tokens_in_range(date(), date()).len(), 3);
    }
}
