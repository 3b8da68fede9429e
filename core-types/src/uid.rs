// Copyright (c) James Kassemi, SC, US. All rights reserved.

//! Deterministic 128-bit identifiers for slots and tokens.

use blake3::Hasher;
use chrono::{Datelike, NaiveDate};

pub const UID_LEN: usize = 16;
pub type SlotUid = [u8; UID_LEN];
pub type TokenUid = [u8; UID_LEN];

struct UidBuilder {
    hasher: Hasher,
}

impl UidBuilder {
    fn new(domain: &[u8]) -> Self {
        let mut hasher = Hasher::new();
        hasher.update(&(domain.len() as u32).to_le_bytes());
        hasher.update(domain);
        Self { hasher }
    }

    fn write_str(&mut self, value: &str) -> &mut Self {
        self.hasher.update(&(value.len() as u32).to_le_bytes());
        self.hasher.update(value.as_bytes());
        self
    }

    fn write_u32(&mut self, value: u32) -> &mut Self {
        self.hasher.update(&value.to_le_bytes());
        self
    }

    fn write_date(&mut self, value: NaiveDate) -> &mut Self {
        self.hasher.update(&value.num_days_from_ce().to_le_bytes());
        self
    }

    fn finish(self) -> [u8; UID_LEN] {
        let hash = self.hasher.finalize();
        let mut bytes = [0u8; UID_LEN];
        bytes.copy_from_slice(&hash.as_bytes()[..UID_LEN]);
        bytes
    }
}

/// Build a UID for a provisioned slot. The `(department, date, slot_time)`
/// triple is the slot's identity, so the uid doubles as a duplicate guard.
pub fn slot_uid(department_id: &str, date: NaiveDate, slot_time: &str) -> SlotUid {
    let mut builder = UidBuilder::new(b"slot_uid.v1");
    builder
        .write_str(department_id)
        .write_date(date)
        .write_str(slot_time);
    builder.finish()
}

/// Build a UID for a booked token. Serial numbers are unique per
/// `(department, date)`, which makes the uid unique engine-wide.
pub fn token_uid(department_id: &str, booking_date: NaiveDate, serial: u32, user_id: &str) -> TokenUid {
    let mut builder = UidBuilder::new(b"booking_token_uid.v1");
    builder
        .write_str(department_id)
        .write_date(booking_date)
        .write_u32(serial)
        .write_str(user_id);
    builder.finish()
}

/// Lowercase hex rendering used for record ids.
pub fn uid_hex(uid: &[u8; UID_LEN]) -> String {
    let mut out = String::with_capacity(UID_LEN * 2);
    for byte in uid {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
