#![allow(dead_code)] // each test binary uses a subset of these helpers

use chrono::NaiveDate;
use tokendesk::{BookingConfig, BookingRequest, DeskConfig, NewSlot, Slot, TokenDesk};

pub fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
}

pub fn desk() -> TokenDesk {
    TokenDesk::with_defaults()
}

/// Engine with a deep retry budget for contention tests: assertions there
/// are about capacity and serial invariants, not retry exhaustion.
pub fn contended_desk() -> TokenDesk {
    TokenDesk::new(DeskConfig {
        booking: BookingConfig {
            max_attempts: 32,
            base_delay_ms: 1,
            max_delay_ms: 4,
            jitter_pct: 0.25,
            serial_width: 3,
        },
        feed: Default::default(),
    })
}

pub fn provision(desk: &TokenDesk, slot_time: &str, capacity: u32) -> Slot {
    desk.provision_slot(NewSlot {
        department_id: "dept-1".to_string(),
        date: date(),
        slot_time: slot_time.to_string(),
        max_capacity: capacity,
    })
    .expect("provision slot")
}

pub fn request(slot_id: &str, user_id: &str) -> BookingRequest {
    BookingRequest {
        user_id: user_id.to_string(),
        user_name: format!("Citizen {user_id}"),
        department_id: "dept-1".to_string(),
        department_code: "rto".to_string(),
        department_name: "RTO Office".to_string(),
        slot_id: slot_id.to_string(),
        booking_date: date(),
    }
}
