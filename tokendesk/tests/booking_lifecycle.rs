mod common;

use chrono::NaiveDate;
use common::{date, desk, provision, request};
use tokendesk::{BookingError, NewSlot, TokenStatus};

#[tokio::test]
async fn nearly_full_slot_books_to_capacity_and_blocks() {
    let desk = desk();
    let slot = provision(&desk, "09:00-09:30", 10);

    for i in 1..=9 {
        desk.book(request(&slot.id, &format!("user-{i}"))).await.unwrap();
    }
    let at_nine = desk
        .slots_for_department_date("dept-1", date())
        .pop()
        .unwrap();
    assert_eq!(at_nine.booked_count, 9);
    assert!(!at_nine.blocked);

    let last = desk.book(request(&slot.id, "user-10")).await.unwrap();
    assert_eq!(last.token_number, "RTO-2026-010");

    let full = desk
        .slots_for_department_date("dept-1", date())
        .pop()
        .unwrap();
    assert_eq!(full.booked_count, 10);
    assert!(full.blocked);
}

#[tokio::test]
async fn full_slot_rejects_with_no_side_effects() {
    let desk = desk();
    let slot = provision(&desk, "09:00-09:30", 2);
    desk.book(request(&slot.id, "user-1")).await.unwrap();
    desk.book(request(&slot.id, "user-2")).await.unwrap();

    let err = desk.book(request(&slot.id, "user-3")).await.unwrap_err();
    assert!(matches!(err, BookingError::SlotFull { capacity: 2, .. }));

    assert_eq!(desk.tokens_for_date(date()).len(), 2, "no token created");
    let unchanged = desk
        .slots_for_department_date("dept-1", date())
        .pop()
        .unwrap();
    assert_eq!(unchanged.booked_count, 2);
}

#[tokio::test]
async fn cancel_frees_the_seat_and_rebooking_mints_a_fresh_serial() {
    let desk = desk();
    let slot = provision(&desk, "09:00-09:30", 1);

    let first = desk.book(request(&slot.id, "user-1")).await.unwrap();
    assert_eq!(first.token_number, "RTO-2026-001");

    desk.cancel(&first.id).await.unwrap();
    let freed = desk
        .slots_for_department_date("dept-1", date())
        .pop()
        .unwrap();
    assert_eq!(freed.booked_count, 0);
    assert!(!freed.blocked);

    let again = desk.book(request(&slot.id, "user-2")).await.unwrap();
    assert_eq!(again.token_number, "RTO-2026-002");

    let history = desk.tokens_for_date(date());
    assert_eq!(history.len(), 2, "cancelled token is retained for audit");
    assert_eq!(
        history
            .iter()
            .filter(|t| t.status == TokenStatus::Cancelled)
            .count(),
        1
    );
}

#[tokio::test]
async fn verification_payload_carries_the_public_identity() {
    let desk = desk();
    let slot = provision(&desk, "09:00-09:30", 5);
    let token = desk.book(request(&slot.id, "user-1")).await.unwrap();

    let payload: serde_json::Value = serde_json::from_str(&token.verification_payload).unwrap();
    assert_eq!(payload["token_id"], token.id.as_str());
    assert_eq!(payload["token_number"], token.token_number.as_str());
    assert_eq!(payload["user_id"], "user-1");
    assert_eq!(payload["department_id"], "dept-1");
}

#[tokio::test]
async fn serials_are_shared_across_a_departments_slots() {
    let desk = desk();
    let morning = provision(&desk, "09:00-09:30", 5);
    let noon = provision(&desk, "12:00-12:30", 5);

    let a = desk.book(request(&morning.id, "user-1")).await.unwrap();
    let b = desk.book(request(&noon.id, "user-2")).await.unwrap();
    let c = desk.book(request(&morning.id, "user-3")).await.unwrap();

    assert_eq!(a.token_number, "RTO-2026-001");
    assert_eq!(b.token_number, "RTO-2026-002");
    assert_eq!(c.token_number, "RTO-2026-003");
}

#[tokio::test]
async fn history_queries_sort_for_their_consumers() {
    let desk = desk();
    let day_one = date();
    let day_two = NaiveDate::from_ymd_opt(2026, 3, 3).unwrap();
    let slot_one = provision(&desk, "09:00-09:30", 5);
    let slot_two = desk
        .provision_slot(NewSlot {
            department_id: "dept-1".to_string(),
            date: day_two,
            slot_time: "09:00-09:30".to_string(),
            max_capacity: 5,
        })
        .unwrap();

    desk.book(request(&slot_one.id, "user-1")).await.unwrap();
    let mut later = request(&slot_two.id, "user-1");
    later.booking_date = day_two;
    desk.book(later).await.unwrap();

    let mine = desk.user_tokens("user-1");
    assert_eq!(mine.len(), 2);
    assert_eq!(mine[0].booking_date, day_two, "newest booking first");

    let range = desk.tokens_in_range(day_one, day_two);
    assert_eq!(range.len(), 2);
    assert_eq!(range[0].booking_date, day_one, "range reads chronologically");

    assert_eq!(desk.tokens_in_range(day_two, day_two).len(), 1);
    assert_eq!(desk.tokens_for_department_date("dept-2", day_one).len(), 0);
}

#[tokio::test]
async fn slots_listing_orders_by_time_of_day() {
    let desk = desk();
    provision(&desk, "14:00-14:30", 5);
    provision(&desk, "09:00-09:30", 5);
    provision(&desk, "11:00-11:30", 5);

    let times: Vec<String> = desk
        .slots_for_department_date("dept-1", date())
        .into_iter()
        .map(|s| s.slot_time)
        .collect();
    assert_eq!(times, ["09:00-09:30", "11:00-11:30", "14:00-14:30"]);
}

#[tokio::test]
async fn metrics_reflect_the_traffic() {
    let desk = desk();
    let slot = provision(&desk, "09:00-09:30", 1);

    let token = desk.book(request(&slot.id, "user-1")).await.unwrap();
    let _ = desk.book(request(&slot.id, "user-2")).await.unwrap_err();
    desk.call(&token.id).unwrap();
    desk.complete(&token.id).unwrap();

    let metrics = desk.booking_metrics();
    assert_eq!(metrics.bookings, 1);
    assert_eq!(metrics.rejected_full, 1);
    assert_eq!(metrics.transitions, 2);
    assert_eq!(metrics.cancellations, 0);
}
