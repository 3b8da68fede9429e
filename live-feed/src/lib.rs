//! Push subscription layer for the live token display.
//!
//! [`FeedHub`] ingests committed token changes from the booking engine and
//! maintains, per `(scope, date)`, the "now serving" token and the day
//! roster. Display clients follow either through cancellable
//! subscriptions; each subscriber buffers only the latest value.

pub mod hub;
pub mod metrics;
pub mod subscription;

pub use hub::{FeedHub, FeedKey, FeedScope};
pub use metrics::{FeedMetrics, FeedMetricsSnapshot};
pub use subscription::FeedSubscription;
