use config::{Config, ConfigError};
use serde::{Deserialize, Serialize};

use crate::retry::RetryPolicy;

/// Engine configuration with key knobs for the booking and feed layers.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DeskConfig {
    pub booking: BookingConfig,
    pub feed: FeedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// Bounded optimistic-commit retries before ConcurrencyConflict
    /// surfaces to the caller.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    #[serde(default = "default_jitter_pct")]
    pub jitter_pct: f64,
    /// Minimum zero-padded width of the serial inside a token number.
    #[serde(default = "default_serial_width")]
    pub serial_width: usize,
}

fn default_max_attempts() -> usize {
    5
}

fn default_base_delay_ms() -> u64 {
    2
}

fn default_max_delay_ms() -> u64 {
    50
}

fn default_jitter_pct() -> f64 {
    0.25
}

fn default_serial_width() -> usize {
    3
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_pct: default_jitter_pct(),
            serial_width: default_serial_width(),
        }
    }
}

impl BookingConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            self.base_delay_ms,
            self.max_delay_ms,
            self.jitter_pct,
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Whether the hub also maintains per-day roster topics in addition to
    /// the current-called topics.
    #[serde(default = "default_roster_enabled")]
    pub roster_enabled: bool,
}

fn default_roster_enabled() -> bool {
    true
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            roster_enabled: default_roster_enabled(),
        }
    }
}

impl DeskConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(config::File::with_name("tokendesk.toml").required(false))
            .add_source(config::Environment::with_prefix("DESK").separator("__"))
            .build()?;
        let config: Self = settings.try_deserialize()?;
        if config.booking.max_attempts == 0 {
            return Err(ConfigError::Message(
                "booking.max_attempts must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }
}
