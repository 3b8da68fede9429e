// Copyright (c) James Kassemi, SC, US. All rights reserved.

use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;

/// Jittered exponential backoff policy for optimistic-commit retries.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub jitter_pct: f64,
}

impl RetryPolicy {
    pub fn new(
        max_attempts: usize,
        base_delay_ms: u64,
        max_delay_ms: u64,
        jitter_pct: f64,
    ) -> Self {
        let clamped_attempts = max_attempts.max(1);
        let clamped_base = base_delay_ms.max(1);
        let clamped_max_delay = max_delay_ms.max(clamped_base);
        let clamped_jitter = jitter_pct.clamp(0.0, 1.0);
        Self {
            max_attempts: clamped_attempts,
            base_delay_ms: clamped_base,
            max_delay_ms: clamped_max_delay,
            jitter_pct: clamped_jitter,
        }
    }

    /// Defaults tuned for in-process version conflicts: contention on a
    /// single popular slot resolves in microseconds, so delays stay short.
    pub fn default_commit() -> Self {
        Self::new(5, 2, 50, 0.25)
    }

    fn next_delay(&self, attempt: usize) -> Duration {
        let exp = 2_u64.saturating_pow(attempt as u32);
        let mut delay = self.base_delay_ms.saturating_mul(exp);
        if delay > self.max_delay_ms {
            delay = self.max_delay_ms;
        }
        let jitter = if self.jitter_pct > 0.0 {
            let mut rng = rand::thread_rng();
            let spread = (delay as f64 * self.jitter_pct) as i64;
            let delta = rng.gen_range(-spread..=spread);
            delay.saturating_add_signed(delta)
        } else {
            delay
        };
        Duration::from_millis(jitter)
    }

    /// Drives `op` until it succeeds, fails with a non-retryable error, or
    /// the attempt budget is spent. The final error is returned as-is.
    pub async fn retry_async<F, Fut, T, E>(
        &self,
        is_retryable: impl Fn(&E) -> bool,
        mut op: F,
    ) -> Result<T, E>
    where
        F: FnMut(usize) -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            match op(attempt).await {
                Ok(val) => return Ok(val),
                Err(err) => {
                    attempt += 1;
                    if attempt >= self.max_attempts || !is_retryable(&err) {
                        return Err(err);
                    }
                    let delay = self.next_delay(attempt - 1);
                    sleep(delay).await;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::default_commit()
    }
}
