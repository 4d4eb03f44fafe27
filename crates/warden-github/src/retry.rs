//! Bounded retry for GitHub API calls.
//!
//! Up to [`RetryPolicy::max_attempts`] attempts with a jittered, exponential
//! delay clamped to `[min_delay_ms, max_delay_ms]`. Errors whose
//! [`GithubApiError::is_permanent`] is true end the loop after the attempt
//! that produced them; exhausting the budget surfaces the last error as-is.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::GithubApiError;

pub const DEFAULT_RETRY_MAX_ATTEMPTS: usize = 3;
pub const DEFAULT_RETRY_MIN_DELAY_MS: u64 = 1_000;
pub const DEFAULT_RETRY_MAX_DELAY_MS: u64 = 5_000;

static JITTER_COUNTER: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_RETRY_MAX_ATTEMPTS,
            min_delay_ms: DEFAULT_RETRY_MIN_DELAY_MS,
            max_delay_ms: DEFAULT_RETRY_MAX_DELAY_MS,
        }
    }
}

fn jitter_sample(width: u64) -> u64 {
    if width == 0 {
        return 0;
    }
    let seed = JITTER_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mixed = seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).rotate_left(17) ^ 0xA24B_AED4_963E_E407;
    mixed % width.saturating_add(1)
}

impl RetryPolicy {
    fn ceiling_ms(&self) -> u64 {
        self.max_delay_ms.max(self.min_delay_ms)
    }

    /// Delay before the attempt that follows `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: usize, retry_after_ms: Option<u64>) -> Duration {
        let floor = self.min_delay_ms;
        let ceiling = self.ceiling_ms();
        let shift = attempt.saturating_sub(1).min(6) as u32;
        let exponential = floor.saturating_mul(1_u64 << shift).min(ceiling);
        // Jitter in [50%, 100%] of the exponential step, never below the floor.
        let low = (exponential / 2).max(floor);
        let jittered = low.saturating_add(jitter_sample(exponential.saturating_sub(low)));
        let delay = match retry_after_ms {
            Some(retry_after_ms) => jittered.max(retry_after_ms),
            None => jittered,
        };
        Duration::from_millis(delay.clamp(floor, ceiling))
    }
}

/// Runs `attempt_fn` under `policy`. The closure receives the 1-based
/// attempt number.
pub async fn run_with_retry<T, F, Fut>(
    policy: &RetryPolicy,
    operation: &str,
    mut attempt_fn: F,
) -> Result<T, GithubApiError>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, GithubApiError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 0_usize;
    loop {
        attempt = attempt.saturating_add(1);
        let error = match attempt_fn(attempt).await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation, attempt, "github request succeeded after retry");
                }
                return Ok(value);
            }
            Err(error) => error,
        };
        if error.is_permanent() {
            warn!(operation, attempt, error = %error, "permanent github failure, not retrying");
            return Err(error);
        }
        if attempt >= max_attempts {
            warn!(operation, attempt, error = %error, "github retry budget exhausted");
            return Err(error);
        }
        let delay = policy.delay_for_attempt(attempt, error.retry_after_ms());
        warn!(
            operation,
            attempt,
            delay_ms = delay.as_millis() as u64,
            error = %error,
            "transient github failure, retrying"
        );
        tokio::time::sleep(delay).await;
    }
}
