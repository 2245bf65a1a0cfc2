//! Cooperative backoff on the Helix rate-limit bucket.
//!
//! Helix reports the remaining budget and the reset time with every
//! response. Before each query the governor looks at the most recent values
//! and, if the bucket is empty, sleeps inline until it refills.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use helix_api::RateLimit;
use tracing::info;

/// How long to hold off before the next request, if at all.
///
/// Returns `None` while budget remains or once the reset time has passed.
pub fn wait_duration(limit: &RateLimit, now: DateTime<Utc>) -> Option<Duration> {
    if limit.remaining > 0 {
        return None;
    }

    let wait_secs = limit.reset.saturating_sub(now.timestamp());
    if wait_secs > 0 {
        Some(Duration::from_secs(wait_secs as u64))
    } else {
        None
    }
}

/// Blocks the query path while the rate-limit budget is exhausted.
#[derive(Debug, Default)]
pub struct RateLimitGovernor {
    throttled: AtomicU64,
}

impl RateLimitGovernor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until a request may be issued.
    ///
    /// `limit` is the state from the most recent response; `None` (no response
    /// yet) proceeds immediately. Returns the duration waited. Never fails.
    pub async fn throttle(&self, limit: Option<RateLimit>) -> Duration {
        let Some(wait) = limit.and_then(|limit| wait_duration(&limit, Utc::now())) else {
            return Duration::ZERO;
        };

        info!(
            wait_secs = wait.as_secs(),
            "Waiting on rate limit to pass before sending next request"
        );
        self.throttled.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(wait).await;
        wait
    }

    /// Number of times a request has been held back.
    pub fn throttled_count(&self) -> u64 {
        self.throttled.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn limit(remaining: u32, reset: i64) -> RateLimit {
        RateLimit {
            limit: 800,
            remaining,
            reset,
        }
    }

    #[rstest]
    #[case::budget_left(5, 30, None)]
    #[case::budget_left_past_reset(1, -30, None)]
    #[case::exhausted(0, 30, Some(Duration::from_secs(30)))]
    #[case::exhausted_reset_now(0, 0, None)]
    #[case::exhausted_reset_passed(0, -5, None)]
    fn test_wait_duration(
        #[case] remaining: u32,
        #[case] reset_offset: i64,
        #[case] expected: Option<Duration>,
    ) {
        let now = Utc::now();
        let limit = limit(remaining, now.timestamp() + reset_offset);
        assert_eq!(wait_duration(&limit, now), expected);
    }

    #[rstest]
    #[case::far_past(i64::MIN, None)]
    #[case::far_future(i64::MAX, Some(Duration::from_secs((i64::MAX - 1_700_000_000) as u64)))]
    fn test_wait_duration_extreme_reset(#[case] reset: i64, #[case] expected: Option<Duration>) {
        let now = DateTime::<Utc>::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(wait_duration(&limit(0, reset), now), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_without_rate_limit_info() {
        let governor = RateLimitGovernor::new();
        let start = tokio::time::Instant::now();

        assert_eq!(governor.throttle(None).await, Duration::ZERO);
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(governor.throttled_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_with_budget_left() {
        let governor = RateLimitGovernor::new();
        let start = tokio::time::Instant::now();
        let reset = Utc::now().timestamp() + 60;

        assert_eq!(governor.throttle(Some(limit(10, reset))).await, Duration::ZERO);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_sleeps_until_reset() {
        let governor = RateLimitGovernor::new();
        let start = tokio::time::Instant::now();
        let reset = Utc::now().timestamp() + 5;

        let waited = governor.throttle(Some(limit(0, reset))).await;

        // Second granularity: the wall clock may tick over between the two reads.
        assert!(waited >= Duration::from_secs(4) && waited <= Duration::from_secs(5));
        assert!(start.elapsed() >= waited);
        assert_eq!(governor.throttled_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_reset_already_passed() {
        let governor = RateLimitGovernor::new();
        let reset = Utc::now().timestamp() - 1;

        assert_eq!(governor.throttle(Some(limit(0, reset))).await, Duration::ZERO);
        assert_eq!(governor.throttled_count(), 0);
    }
}
