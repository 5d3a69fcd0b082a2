//! Retry/backoff helpers shared by the platform adapters. Facebook's chunked
//! upload uses a fixed short sleep; YouTube's resumable upload uses jittered
//! exponential backoff, both grounded on the retry-budget style used
//! elsewhere in this codebase's worker queue.

use rand::Rng;
use std::time::Duration;

pub const FACEBOOK_MAX_RETRIES: u32 = 5;
pub const FACEBOOK_RETRY_SLEEP: Duration = Duration::from_secs(2);
pub const FACEBOOK_CHUNK_TIMEOUT: Duration = Duration::from_secs(45);

pub const YOUTUBE_MAX_RETRIES: u32 = 10;

/// A uniform random duration in `[0, 2^retry)` seconds, per the resumable
/// upload's backoff contract.
pub fn youtube_backoff(retry: u32) -> Duration {
    let upper = 2_u64.saturating_pow(retry.min(32));
    if upper == 0 {
        return Duration::ZERO;
    }
    let jitter = rand::rng().random_range(0..upper);
    Duration::from_secs(jitter)
}

/// HTTP statuses the YouTube resumable upload treats as retryable.
pub fn is_youtube_retryable_status(status: u16) -> bool {
    matches!(status, 500 | 502 | 503 | 504)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn youtube_backoff_zero_retry_is_zero() {
        assert_eq!(youtube_backoff(0), Duration::ZERO);
    }

    #[test]
    fn youtube_backoff_stays_under_upper_bound() {
        for retry in 1..6 {
            let upper = 2_u64.pow(retry);
            for _ in 0..20 {
                let d = youtube_backoff(retry);
                assert!(d.as_secs() < upper, "retry {retry} produced {d:?}");
            }
        }
    }

    #[test]
    fn retryable_statuses_match_contract() {
        for status in [500, 502, 503, 504] {
            assert!(is_youtube_retryable_status(status));
        }
        for status in [400, 401, 403, 404, 429] {
            assert!(!is_youtube_retryable_status(status));
        }
    }
}
