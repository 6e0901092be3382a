//! Fixed-window request rate limiting
//!
//! Two windows per (token, client) pair: a minute window and an hour
//! window, keyed by the formatted UTC timestamp so buckets roll over
//! naturally. Check-then-increment: a rejected request does not consume
//! quota. Counter TTLs outlive their window slightly so a bucket is
//! readable for its whole lifetime but never leaks.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::cache::MemoryStore;
use crate::config::RateLimitConfig;
use crate::error::{CollegiumError, Result};

pub struct RateLimiter {
    store: Arc<MemoryStore>,
    per_minute: u64,
    per_hour: u64,
    minute_ttl: Duration,
    hour_ttl: Duration,
}

impl RateLimiter {
    pub fn new(store: Arc<MemoryStore>, config: &RateLimitConfig) -> Self {
        Self {
            store,
            per_minute: config.per_minute,
            per_hour: config.per_hour,
            minute_ttl: Duration::from_secs(config.minute_ttl_secs),
            hour_ttl: Duration::from_secs(config.hour_ttl_secs),
        }
    }

    /// Admit or reject a request at `now`. On admission both window
    /// counters are incremented.
    pub fn check(&self, token: &str, client_ip: &str, now: DateTime<Utc>) -> Result<()> {
        let minute_key = format!(
            "rl:min:{token}:{client_ip}:{}",
            now.format("%Y%m%d%H%M")
        );
        let hour_key = format!("rl:hr:{token}:{client_ip}:{}", now.format("%Y%m%d%H"));

        let minute_count = self.store.counter(&minute_key);
        if minute_count >= self.per_minute {
            return Err(CollegiumError::RateLimited(
                "per-minute limit reached".to_string(),
            ));
        }
        let hour_count = self.store.counter(&hour_key);
        if hour_count >= self.per_hour {
            return Err(CollegiumError::RateLimited(
                "per-hour limit reached".to_string(),
            ));
        }

        self.store
            .set_counter(&minute_key, minute_count + 1, self.minute_ttl);
        self.store
            .set_counter(&hour_key, hour_count + 1, self.hour_ttl);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn limiter(per_minute: u64, per_hour: u64) -> RateLimiter {
        RateLimiter::new(
            Arc::new(MemoryStore::new()),
            &RateLimitConfig {
                per_minute,
                per_hour,
                minute_ttl_secs: 70,
                hour_ttl_secs: 3700,
            },
        )
    }

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 10, minute, 0).unwrap()
    }

    #[test]
    fn test_minute_limit_boundary() {
        let limiter = limiter(120, 2000);
        let now = at(0);
        for _ in 0..120 {
            limiter.check("tok", "1.2.3.4", now).unwrap();
        }
        let err = limiter.check("tok", "1.2.3.4", now).unwrap_err();
        assert!(matches!(err, CollegiumError::RateLimited(_)));
    }

    #[test]
    fn test_new_minute_resets_window() {
        let limiter = limiter(2, 2000);
        limiter.check("tok", "1.2.3.4", at(0)).unwrap();
        limiter.check("tok", "1.2.3.4", at(0)).unwrap();
        assert!(limiter.check("tok", "1.2.3.4", at(0)).is_err());
        // Next minute, same hour: admitted again.
        limiter.check("tok", "1.2.3.4", at(1)).unwrap();
    }

    #[test]
    fn test_hour_limit_spans_minutes() {
        let limiter = limiter(10, 3);
        limiter.check("tok", "1.2.3.4", at(0)).unwrap();
        limiter.check("tok", "1.2.3.4", at(1)).unwrap();
        limiter.check("tok", "1.2.3.4", at(2)).unwrap();
        let err = limiter.check("tok", "1.2.3.4", at(3)).unwrap_err();
        assert!(err.to_string().contains("per-hour"));
    }

    #[test]
    fn test_clients_are_independent() {
        let limiter = limiter(1, 2000);
        limiter.check("tok", "1.1.1.1", at(0)).unwrap();
        limiter.check("tok", "2.2.2.2", at(0)).unwrap();
        assert!(limiter.check("tok", "1.1.1.1", at(0)).is_err());
    }

    #[test]
    fn test_rejection_consumes_no_quota() {
        let limiter = limiter(1, 2);
        limiter.check("tok", "1.2.3.4", at(0)).unwrap();
        // Rejected twice in the same minute; hour quota must not move.
        assert!(limiter.check("tok", "1.2.3.4", at(0)).is_err());
        assert!(limiter.check("tok", "1.2.3.4", at(0)).is_err());
        // Second admitted request exhausts the hour quota of 2.
        limiter.check("tok", "1.2.3.4", at(1)).unwrap();
        assert!(limiter.check("tok", "1.2.3.4", at(2)).is_err());
    }
}
