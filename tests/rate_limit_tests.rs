// Integration tests for fixed-window rate limiting
//
// Windows are driven by a manual clock shared with the in-process store.

use adjective_tally::clock::ManualClock;
use adjective_tally::config::RateLimitRule;
use adjective_tally::models::{RateLimitDecision, RateLimitKey};
use adjective_tally::security::RateLimiter;
use adjective_tally::storage::{MemoryStore, StoreHandles};
use chrono::{Duration, TimeZone, Utc};
use std::sync::Arc;

fn setup() -> (RateLimiter, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
    ));
    let handles = StoreHandles::from_store(Arc::new(MemoryStore::with_clock(clock.clone())));
    let limiter = RateLimiter::new(handles.rate_limits).with_clock(clock.clone());
    (limiter, clock)
}

#[tokio::test]
async fn test_sixth_call_in_window_is_blocked() {
    let (limiter, clock) = setup();
    let key = RateLimitKey::new("198.51.100.4", "login");

    for _ in 0..5 {
        assert_eq!(limiter.check(&key, 5, 60).await, RateLimitDecision::Allowed);
        clock.advance(Duration::seconds(5));
    }
    assert_eq!(limiter.check(&key, 5, 60).await, RateLimitDecision::Blocked);
}

#[tokio::test]
async fn test_window_elapses_and_counter_resets() {
    let (limiter, clock) = setup();
    let key = RateLimitKey::new("198.51.100.4", "login");

    for _ in 0..6 {
        limiter.check(&key, 5, 60).await;
    }
    assert_eq!(limiter.info(&key, 5).await.remaining, 0);

    clock.advance(Duration::seconds(60));
    assert_eq!(limiter.check(&key, 5, 60).await, RateLimitDecision::Allowed);
    assert_eq!(limiter.info(&key, 5).await.remaining, 4);
}

#[tokio::test]
async fn test_window_is_not_extended_by_later_hits() {
    let (limiter, clock) = setup();
    let key = RateLimitKey::new("198.51.100.4", "submit");

    limiter.check(&key, 10, 60).await;
    clock.advance(Duration::seconds(45));
    limiter.check(&key, 10, 60).await;

    let info = limiter.info(&key, 10).await;
    assert_eq!(info.remaining, 8);
    assert_eq!(
        info.reset_at,
        Some(Utc.with_ymd_and_hms(2024, 5, 1, 9, 31, 0).unwrap())
    );
}

#[tokio::test]
async fn test_configured_rules() {
    let (limiter, _clock) = setup();
    let key = RateLimitKey::new("198.51.100.4", "submit");
    let rule = RateLimitRule::new(2, 30);

    assert!(limiter.check_rule(&key, &rule).await.is_allowed());
    assert!(limiter.check_rule(&key, &rule).await.is_allowed());
    assert!(!limiter.check_rule(&key, &rule).await.is_allowed());
}

#[tokio::test]
async fn test_no_window_reports_zero_reset() {
    let (limiter, _clock) = setup();
    let info = limiter.info(&RateLimitKey::new("198.51.100.4", "submit"), 10).await;

    assert_eq!(info.remaining, 10);
    assert_eq!(info.reset_millis(), 0);
}
