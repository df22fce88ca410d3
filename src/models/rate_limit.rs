use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome of a single fixed-window check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RateLimitDecision {
    /// Request is allowed
    Allowed,
    /// Request exceeded the window's limit
    Blocked,
}

impl RateLimitDecision {
    pub fn is_allowed(self) -> bool {
        self == RateLimitDecision::Allowed
    }
}

/// Remaining allowance for a key, for display and debugging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitInfo {
    /// Requests left in the current window
    pub remaining: u64,
    /// Estimated window reset; `None` when no window is active
    pub reset_at: Option<DateTime<Utc>>,
}

impl RateLimitInfo {
    /// Reset time as epoch milliseconds, 0 when no window is active.
    pub fn reset_millis(&self) -> i64 {
        self.reset_at.map_or(0, |t| t.timestamp_millis())
    }
}

/// Rate limit key: the network origin plus the action being limited.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct RateLimitKey(String);

impl RateLimitKey {
    pub fn new(origin: &str, action: &str) -> Self {
        RateLimitKey(format!("{origin}:{action}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RateLimitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_key_joins_origin_and_action() {
        let key = RateLimitKey::new("203.0.113.7", "submit");
        assert_eq!(key.as_str(), "203.0.113.7:submit");
    }

    #[test]
    fn test_reset_millis() {
        let none = RateLimitInfo {
            remaining: 5,
            reset_at: None,
        };
        assert_eq!(none.reset_millis(), 0);

        let at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let some = RateLimitInfo {
            remaining: 0,
            reset_at: Some(at),
        };
        assert_eq!(some.reset_millis(), 1_700_000_000_000);
    }
}
