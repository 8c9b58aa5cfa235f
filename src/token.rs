// Bearer-token cache for the flight-offer supplier

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

// Time source, swappable so token expiry and date checks can be tested
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

// Manually advanced clock for tests and simulations
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AccessToken {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

// Lifetime policy applied to freshly issued tokens
#[derive(Debug, Clone, Copy)]
pub struct TokenPolicy {
    // used when the supplier does not report `expires_in`
    pub default_lifetime: Duration,
    // subtracted from a reported `expires_in`
    pub refresh_margin: Duration,
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            default_lifetime: Duration::minutes(25),
            refresh_margin: Duration::minutes(5),
        }
    }
}

impl TokenPolicy {
    pub fn lifetime(&self, expires_in_secs: Option<i64>) -> Duration {
        match expires_in_secs {
            Some(secs) if secs > 0 => {
                let reported = Duration::seconds(secs);
                if reported > self.refresh_margin {
                    reported - self.refresh_margin
                } else {
                    Duration::zero()
                }
            }
            _ => self.default_lifetime,
        }
    }
}

// Holds at most one token. The lock is only taken for short reads and writes,
// never across a network call.
#[derive(Debug, Default)]
pub struct TokenCache {
    current: Mutex<Option<AccessToken>>,
}

impl TokenCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn valid_token(&self, now: DateTime<Utc>) -> Option<String> {
        self.current
            .lock()
            .as_ref()
            .filter(|token| token.is_valid_at(now))
            .map(|token| token.token.clone())
    }

    pub fn store(&self, token: AccessToken) {
        *self.current.lock() = Some(token);
    }

    pub fn invalidate(&self) {
        *self.current.lock() = None;
    }

    pub fn snapshot(&self) -> Option<AccessToken> {
        self.current.lock().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 15, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_policy_prefers_reported_lifetime() {
        let policy = TokenPolicy::default();

        assert_eq!(policy.lifetime(Some(1799)), Duration::seconds(1499));
        assert_eq!(policy.lifetime(Some(1800)), Duration::minutes(25));
        assert_eq!(policy.lifetime(None), Duration::minutes(25));
        assert_eq!(policy.lifetime(Some(0)), Duration::minutes(25));
        assert_eq!(policy.lifetime(Some(60)), Duration::zero());
    }

    #[test]
    fn test_cache_expiry_and_invalidation() {
        let clock = ManualClock::new(start());
        let cache = TokenCache::new();
        assert!(cache.valid_token(clock.now()).is_none());

        cache.store(AccessToken {
            token: "abc".to_string(),
            issued_at: clock.now(),
            expires_at: clock.now() + Duration::minutes(25),
        });
        assert_eq!(cache.valid_token(clock.now()).as_deref(), Some("abc"));

        clock.advance(Duration::minutes(24));
        assert!(cache.valid_token(clock.now()).is_some());

        clock.advance(Duration::minutes(1));
        assert!(cache.valid_token(clock.now()).is_none());
        // expired tokens stay visible for diagnostics until replaced
        assert!(cache.snapshot().is_some());

        cache.invalidate();
        assert!(cache.snapshot().is_none());
    }
}
