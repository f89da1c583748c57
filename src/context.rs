//! Request-scoped context and time source
//!
//! Every service call takes a [`RequestContext`]: the owner id handed over by
//! the identity layer plus a deadline. Storage implementations check the
//! deadline before doing any work, so an operation that overruns fails with
//! [`SpendError::Timeout`] instead of blocking the caller.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::error::{SpendError, SpendResult};
use crate::models::UserId;

/// Default time budget for a single operation
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_millis(3000);

/// Owner identity and deadline for one unit of work
#[derive(Debug, Clone)]
pub struct RequestContext {
    owner: UserId,
    timeout: Duration,
    deadline: Instant,
}

impl RequestContext {
    /// Start a unit of work for `owner` that must finish within `timeout`
    pub fn new(owner: UserId, timeout: Duration) -> Self {
        Self {
            owner,
            timeout,
            deadline: Instant::now() + timeout,
        }
    }

    pub fn with_default_timeout(owner: UserId) -> Self {
        Self::new(owner, DEFAULT_OPERATION_TIMEOUT)
    }

    pub fn owner(&self) -> &UserId {
        &self.owner
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Fail with `Timeout` if the deadline has passed
    pub fn ensure_live(&self, operation: &'static str) -> SpendResult<()> {
        if self.is_expired() {
            tracing::warn!(
                owner = %self.owner,
                operation,
                timeout_ms = self.timeout.as_millis() as u64,
                "operation deadline exceeded"
            );
            return Err(self.timeout_error(operation));
        }
        Ok(())
    }

    pub fn timeout_error(&self, operation: &'static str) -> SpendError {
        SpendError::Timeout {
            operation,
            timeout_ms: self.timeout.as_millis() as u64,
        }
    }
}

/// Clock abstracts access to the current timestamp so services remain
/// deterministic in tests.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Real-time clock backed by the system UTC time source.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for tests and replays
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn alice() -> UserId {
        UserId::new("alice").unwrap()
    }

    #[test]
    fn test_live_context_passes() {
        let ctx = RequestContext::with_default_timeout(alice());
        assert!(ctx.ensure_live("test").is_ok());
        assert_eq!(ctx.owner().as_str(), "alice");
    }

    #[test]
    fn test_zero_timeout_expires_immediately() {
        let ctx = RequestContext::new(alice(), Duration::ZERO);
        let err = ctx.ensure_live("insert_expense").unwrap_err();
        assert!(err.is_timeout());
    }

    #[test]
    fn test_fixed_clock_advances() {
        let start = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let clock = FixedClock::new(start);
        clock.advance(chrono::Duration::days(2));
        assert_eq!(clock.now(), start + chrono::Duration::days(2));
    }
}
