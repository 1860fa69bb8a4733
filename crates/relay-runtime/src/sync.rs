//! Locking and timed waits.
//!
//! The mailbox blocks on a [`Condvar`] paired with a [`Mutex`]. Deadlines are
//! absolute points on the monotonic clock returned by [`now`], so a wait that
//! wakes spuriously resumes with the same deadline instead of restarting its
//! timeout.
//!
//! ```rust
//! use std::time::Duration;
//! use relay_runtime::sync::{Condvar, Mutex, now, wait_until};
//!
//! let lock = Mutex::new(false);
//! let ready = Condvar::new();
//!
//! let mut guard = lock.lock();
//! let deadline = now() + Duration::from_millis(5);
//! while !*guard {
//!     if !wait_until(&ready, &mut guard, deadline) {
//!         break; // timed out
//!     }
//! }
//! ```

use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

pub use parking_lot::{Condvar, Mutex, MutexGuard};

/// Returns the current point on the monotonic clock.
pub fn now() -> Instant {
    Instant::now()
}

/// Blocks on `condvar` until notified or until `deadline` passes.
///
/// Returns `false` if the deadline passed, `true` if the thread was woken.
/// Wakeups may be spurious; callers re-check their condition either way.
pub fn wait_until<T>(condvar: &Condvar, guard: &mut MutexGuard<'_, T>, deadline: Instant) -> bool {
    !condvar.wait_until(guard, deadline).timed_out()
}

/// Unit of a [`RelativeTimeout`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Seconds,
    #[default]
    Milliseconds,
    Microseconds,
}

impl TimeUnit {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Seconds => "s",
            Self::Milliseconds => "ms",
            Self::Microseconds => "us",
        }
    }
}

/// A timeout expressed as a count of some unit.
///
/// In TOML: `receive_timeout = { unit = "milliseconds", count = 250 }`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelativeTimeout {
    #[serde(default)]
    pub unit: TimeUnit,
    pub count: u64,
}

impl RelativeTimeout {
    pub const fn new(unit: TimeUnit, count: u64) -> Self {
        Self { unit, count }
    }

    pub const fn seconds(count: u64) -> Self {
        Self::new(TimeUnit::Seconds, count)
    }

    pub const fn milliseconds(count: u64) -> Self {
        Self::new(TimeUnit::Milliseconds, count)
    }

    pub const fn microseconds(count: u64) -> Self {
        Self::new(TimeUnit::Microseconds, count)
    }

    /// Returns true if the timeout expires immediately.
    pub fn is_zero(&self) -> bool {
        self.count == 0
    }

    pub fn to_duration(&self) -> Duration {
        match self.unit {
            TimeUnit::Seconds => Duration::from_secs(self.count),
            TimeUnit::Milliseconds => Duration::from_millis(self.count),
            TimeUnit::Microseconds => Duration::from_micros(self.count),
        }
    }

    /// Returns `start` advanced by this timeout, or `None` on clock overflow.
    pub fn deadline_from(&self, start: Instant) -> Option<Instant> {
        start.checked_add(self.to_duration())
    }
}

impl From<RelativeTimeout> for Duration {
    fn from(timeout: RelativeTimeout) -> Self {
        timeout.to_duration()
    }
}

impl fmt::Display for RelativeTimeout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.count, self.unit.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_wait_until_times_out() {
        let lock = Mutex::new(());
        let condvar = Condvar::new();
        let mut guard = lock.lock();

        let start = now();
        let deadline = start + Duration::from_millis(20);
        assert!(!wait_until(&condvar, &mut guard, deadline));
        assert!(now() >= deadline);
    }

    #[test]
    fn test_wait_until_past_deadline_returns_immediately() {
        let lock = Mutex::new(());
        let condvar = Condvar::new();
        let mut guard = lock.lock();
        assert!(!wait_until(&condvar, &mut guard, now()));
    }

    #[test]
    fn test_wait_until_woken() {
        let shared = Arc::new((Mutex::new(false), Condvar::new()));
        let remote = Arc::clone(&shared);

        let mut guard = shared.0.lock();
        let notifier = thread::spawn(move || {
            *remote.0.lock() = true;
            remote.1.notify_all();
        });

        let deadline = now() + Duration::from_secs(5);
        while !*guard {
            assert!(wait_until(&shared.1, &mut guard, deadline), "timed out");
        }
        drop(guard);
        notifier.join().unwrap();
    }

    #[test]
    fn test_relative_timeout_conversion() {
        assert_eq!(RelativeTimeout::seconds(2).to_duration(), Duration::from_secs(2));
        assert_eq!(
            RelativeTimeout::milliseconds(15).to_duration(),
            Duration::from_millis(15)
        );
        assert_eq!(
            Duration::from(RelativeTimeout::microseconds(7)),
            Duration::from_micros(7)
        );
        assert!(RelativeTimeout::default().is_zero());
        assert_eq!(RelativeTimeout::milliseconds(250).to_string(), "250ms");
    }

    #[test]
    fn test_deadline_from() {
        let start = now();
        let timeout = RelativeTimeout::milliseconds(100);
        assert_eq!(
            timeout.deadline_from(start),
            Some(start + Duration::from_millis(100))
        );
        assert_eq!(RelativeTimeout::seconds(u64::MAX).deadline_from(start), None);
    }
}
