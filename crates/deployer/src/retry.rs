//! Bounded polling combinator.
//!
//! Both pollers (replica readiness, job completion) share one loop: run a
//! check, stop on success, otherwise sleep a fixed interval, until the
//! deadline measured from loop entry has elapsed. Time comes from an injected
//! [`Clock`] so tests run against virtual time.

use std::future::Future;
use std::time::Duration;

use gridrun_core::clock::Clock;

/// Result of a single check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attempt<T> {
    /// Condition met; stop polling with this value.
    Done(T),
    /// Not yet; sleep and check again.
    Pending,
}

/// The deadline passed before any check reported `Done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeadlineExceeded {
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Runs `check` until it returns [`Attempt::Done`] or `deadline` elapses.
///
/// A check starts only while elapsed time is strictly below the deadline. The
/// closure receives the 1-based attempt number.
pub async fn poll_until<K, T, F, Fut>(
    clock: &K,
    interval: Duration,
    deadline: Duration,
    mut check: F,
) -> Result<T, DeadlineExceeded>
where
    K: Clock,
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Attempt<T>>,
{
    let start = clock.now();
    let mut attempts = 0u32;

    loop {
        let elapsed = clock.now().saturating_duration_since(start);
        if elapsed >= deadline {
            return Err(DeadlineExceeded { attempts, elapsed });
        }

        attempts += 1;
        if let Attempt::Done(value) = check(attempts).await {
            return Ok(value);
        }

        clock.sleep(interval).await;
    }
}
