//! Time source used by the polling loops and the report archiver.
//!
//! Production code uses [`SystemClock`]. Tests inject [`ManualClock`], whose
//! `sleep` advances virtual time instantly, so deadline behaviour can be
//! checked without real waiting.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::{Local, NaiveDateTime};

/// Monotonic and wall-clock time plus suspension.
pub trait Clock: Send + Sync + 'static {
    /// Monotonic instant used for deadline arithmetic.
    fn now(&self) -> Instant;

    /// Local wall-clock time used to name artifacts.
    fn wall_time(&self) -> NaiveDateTime;

    /// Suspends the caller for `duration`.
    fn sleep(&self, duration: Duration) -> impl Future<Output = ()> + Send;
}

/// Real clock backed by `Instant`, `chrono::Local` and `tokio::time::sleep`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn wall_time(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Virtual clock: time only moves when `sleep` or `advance` is called.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    wall_origin: NaiveDateTime,
    elapsed_nanos: AtomicU64,
    sleeps: AtomicU64,
}

impl ManualClock {
    /// Starts at the given wall-clock time.
    pub fn new(wall_origin: NaiveDateTime) -> Self {
        Self {
            origin: Instant::now(),
            wall_origin,
            elapsed_nanos: AtomicU64::new(0),
            sleeps: AtomicU64::new(0),
        }
    }

    /// Moves virtual time forward.
    pub fn advance(&self, duration: Duration) {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        self.elapsed_nanos.fetch_add(nanos, Ordering::SeqCst);
    }

    /// Total virtual time elapsed since construction.
    pub fn elapsed(&self) -> Duration {
        Duration::from_nanos(self.elapsed_nanos.load(Ordering::SeqCst))
    }

    /// Number of `sleep` calls so far.
    pub fn sleep_count(&self) -> u64 {
        self.sleeps.load(Ordering::SeqCst)
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(NaiveDateTime::default())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn wall_time(&self) -> NaiveDateTime {
        let delta =
            chrono::Duration::from_std(self.elapsed()).unwrap_or_else(|_| chrono::Duration::zero());
        self.wall_origin + delta
    }

    async fn sleep(&self, duration: Duration) {
        self.sleeps.fetch_add(1, Ordering::SeqCst);
        self.advance(duration);
    }
}
