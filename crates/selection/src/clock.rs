//! Timed waits between selection attempts.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;

/// Suspends the calling task between attempts.
///
/// Implementations must not block the worker thread. Dropping the returned
/// future cancels the wait.
#[async_trait]
pub trait Sleeper: Send + Sync {
    /// Wait for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// Wall-clock waits on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Virtual time that advances instantly.
///
/// Records every requested wait, then yields to the scheduler so other
/// tasks still interleave as they would during a real sleep.
#[derive(Debug, Default)]
pub struct VirtualClock {
    now: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl VirtualClock {
    /// Create a clock at time zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    pub fn now(&self) -> Duration {
        *self.now.lock()
    }

    /// Every wait requested so far, in order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }

    /// Number of waits requested so far.
    pub fn sleep_count(&self) -> usize {
        self.sleeps.lock().len()
    }
}

#[async_trait]
impl Sleeper for VirtualClock {
    async fn sleep(&self, duration: Duration) {
        {
            let mut now = self.now.lock();
            *now = now.saturating_add(duration);
            self.sleeps.lock().push(duration);
        }
        tokio::task::yield_now().await;
    }
}
