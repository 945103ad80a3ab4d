//! Pacing gate for the geocoding service.
//!
//! Nominatim's usage policy allows one request per second per client. Every
//! geocoding call goes through one shared [`RateGate`]: holding a
//! [`GatePermit`] means no other call is in flight, and a new permit is only
//! handed out once `interval` has passed since the previous one was released.

use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::{Instant, sleep_until};
use tracing::debug;

/// Serializes calls and keeps a minimum gap between them.
///
/// Share it behind an `Arc` to pace several pipelines that hit the same
/// service.
#[derive(Debug)]
pub struct RateGate {
    interval: Duration,
    last_release: Mutex<Option<Instant>>,
}

/// Exclusive right to make one call. Dropping it starts the next interval.
#[derive(Debug)]
pub struct GatePermit<'a> {
    last_release: MutexGuard<'a, Option<Instant>>,
}

impl Drop for GatePermit<'_> {
    fn drop(&mut self) {
        *self.last_release = Some(Instant::now());
    }
}

impl RateGate {
    /// Create a gate.
    ///
    /// # Arguments
    ///
    /// * `interval` - Minimum time between releasing one permit and handing
    ///   out the next; `Duration::ZERO` only serializes
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_release: Mutex::new(None),
        }
    }

    /// Wait for exclusive access and for the interval to elapse.
    ///
    /// # Returns
    ///
    /// A [`GatePermit`]. Hold it for the duration of the call; the next
    /// interval starts when it is dropped.
    pub async fn acquire(&self) -> GatePermit<'_> {
        let guard = self.last_release.lock().await;
        if let Some(last) = *guard {
            let ready_at = last + self.interval;
            if ready_at > Instant::now() {
                debug!(wait_ms = (ready_at - Instant::now()).as_millis() as u64, "Pacing geocoding call");
                sleep_until(ready_at).await;
            }
        }
        GatePermit {
            last_release: guard,
        }
    }
}
