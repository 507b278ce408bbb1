use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{sleep, timeout, Instant};

/// How a waiter learns that it should check its condition again
pub enum Cadence {
    /// Re-check on a fixed interval
    Poll(Duration),
    /// Re-check whenever the feed ticks, and at least every `fallback`
    Observe {
        changes: watch::Receiver<u64>,
        fallback: Duration,
    },
}

impl Cadence {
    /// Observe `changes` when a feed exists, otherwise poll every `interval`
    pub fn observe_or_poll(changes: Option<watch::Receiver<u64>>, interval: Duration) -> Self {
        match changes {
            Some(changes) => Cadence::Observe { changes, fallback: interval },
            None => Cadence::Poll(interval),
        }
    }
}

/// Wait until `probe` yields a value or `limit` elapses.
///
/// The probe runs once immediately, then once per cadence tick. Any
/// observer held by the cadence is released on every exit path.
pub async fn wait_for<T>(limit: Duration, mut cadence: Cadence, mut probe: impl FnMut() -> Option<T>) -> Option<T> {
    let deadline = Instant::now() + limit;

    loop {
        if let Some(value) = probe() {
            return Some(value);
        }

        let now = Instant::now();
        if now >= deadline {
            tracing::trace!(?limit, "Wait timed out");
            return None;
        }
        let remaining = deadline - now;

        let closed_feed = match &mut cadence {
            Cadence::Poll(interval) => {
                sleep((*interval).min(remaining)).await;
                None
            }
            Cadence::Observe { changes, fallback } => {
                let tick = (*fallback).min(remaining);
                let outcome = timeout(tick, changes.changed()).await;
                matches!(outcome, Ok(Err(_))).then_some(tick)
            }
        };

        // Feed closed, nothing will tick again.
        if let Some(interval) = closed_feed {
            cadence = Cadence::Poll(interval);
        }
    }
}
