//! Expiry Sweep Task
//!
//! Background task that periodically removes stale cache entries.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::ExpiringCache;

// == Sweep Handle ==
/// Controls a running sweep task.
///
/// Dropping the handle leaves the task running. It ends when cancelled or
/// when every handle to its cache has been dropped.
#[derive(Debug)]
pub struct SweepHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
    interval: Duration,
}

impl SweepHandle {
    /// Returns the tick interval, which is also the maximum entry age.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Signals the task to stop without waiting for it.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns true once the task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancels the task and waits until it has exited.
    ///
    /// After this returns no further sweep pass runs for this task.
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(err) = self.task.await {
            warn!("Sweep task ended abnormally: {}", err);
        }
    }
}

/// Spawns a task that, on every tick of `interval`, removes entries from
/// `cache` whose age exceeds `interval`.
///
/// The first pass runs one full interval after this call. An interval that
/// overflows the clock never ticks; the task then only waits to be cancelled.
/// The task only holds a weak reference to the store.
///
/// # Panics
/// Panics if called outside a tokio runtime, or if `interval` is zero.
pub(crate) fn spawn_sweep_task(cache: &ExpiringCache, interval: Duration) -> SweepHandle {
    let weak = cache.downgrade();
    let token = CancellationToken::new();
    let cancelled = token.clone();

    let mut ticker = Instant::now().checked_add(interval).map(|start| {
        let mut ticker = time::interval_at(start, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker
    });

    let task = tokio::spawn(async move {
        info!("Starting expiry sweep with interval of {:?}", interval);

        loop {
            tokio::select! {
                _ = cancelled.cancelled() => {
                    info!("Expiry sweep cancelled");
                    break;
                }
                _ = next_tick(&mut ticker) => {}
            }

            let Some(cache) = weak.upgrade() else {
                debug!("Cache dropped, ending expiry sweep");
                break;
            };

            let removed = cache.sweep_expired(interval);
            if removed > 0 {
                info!("Expiry sweep: removed {} stale entries", removed);
            } else {
                debug!("Expiry sweep: no stale entries found");
            }
        }
    });

    SweepHandle {
        token,
        task,
        interval,
    }
}

/// Waits for the next tick, or forever when there is no schedulable ticker.
async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}
