//! Fixed-cadence tick scheduler.
//!
//! [`TickScheduler::run`] wakes on a [`tokio::time::interval`] and hands the
//! tick closure to the blocking pool, so a slow tick never stalls the
//! runtime.  While a tick is still running, further due ticks are skipped
//! and counted instead of queued.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use striker_types::StrikerError;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

pub const DEFAULT_TICK_HZ: u32 = 60;

/// Counters reported when the scheduler stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub ticks: u64,
    pub skipped: u64,
}

#[derive(Debug)]
pub struct TickScheduler {
    period: Duration,
    busy: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    skipped: AtomicU64,
}

/// Clears the busy flag when the tick returns or unwinds.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl TickScheduler {
    /// A scheduler firing `hz` times per second.
    pub fn new(hz: u32) -> Result<Self, StrikerError> {
        if hz == 0 {
            return Err(StrikerError::Config("tick rate must be at least 1 Hz".to_string()));
        }
        Ok(Self {
            period: Duration::from_secs(1) / hz,
            busy: Arc::new(AtomicBool::new(false)),
            ticks: Arc::new(AtomicU64::new(0)),
            skipped: AtomicU64::new(0),
        })
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }

    /// Call `tick` once per period until `shutdown` becomes `true`.
    ///
    /// A tick in flight at shutdown is allowed to finish.
    pub async fn run<F>(&self, tick: F, mut shutdown: watch::Receiver<bool>) -> SchedulerStats
    where
        F: FnMut() + Send + 'static,
    {
        let tick = Arc::new(Mutex::new(tick));
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut in_flight: Option<JoinHandle<()>> = None;
        info!(period_ms = self.period.as_secs_f64() * 1000.0, "tick scheduler started");

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if self.busy.swap(true, Ordering::AcqRel) {
                        let skipped = self.skipped.fetch_add(1, Ordering::Relaxed) + 1;
                        debug!(skipped, "previous tick still running; skipping");
                        continue;
                    }
                    let guard = BusyGuard(Arc::clone(&self.busy));
                    let tick = Arc::clone(&tick);
                    let ticks = Arc::clone(&self.ticks);
                    in_flight = Some(tokio::task::spawn_blocking(move || {
                        let _guard = guard;
                        (tick.lock().unwrap_or_else(PoisonError::into_inner))();
                        ticks.fetch_add(1, Ordering::Relaxed);
                    }));
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        if let Some(handle) = in_flight.take() {
            if let Err(e) = handle.await {
                warn!(error = %e, "last tick did not complete");
            }
        }
        let stats = self.stats();
        info!(ticks = stats.ticks, skipped = stats.skipped, "tick scheduler stopped");
        stats
    }
}
