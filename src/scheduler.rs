//! Drift-correcting periodic scheduler
//!
//! Tick boundaries are derived from a fixed anchor advanced by exactly one
//! period per tick, so slow ticks never shift later boundaries. A tick that
//! overruns its period makes the next one fire immediately. Ticks never
//! overlap and are never skipped.

use crate::config::MAX_POLL_INTERVAL_SECS;
use crate::error::{GridlogError, Result};
use crate::logging::{StructuredLogger, get_logger};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

/// Longest single sleep between shutdown checks
pub const MAX_SLEEP_STEP: Duration = Duration::from_millis(250);

/// Work executed once per period
#[async_trait::async_trait]
pub trait Tick: Send {
    async fn tick(&mut self);
}

/// Anchor arithmetic for a fixed-period schedule
#[derive(Debug, Clone)]
pub struct PeriodicSchedule {
    period: Duration,
    anchor: Instant,
    ticks: u64,
}

impl PeriodicSchedule {
    pub fn new(period: Duration, anchor: Instant) -> Self {
        Self {
            period,
            anchor,
            ticks: 0,
        }
    }

    /// Target time of the next tick
    pub fn anchor(&self) -> Instant {
        self.anchor
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Number of completed ticks
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Record a completed tick and move the target one period forward
    pub fn advance(&mut self) {
        self.anchor += self.period;
        self.ticks += 1;
    }

    /// Time left until the next tick; zero when already due
    pub fn remaining(&self, now: Instant) -> Duration {
        self.anchor.saturating_duration_since(now)
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.anchor
    }
}

/// Counters reported when the loop exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    pub ticks: u64,
    /// Ticks that took longer than one period
    pub overruns: u64,
}

/// Runs a [`Tick`] on a fixed cadence until shutdown is requested
#[derive(Debug)]
pub struct Scheduler {
    period: Duration,
    logger: StructuredLogger,
}

impl Scheduler {
    /// Create a scheduler; the period must be non-zero and at most one day
    pub fn new(period: Duration) -> Result<Self> {
        if period.is_zero() {
            return Err(GridlogError::validation(
                "poll_interval_secs",
                "Must be greater than 0",
            ));
        }
        if period > Duration::from_secs(MAX_POLL_INTERVAL_SECS) {
            return Err(GridlogError::validation(
                "poll_interval_secs",
                format!("Must be at most {} seconds", MAX_POLL_INTERVAL_SECS),
            ));
        }
        Ok(Self {
            period,
            logger: get_logger("scheduler"),
        })
    }

    pub fn from_secs(secs: u64) -> Result<Self> {
        Self::new(Duration::from_secs(secs))
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Tick immediately, then once per period until `shutdown` turns true.
    ///
    /// A tick already running when shutdown is requested is allowed to
    /// finish; no new tick starts afterwards.
    pub async fn run<T>(&self, target: &mut T, mut shutdown: watch::Receiver<bool>) -> SchedulerStats
    where
        T: Tick + ?Sized,
    {
        let mut schedule = PeriodicSchedule::new(self.period, Instant::now());
        let mut stats = SchedulerStats::default();
        let mut watching = true;

        self.logger.info(&format!(
            "Starting periodic loop every {:?}",
            self.period
        ));

        loop {
            if *shutdown.borrow() {
                break;
            }

            let started = Instant::now();
            target.tick().await;
            let elapsed = started.elapsed();

            stats.ticks += 1;
            if elapsed > self.period {
                stats.overruns += 1;
                self.logger.warn(&format!(
                    "Tick took {:?}, longer than the {:?} period",
                    elapsed, self.period
                ));
            }
            schedule.advance();

            if !self
                .wait_for(&schedule, &mut shutdown, &mut watching)
                .await
            {
                break;
            }
        }

        self.logger.info(&format!(
            "Periodic loop stopped after {} ticks ({} overruns)",
            stats.ticks, stats.overruns
        ));
        stats
    }

    /// Sleep until the schedule is due; false when shutdown was requested
    async fn wait_for(
        &self,
        schedule: &PeriodicSchedule,
        shutdown: &mut watch::Receiver<bool>,
        watching: &mut bool,
    ) -> bool {
        loop {
            if *shutdown.borrow() {
                return false;
            }
            let now = Instant::now();
            if schedule.is_due(now) {
                return true;
            }
            let step = schedule.remaining(now).min(MAX_SLEEP_STEP);
            tokio::select! {
                _ = tokio::time::sleep(step) => {}
                changed = shutdown.changed(), if *watching => {
                    // Sender gone: nobody can request shutdown any more
                    if changed.is_err() {
                        *watching = false;
                    }
                }
            }
        }
    }
}
