//! Fixed-period tick scheduler for Gridchase.
//!
//! Every room in the process is resolved on the same wall-clock cadence.
//! This crate only owns the *timing*: when the next tick is due, whether
//! the previous one ran late, and how long resolution took. What happens
//! on a tick is up to the caller.
//!
//! ```ignore
//! let mut scheduler = TickScheduler::new(TickConfig::default());
//! loop {
//!     let info = scheduler.wait_for_tick().await;
//!     resolve_all_rooms(info.tick);
//!     scheduler.record_tick_end();
//! }
//! ```

use std::time::{Duration, Instant};

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::time::{self, Instant as TokioInstant};
use tracing::{debug, trace, warn};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// What to do when a tick fires later than scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickPolicy {
    /// Forget the missed deadlines and schedule the next tick one period
    /// from now. Prevents a burst of back-to-back ticks after a stall.
    #[default]
    Skip,
    /// Keep the original cadence: the next tick is due one period after
    /// the *scheduled* time of this one, even if that is already past.
    Drop,
}

/// Configuration for the tick scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TickConfig {
    /// Time between two ticks.
    pub period: Duration,
    /// Overrun handling policy.
    pub policy: TickPolicy,
    /// Fraction of the period (0.0–1.0) above which a slow tick is logged.
    pub budget_warn_threshold: f64,
    /// Upper bound of the random delay added before the first tick.
    pub initial_jitter: Duration,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            period: Duration::from_millis(100),
            policy: TickPolicy::default(),
            budget_warn_threshold: 0.80,
            initial_jitter: Duration::ZERO,
        }
    }
}

impl TickConfig {
    /// Shortest supported period.
    pub const MIN_PERIOD: Duration = Duration::from_millis(10);
    /// Longest supported period.
    pub const MAX_PERIOD: Duration = Duration::from_secs(10);

    /// A config with the given period and defaults for everything else.
    pub fn with_period(period: Duration) -> Self {
        Self {
            period,
            ..Default::default()
        }
    }

    /// Clamps out-of-range values so the config is safe to use.
    ///
    /// Called by [`TickScheduler::new`].
    pub fn validated(mut self) -> Self {
        let clamped = self.period.clamp(Self::MIN_PERIOD, Self::MAX_PERIOD);
        if clamped != self.period {
            warn!(
                requested_ms = self.period.as_millis() as u64,
                clamped_ms = clamped.as_millis() as u64,
                "tick period out of range, clamping"
            );
            self.period = clamped;
        }
        self.budget_warn_threshold = self.budget_warn_threshold.clamp(0.0, 1.0);
        self
    }
}

// ---------------------------------------------------------------------------
// Tick info
// ---------------------------------------------------------------------------

/// Information about a tick that just fired.
#[derive(Debug, Clone)]
pub struct TickInfo {
    /// Monotonically increasing tick number, starting at 1.
    pub tick: u64,
    /// `true` if this tick woke up more than 10% of a period late.
    pub overrun: bool,
    /// Whole periods missed because of the overrun.
    pub ticks_missed: u64,
}

/// Runtime metrics, updated on every tick.
#[derive(Debug, Clone, Default)]
pub struct TickMetrics {
    pub total_ticks: u64,
    pub total_overruns: u64,
    pub total_missed: u64,
    /// Exponential moving average of resolution time (α = 0.1).
    pub avg_tick_time: Duration,
    pub max_tick_time: Duration,
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Fixed-period tick scheduler.
///
/// One instance drives the whole engine; it is not shared and needs no
/// locking.
pub struct TickScheduler {
    config: TickConfig,
    tick_count: u64,
    next_tick: TokioInstant,
    /// Set by `wait_for_tick`, consumed by `record_tick_end`.
    tick_start: Option<Instant>,
    metrics: TickMetrics,
}

impl TickScheduler {
    /// Creates a scheduler. The first tick is due one period from now,
    /// plus a random share of `initial_jitter`.
    pub fn new(config: TickConfig) -> Self {
        let config = config.validated();

        let jitter = if config.initial_jitter.is_zero() {
            Duration::ZERO
        } else {
            let max_us = (config.initial_jitter.as_micros() as u64).max(1);
            Duration::from_micros(rand::rng().random_range(0..max_us))
        };

        debug!(
            period_ms = config.period.as_secs_f64() * 1000.0,
            policy = ?config.policy,
            "tick scheduler created"
        );

        Self {
            next_tick: TokioInstant::now() + config.period + jitter,
            config,
            tick_count: 0,
            tick_start: None,
            metrics: TickMetrics::default(),
        }
    }

    /// Creates a scheduler with the given period and default settings.
    pub fn with_period(period: Duration) -> Self {
        Self::new(TickConfig::with_period(period))
    }

    /// Waits until the next tick is due and returns its [`TickInfo`].
    pub async fn wait_for_tick(&mut self) -> TickInfo {
        let scheduled = self.next_tick;
        let period = self.config.period;

        time::sleep_until(scheduled).await;

        let now = TokioInstant::now();
        self.tick_count += 1;
        self.tick_start = Some(Instant::now());

        let late_by = now.saturating_duration_since(scheduled);
        let overrun = late_by > period / 10;
        let ticks_missed = if overrun {
            (late_by.as_nanos() / period.as_nanos()) as u64
        } else {
            0
        };

        self.next_tick = match self.config.policy {
            TickPolicy::Skip => now + period,
            TickPolicy::Drop => scheduled + period,
        };

        if overrun {
            warn!(
                tick = self.tick_count,
                late_ms = late_by.as_secs_f64() * 1000.0,
                missed = ticks_missed,
                policy = ?self.config.policy,
                "tick fired late"
            );
            self.metrics.total_overruns += 1;
            self.metrics.total_missed += ticks_missed;
        }
        self.metrics.total_ticks += 1;

        trace!(tick = self.tick_count, overrun, "tick fired");

        TickInfo {
            tick: self.tick_count,
            overrun,
            ticks_missed,
        }
    }

    /// Records that the work for the current tick is done.
    ///
    /// Feeds the metrics and logs a warning when resolution used more than
    /// `budget_warn_threshold` of the period. A no-op if called twice.
    pub fn record_tick_end(&mut self) {
        let Some(start) = self.tick_start.take() else {
            return;
        };
        let elapsed = start.elapsed();
        let utilization = elapsed.as_secs_f64() / self.config.period.as_secs_f64();

        if utilization >= self.config.budget_warn_threshold {
            warn!(
                tick = self.tick_count,
                elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                period_ms = self.config.period.as_secs_f64() * 1000.0,
                "tick resolution is close to or over its period"
            );
        }

        if elapsed > self.metrics.max_tick_time {
            self.metrics.max_tick_time = elapsed;
        }
        let alpha = 0.1;
        let prev = self.metrics.avg_tick_time.as_secs_f64();
        self.metrics.avg_tick_time =
            Duration::from_secs_f64(prev * (1.0 - alpha) + elapsed.as_secs_f64() * alpha);
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn period(&self) -> Duration {
        self.config.period
    }

    pub fn metrics(&self) -> &TickMetrics {
        &self.metrics
    }
}
