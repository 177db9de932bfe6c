//! Tick clock: accumulates scaled frame time and decides cycle boundaries.
//!
//! Idle → Accumulating → (threshold crossed) → fires cycle → Accumulating
//!
//! RULE: after every `advance`, `0 <= accumulated < interval_seconds`.
//! Overflow is carried, never dropped: a frame delta spanning several
//! intervals fires one cycle per interval, in sequence.

use crate::{
    config::{ClockConfig, MAX_TIME_SCALE, MIN_TIME_SCALE},
    error::{EconomyError, EconomyResult},
    types::Cycle,
};
use serde::{Deserialize, Serialize};

/// Persisted clock fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClockState {
    pub accumulated:            f64,
    pub total_cycles_completed: Cycle,
}

/// What one `advance` call produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClockAdvance {
    pub cycles_fired: u64,
    /// Set when at least one real second passed since the last report.
    pub per_second:   Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TickClock {
    accumulated:            f64,
    interval_seconds:       f64,
    total_cycles_completed: Cycle,
    time_scale:             f64,
    paused:                 bool,
    enabled:                bool,
    /// Unscaled seconds since the last per-second report.
    real_since_report:      f64,
}

impl TickClock {
    /// A clock firing every `interval_seconds`. The interval must be finite
    /// and positive, otherwise `advance` could never leave its catch-up loop.
    pub fn new(interval_seconds: f64) -> EconomyResult<Self> {
        if !valid_interval(interval_seconds) {
            return Err(EconomyError::InvalidConfig {
                field: "clock.interval_seconds",
                reason: format!("{interval_seconds} must be finite and > 0"),
            });
        }
        Ok(Self {
            accumulated:            0.0,
            interval_seconds,
            total_cycles_completed: 0,
            time_scale:             1.0,
            paused:                 false,
            enabled:                true,
            real_since_report:      0.0,
        })
    }

    pub fn from_config(config: &ClockConfig) -> EconomyResult<Self> {
        let mut clock = Self::new(config.effective_interval())?;
        clock.set_time_scale(config.time_scale);
        Ok(clock)
    }

    /// Advance by a real frame delta. `on_cycle` runs once per crossed
    /// interval, after the accumulator and cycle count were updated, and
    /// sees the clock state as of that crossing.
    pub fn advance<F>(&mut self, delta_seconds: f64, mut on_cycle: F) -> ClockAdvance
    where
        F: FnMut(&ClockState),
    {
        let mut report = ClockAdvance::default();
        if self.paused || !self.enabled || !delta_seconds.is_finite() || delta_seconds <= 0.0 {
            return report;
        }

        self.accumulated += delta_seconds * self.time_scale;
        while self.accumulated >= self.interval_seconds {
            self.accumulated -= self.interval_seconds;
            self.total_cycles_completed += 1;
            report.cycles_fired += 1;
            on_cycle(&self.state());
        }

        self.real_since_report += delta_seconds;
        if self.real_since_report >= 1.0 {
            self.real_since_report %= 1.0;
            report.per_second = Some(self.remaining_seconds());
        }
        report
    }

    /// Count a cycle without consuming accumulated time. Testing hook.
    pub fn force_cycle(&mut self) -> Cycle {
        self.total_cycles_completed += 1;
        self.total_cycles_completed
    }

    // ── Queries ────────────────────────────────────────────────

    pub fn accumulated(&self) -> f64 { self.accumulated }
    pub fn interval_seconds(&self) -> f64 { self.interval_seconds }
    pub fn total_cycles_completed(&self) -> Cycle { self.total_cycles_completed }
    pub fn time_scale(&self) -> f64 { self.time_scale }
    pub fn is_paused(&self) -> bool { self.paused }
    pub fn is_enabled(&self) -> bool { self.enabled }

    /// Whole simulated seconds until the next cycle, rounded up.
    pub fn remaining_seconds(&self) -> u64 {
        (self.interval_seconds - self.accumulated).max(0.0).ceil() as u64
    }

    pub fn progress_fraction(&self) -> f64 {
        if self.interval_seconds <= 0.0 {
            return 0.0;
        }
        (self.accumulated / self.interval_seconds).clamp(0.0, 1.0)
    }

    /// Remaining time as `MM:SS`.
    pub fn formatted_remaining(&self) -> String {
        let remaining = self.remaining_seconds();
        format!("{:02}:{:02}", remaining / 60, remaining % 60)
    }

    // ── Control ────────────────────────────────────────────────

    pub fn pause(&mut self)  { self.paused = true;  }
    pub fn resume(&mut self) { self.paused = false; }

    pub fn set_time_scale(&mut self, scale: f64) {
        self.time_scale = if scale.is_finite() {
            scale.clamp(MIN_TIME_SCALE, MAX_TIME_SCALE)
        } else {
            MIN_TIME_SCALE
        };
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Switch interval, e.g. between production and debug. Overflow past the
    /// new interval is kept for the next `advance` to consume. An invalid
    /// interval is ignored and reported as `false`.
    pub fn set_interval(&mut self, interval_seconds: f64) -> bool {
        if !valid_interval(interval_seconds) {
            log::warn!("clock: ignored invalid interval {interval_seconds}");
            return false;
        }
        self.interval_seconds = interval_seconds;
        true
    }

    pub fn reset(&mut self) {
        self.accumulated = 0.0;
        self.total_cycles_completed = 0;
        self.real_since_report = 0.0;
    }

    pub fn state(&self) -> ClockState {
        ClockState {
            accumulated:            self.accumulated,
            total_cycles_completed: self.total_cycles_completed,
        }
    }

    /// Restore persisted fields. An accumulator at or past the interval is
    /// folded back below it without firing cycles.
    pub fn restore(&mut self, state: &ClockState) {
        let acc = if state.accumulated.is_finite() { state.accumulated.max(0.0) } else { 0.0 };
        self.accumulated = acc % self.interval_seconds;
        self.total_cycles_completed = state.total_cycles_completed;
        self.real_since_report = 0.0;
    }
}

fn valid_interval(interval_seconds: f64) -> bool {
    interval_seconds.is_finite() && interval_seconds > 0.0
}
