//! Wall-clock ticks to simulated substeps

use super::params::SimulationParameters;
use crate::core_types::units::Seconds;
use std::time::Instant;

/// Substep schedule for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickPlan {
    /// Simulated time covered by the tick
    pub sim_dt: Seconds,
    /// Number of engine steps
    pub substeps: u32,
    /// Length of each step
    pub substep_dt: Seconds,
}

impl TickPlan {
    /// Plan a tick for `wall_dt` wall-clock seconds
    ///
    /// The wall delta is clamped to `max_wall_delta_seconds` and split into
    /// `clamp(ceil(wall / fixed_substep_seconds), 1, max_substeps_per_tick)`
    /// steps. The simulated time `wall * speed_multiplier` is shared equally
    /// between them. Returns `None` when nothing should be simulated.
    pub fn new(wall_dt: f32, params: &SimulationParameters) -> Option<Self> {
        if !wall_dt.is_finite() || wall_dt <= 0.0 {
            return None;
        }
        let p = params.sanitized();
        let wall = wall_dt.min(p.max_wall_delta_seconds);
        let sim_dt = wall * p.speed_multiplier;
        if sim_dt <= 0.0 {
            return None;
        }

        let wanted = (wall / p.fixed_substep_seconds).ceil();
        let substeps = if wanted >= p.max_substeps_per_tick as f32 {
            p.max_substeps_per_tick
        } else {
            (wanted as u32).max(1)
        };

        Some(Self {
            sim_dt: Seconds::new(sim_dt),
            substeps,
            substep_dt: Seconds::new(sim_dt / substeps as f32),
        })
    }
}

/// Turns successive `Instant`s into wall-clock deltas for host loops
#[derive(Debug, Default)]
pub struct TickDriver {
    last: Option<Instant>,
}

impl TickDriver {
    /// Driver with no previous frame
    pub fn new() -> Self {
        Self::default()
    }

    /// Seconds since the previous call, 0 on the first call
    pub fn delta(&mut self, now: Instant) -> f32 {
        let dt = self
            .last
            .map_or(0.0, |last| now.saturating_duration_since(last).as_secs_f32());
        self.last = Some(now);
        dt
    }

    /// Forget the previous frame, e.g. after a pause
    pub fn reset(&mut self) {
        self.last = None;
    }
}
