//! Tunable simulation parameters

use crate::core_types::units::{MillimetersPerDay, MillimetersPerHour};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default substep length (s)
pub const DEFAULT_FIXED_SUBSTEP: f32 = 0.2;

/// Default cap on one wall-clock delta (s)
pub const DEFAULT_MAX_WALL_DELTA: f32 = 1.0;

/// Default depth below which water is discarded (m)
pub const DEFAULT_DEPTH_EPSILON: f32 = 1e-6;

/// Parameters read by the engine on every step
///
/// Values may be changed between steps and take effect on the next one.
/// The engine only ever reads [`SimulationParameters::sanitized`] copies, so
/// out-of-range values set here never reach the physics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationParameters {
    /// Rain added to every cell
    pub rainfall_rate: MillimetersPerHour,
    /// Water removed from every cell
    pub drainage_rate: MillimetersPerHour,
    /// Fraction of head difference moved per second (1/s)
    pub flow_coefficient: f32,
    /// Simulated seconds per wall-clock second
    pub speed_multiplier: f32,
    /// Upper bound on substeps per tick
    pub max_substeps_per_tick: u32,
    /// Target substep length (s)
    pub fixed_substep_seconds: f32,
    /// Wall-clock deltas above this are clamped (s)
    pub max_wall_delta_seconds: f32,
    /// Depths below this snap to zero (m)
    pub depth_epsilon: f32,
    /// Depth rendered at full color intensity (m)
    pub max_display_depth: f32,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            rainfall_rate: MillimetersPerDay::new(50.0).into(),
            drainage_rate: MillimetersPerHour::new(1.0),
            flow_coefficient: 0.6,
            speed_multiplier: 60.0,
            max_substeps_per_tick: 4,
            fixed_substep_seconds: DEFAULT_FIXED_SUBSTEP,
            max_wall_delta_seconds: DEFAULT_MAX_WALL_DELTA,
            depth_epsilon: DEFAULT_DEPTH_EPSILON,
            max_display_depth: 0.2,
        }
    }
}

/// Non-negative finite value, otherwise 0
#[inline]
fn non_negative(v: f32) -> f32 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        0.0
    }
}

/// Positive finite value, otherwise `fallback`
#[inline]
fn positive_or(v: f32, fallback: f32) -> f32 {
    if v.is_finite() && v > 0.0 {
        v
    } else {
        fallback
    }
}

impl SimulationParameters {
    /// Copy with every value clamped into its valid range
    ///
    /// Negative or NaN rates, flow coefficient, speed and epsilon become 0.
    /// Substep and wall-delta lengths fall back to their defaults, and the
    /// substep cap is at least 1. `max_display_depth` is left alone; the
    /// image builder rejects it instead.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        let clean = Self {
            rainfall_rate: MillimetersPerHour::new(non_negative(*self.rainfall_rate)),
            drainage_rate: MillimetersPerHour::new(non_negative(*self.drainage_rate)),
            flow_coefficient: non_negative(self.flow_coefficient),
            speed_multiplier: non_negative(self.speed_multiplier),
            max_substeps_per_tick: self.max_substeps_per_tick.max(1),
            fixed_substep_seconds: positive_or(self.fixed_substep_seconds, DEFAULT_FIXED_SUBSTEP),
            max_wall_delta_seconds: positive_or(
                self.max_wall_delta_seconds,
                DEFAULT_MAX_WALL_DELTA,
            ),
            depth_epsilon: non_negative(self.depth_epsilon),
            max_display_depth: self.max_display_depth,
        };
        if clean != *self {
            debug!(requested = ?self, "Clamped simulation parameters");
        }
        clean
    }

    /// Rainfall given as a 24-hour total
    pub fn set_rainfall_per_day(&mut self, total: MillimetersPerDay) {
        self.rainfall_rate = total.into();
    }
}
