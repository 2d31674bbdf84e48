//! Semantic unit types for rate and time quantities
//!
//! Newtype wrappers keep rainfall and drainage rates from being mixed up with
//! the per-second depth increments the engine actually integrates.
//!
//! # Usage
//! ```
//! use flood_sim_core::core_types::units::{MillimetersPerDay, MillimetersPerHour};
//!
//! let daily = MillimetersPerDay::new(48.0);
//! let hourly: MillimetersPerHour = daily.into();
//! assert!((*hourly - 2.0).abs() < 1e-6);
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Deref, Mul, Sub};

/// Millimeters per hour in one meter per second
const MM_PER_HOUR_PER_M_PER_S: f32 = 1000.0 * 3600.0;

/// Compare f32 values with total ordering (NaN sorts above everything)
#[inline]
fn f32_total_cmp(a: f32, b: f32) -> Ordering {
    a.total_cmp(&b)
}

/// Shared trait impls for the f32 newtypes below
macro_rules! unit_newtype {
    ($name:ident, $suffix:literal) => {
        impl Eq for $name {}

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> Ordering {
                f32_total_cmp(self.0, other.0)
            }
        }

        impl Deref for $name {
            type Target = f32;
            #[inline]
            fn deref(&self) -> &f32 {
                &self.0
            }
        }

        impl From<f32> for $name {
            fn from(v: f32) -> Self {
                $name(v)
            }
        }

        impl From<$name> for f32 {
            fn from(v: $name) -> f32 {
                v.0
            }
        }

        impl Add for $name {
            type Output = $name;
            fn add(self, rhs: $name) -> $name {
                $name(self.0 + rhs.0)
            }
        }

        impl Sub for $name {
            type Output = $name;
            fn sub(self, rhs: $name) -> $name {
                $name(self.0 - rhs.0)
            }
        }

        impl Mul<f32> for $name {
            type Output = $name;
            fn mul(self, rhs: f32) -> $name {
                $name(self.0 * rhs)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:.3} {}", self.0, $suffix)
            }
        }
    };
}

/// Precipitation or drainage rate in millimeters of water per hour
///
/// Construction does not validate the sign: rates arrive from external
/// controls and are clamped by the engine instead of rejected.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct MillimetersPerHour(f32);

unit_newtype!(MillimetersPerHour, "mm/h");

impl MillimetersPerHour {
    /// Zero rate
    pub const ZERO: MillimetersPerHour = MillimetersPerHour(0.0);

    /// Create a new rate
    #[inline]
    #[must_use]
    pub const fn new(value: f32) -> Self {
        MillimetersPerHour(value)
    }

    /// Get the raw f32 value
    #[inline]
    #[must_use]
    pub fn value(self) -> f32 {
        self.0
    }

    /// Convert to the depth change rate the engine integrates
    #[inline]
    #[must_use]
    pub fn to_meters_per_second(self) -> MetersPerSecond {
        MetersPerSecond(self.0 / MM_PER_HOUR_PER_M_PER_S)
    }
}

impl From<MillimetersPerDay> for MillimetersPerHour {
    fn from(v: MillimetersPerDay) -> Self {
        MillimetersPerHour(v.0 / 24.0)
    }
}

/// Accumulated rainfall over 24 hours (the unit station forecasts use)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct MillimetersPerDay(f32);

unit_newtype!(MillimetersPerDay, "mm/24h");

impl MillimetersPerDay {
    /// Create a new daily total
    #[inline]
    #[must_use]
    pub const fn new(value: f32) -> Self {
        MillimetersPerDay(value)
    }
}

/// Vertical water-depth velocity
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct MetersPerSecond(f32);

unit_newtype!(MetersPerSecond, "m/s");

impl MetersPerSecond {
    /// Create a new velocity
    #[inline]
    #[must_use]
    pub const fn new(value: f32) -> Self {
        MetersPerSecond(value)
    }

    /// Depth accumulated over `dt`
    #[inline]
    #[must_use]
    pub fn over(self, dt: Seconds) -> f32 {
        self.0 * dt.0
    }
}

/// Time duration in seconds
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[repr(transparent)]
#[serde(transparent)]
pub struct Seconds(f32);

unit_newtype!(Seconds, "s");

impl Seconds {
    /// Create a new duration
    #[inline]
    #[must_use]
    #[track_caller]
    pub const fn new(value: f32) -> Self {
        assert!(value >= 0.0, "Seconds::new: negative duration is invalid");
        Seconds(value)
    }

    /// Get the raw f32 value
    #[inline]
    #[must_use]
    pub fn value(self) -> f32 {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_hourly_rate_to_si() {
        let rate = MillimetersPerHour::new(3600.0);
        assert_eq!(*rate.to_meters_per_second(), 0.001);
    }

    #[test]
    fn test_daily_to_hourly() {
        let hourly: MillimetersPerHour = MillimetersPerDay::new(50.0).into();
        assert_relative_eq!(*hourly, 50.0 / 24.0, epsilon = 1e-6);
    }

    #[test]
    fn test_depth_over_interval() {
        let v = MetersPerSecond::new(0.002);
        assert_relative_eq!(v.over(Seconds::new(10.0)), 0.02, epsilon = 1e-7);
    }

    #[test]
    fn test_ordering_and_display() {
        let a = MillimetersPerHour::new(1.0);
        let b = MillimetersPerHour::new(2.0);
        assert_eq!(a.max(b), b);
        assert_eq!(format!("{a}"), "1.000 mm/h");
    }

    #[test]
    #[should_panic(expected = "negative duration")]
    fn test_negative_seconds_rejected() {
        let _ = Seconds::new(-1.0);
    }
}
