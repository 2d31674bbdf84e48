//! Core types shared across the grid, solver and render modules

pub mod geo;
pub mod units;

pub use geo::{geodetic_to_ecef, GeoPoint, GeoRectangle, LocalScale};
pub use units::*;
