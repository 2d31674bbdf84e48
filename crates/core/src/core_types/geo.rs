//! Geographic coordinates and the local metric used across the grid
//!
//! Grid spacing, pulse radii and cell areas all go through [`LocalScale`], an
//! equirectangular approximation anchored at the grid center. It is accurate
//! to well under a percent over the few-kilometer extents a flood grid covers.
//! Render positions use the full WGS84 ellipsoid via [`geodetic_to_ecef`].

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Meters per degree of latitude
pub const METERS_PER_DEGREE_LAT: f64 = 110_540.0;

/// Meters per degree of longitude at the equator
pub const METERS_PER_DEGREE_LON: f64 = 111_320.0;

/// WGS84 semi-major axis (m)
pub const WGS84_SEMI_MAJOR: f64 = 6_378_137.0;

/// WGS84 flattening
pub const WGS84_FLATTENING: f64 = 1.0 / 298.257_223_563;

/// A longitude/latitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Longitude in degrees, positive east
    pub longitude: f64,
    /// Latitude in degrees, positive north
    pub latitude: f64,
}

impl GeoPoint {
    /// Create a new point
    #[must_use]
    pub const fn new(longitude: f64, latitude: f64) -> Self {
        Self {
            longitude,
            latitude,
        }
    }

    /// Both components finite
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.longitude.is_finite() && self.latitude.is_finite()
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.longitude, self.latitude)
    }
}

/// Local meters-per-degree scale anchored at a reference latitude
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalScale {
    /// Meters per degree of longitude at the reference latitude
    pub meters_per_degree_lon: f64,
    /// Meters per degree of latitude
    pub meters_per_degree_lat: f64,
}

impl LocalScale {
    /// Scale at the given latitude (degrees)
    #[must_use]
    pub fn at_latitude(latitude: f64) -> Self {
        Self {
            meters_per_degree_lon: METERS_PER_DEGREE_LON * latitude.to_radians().cos(),
            meters_per_degree_lat: METERS_PER_DEGREE_LAT,
        }
    }

    /// East/north offset in meters from `origin` to `point`
    #[must_use]
    pub fn offset_meters(&self, origin: GeoPoint, point: GeoPoint) -> (f64, f64) {
        (
            (point.longitude - origin.longitude) * self.meters_per_degree_lon,
            (point.latitude - origin.latitude) * self.meters_per_degree_lat,
        )
    }

    /// Straight-line ground distance between two points in meters
    #[must_use]
    pub fn distance_meters(&self, a: GeoPoint, b: GeoPoint) -> f64 {
        let (dx, dy) = self.offset_meters(a, b);
        dx.hypot(dy)
    }

    /// Point displaced from `origin` by east/north meters
    #[must_use]
    pub fn displace(&self, origin: GeoPoint, east: f64, north: f64) -> GeoPoint {
        GeoPoint::new(
            origin.longitude + east / self.meters_per_degree_lon,
            origin.latitude + north / self.meters_per_degree_lat,
        )
    }
}

/// Axis-aligned geographic rectangle in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoRectangle {
    /// Western longitude
    pub west: f64,
    /// Southern latitude
    pub south: f64,
    /// Eastern longitude
    pub east: f64,
    /// Northern latitude
    pub north: f64,
}

impl GeoRectangle {
    /// Whether `point` lies inside or on the edge
    #[must_use]
    pub fn contains(&self, point: GeoPoint) -> bool {
        point.longitude >= self.west
            && point.longitude <= self.east
            && point.latitude >= self.south
            && point.latitude <= self.north
    }
}

/// Convert geodetic coordinates plus ellipsoidal height to Earth-centered,
/// Earth-fixed Cartesian meters on the WGS84 ellipsoid
#[must_use]
pub fn geodetic_to_ecef(point: GeoPoint, height: f64) -> Vector3<f64> {
    let e2 = WGS84_FLATTENING * (2.0 - WGS84_FLATTENING);
    let lat = point.latitude.to_radians();
    let lon = point.longitude.to_radians();
    let (sin_lat, cos_lat) = lat.sin_cos();
    let (sin_lon, cos_lon) = lon.sin_cos();

    // Prime vertical radius of curvature
    let n = WGS84_SEMI_MAJOR / (1.0 - e2 * sin_lat * sin_lat).sqrt();

    Vector3::new(
        (n + height) * cos_lat * cos_lon,
        (n + height) * cos_lat * sin_lon,
        (n * (1.0 - e2) + height) * sin_lat,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_ecef_on_equator_prime_meridian() {
        let p = geodetic_to_ecef(GeoPoint::new(0.0, 0.0), 0.0);
        assert_relative_eq!(p.x, WGS84_SEMI_MAJOR, epsilon = 1e-6);
        assert_relative_eq!(p.y, 0.0, epsilon = 1e-6);
        assert_relative_eq!(p.z, 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_ecef_height_moves_outward() {
        let point = GeoPoint::new(106.7, 10.76);
        let low = geodetic_to_ecef(point, 0.0);
        let high = geodetic_to_ecef(point, 100.0);
        assert_relative_eq!(high.norm() - low.norm(), 100.0, epsilon = 0.01);
    }

    #[test]
    fn test_local_scale_round_trip() {
        let scale = LocalScale::at_latitude(10.76);
        let origin = GeoPoint::new(106.7, 10.76);
        let moved = scale.displace(origin, 300.0, -400.0);
        assert_relative_eq!(scale.distance_meters(origin, moved), 500.0, epsilon = 1e-6);
    }

    #[test]
    fn test_longitude_scale_shrinks_with_latitude() {
        let equator = LocalScale::at_latitude(0.0);
        let north = LocalScale::at_latitude(60.0);
        assert_relative_eq!(equator.meters_per_degree_lon, METERS_PER_DEGREE_LON);
        assert_relative_eq!(
            north.meters_per_degree_lon,
            METERS_PER_DEGREE_LON * 0.5,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_rectangle_contains() {
        let rect = GeoRectangle {
            west: 0.0,
            south: 0.0,
            east: 1.0,
            north: 1.0,
        };
        assert!(rect.contains(GeoPoint::new(0.5, 0.5)));
        assert!(rect.contains(GeoPoint::new(1.0, 0.0)));
        assert!(!rect.contains(GeoPoint::new(1.1, 0.5)));
    }
}
