//! Terrain height sources for grid initialization
//!
//! The grid never samples terrain after start-up, so providers only need to
//! answer one batch query. [`GeoTerrain`] places a [`TerrainData`] heightmap
//! on the globe and serves both the detailed and the coarse query.

use crate::core_types::geo::{GeoPoint, LocalScale};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Coarse level at which a decimated query equals full resolution
const FULL_DETAIL_LEVEL: u32 = 12;

/// Errors returned by terrain providers
#[derive(Debug, Clone, PartialEq)]
pub enum TerrainError {
    /// Provider cannot answer right now
    Unavailable(String),
    /// Query point is not a usable coordinate
    OutOfDomain(GeoPoint),
    /// Provider returned the wrong number of heights
    LengthMismatch {
        /// Number of points queried
        expected: usize,
        /// Number of heights returned
        actual: usize,
    },
    /// Heightmap dimensions do not match its data
    InvalidHeightmap(String),
}

impl fmt::Display for TerrainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TerrainError::Unavailable(msg) => write!(f, "Terrain unavailable: {msg}"),
            TerrainError::OutOfDomain(p) => write!(f, "Point {p} outside terrain domain"),
            TerrainError::LengthMismatch { expected, actual } => {
                write!(f, "Terrain returned {actual} heights for {expected} points")
            }
            TerrainError::InvalidHeightmap(msg) => write!(f, "Invalid heightmap: {msg}"),
        }
    }
}

impl std::error::Error for TerrainError {}

/// Batch elevation source queried once during grid initialization
pub trait TerrainHeightProvider {
    /// Heights in meters for each point, in query order
    ///
    /// # Errors
    ///
    /// Returns an error when the provider cannot answer.
    fn sample_heights(&self, points: &[GeoPoint]) -> Result<Vec<f32>, TerrainError>;

    /// Lower-detail query used after the detailed one fails
    ///
    /// `level` follows tile pyramid numbering: higher is finer.
    ///
    /// # Errors
    ///
    /// Returns an error when the provider cannot answer.
    fn sample_heights_coarse(
        &self,
        level: u32,
        points: &[GeoPoint],
    ) -> Result<Vec<f32>, TerrainError> {
        let _ = level;
        self.sample_heights(points)
    }
}

/// Regular elevation lattice in local meters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerrainData {
    /// Width of terrain in meters
    pub(crate) width: f32,
    /// Height of terrain in meters
    pub(crate) height: f32,
    /// Meters per sample
    pub(crate) resolution: f32,
    /// Samples in X direction
    pub(crate) nx: usize,
    /// Samples in Y direction
    pub(crate) ny: usize,
    /// Elevations in meters, row-major `[y * nx + x]`, y increasing north
    pub(crate) elevations: Vec<f32>,
    pub(crate) min_elevation: f32,
    pub(crate) max_elevation: f32,
}

impl TerrainData {
    fn from_fn(width: f32, height: f32, resolution: f32, f: impl Fn(f32, f32) -> f32) -> Self {
        let nx = ((width / resolution).ceil() as usize + 1).max(2);
        let ny = ((height / resolution).ceil() as usize + 1).max(2);
        let mut elevations = Vec::with_capacity(nx * ny);
        let mut min_elev = f32::MAX;
        let mut max_elev = f32::MIN;

        for iy in 0..ny {
            for ix in 0..nx {
                let elev = f(ix as f32 * resolution, iy as f32 * resolution);
                elevations.push(elev);
                min_elev = min_elev.min(elev);
                max_elev = max_elev.max(elev);
            }
        }

        TerrainData {
            width,
            height,
            resolution,
            nx,
            ny,
            elevations,
            min_elevation: min_elev,
            max_elevation: max_elev,
        }
    }

    /// Flat terrain at a fixed elevation
    pub fn flat(width: f32, height: f32, resolution: f32, elevation: f32) -> Self {
        Self::from_fn(width, height, resolution, |_, _| elevation)
    }

    /// Gaussian hill in the middle of the tile
    pub fn single_hill(
        width: f32,
        height: f32,
        resolution: f32,
        base_elevation: f32,
        hill_height: f32,
        hill_radius: f32,
    ) -> Self {
        let (cx, cy) = (width / 2.0, height / 2.0);
        Self::from_fn(width, height, resolution, |x, y| {
            let d2 = (x - cx).powi(2) + (y - cy).powi(2);
            base_elevation + hill_height * (-d2 / (hill_radius * hill_radius)).exp()
        })
    }

    /// Two hills along the east-west axis with a trough between them
    pub fn valley_between_hills(
        width: f32,
        height: f32,
        resolution: f32,
        base_elevation: f32,
        hill_height: f32,
    ) -> Self {
        let hill_radius = width * 0.2;
        let cy = height / 2.0;
        let hill = move |x: f32, y: f32, hx: f32| {
            let d2 = (x - hx).powi(2) + (y - cy).powi(2);
            hill_height * (-d2 / (hill_radius * hill_radius)).exp()
        };
        Self::from_fn(width, height, resolution, |x, y| {
            let v = (x - width / 2.0) / (width * 0.25);
            let trough = -10.0 * (-(v * v)).exp();
            base_elevation + hill(x, y, width * 0.25) + hill(x, y, width * 0.75) + trough
        })
    }

    /// Seeded field of Gaussian bumps, reproducible for a given seed
    pub fn random_hills(
        width: f32,
        height: f32,
        resolution: f32,
        base_elevation: f32,
        max_hill_height: f32,
        hill_count: usize,
        seed: u64,
    ) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let max_radius = (width.min(height) * 0.3).max(resolution * 2.0);
        let hills: Vec<(f32, f32, f32, f32)> = (0..hill_count)
            .map(|_| {
                (
                    rng.random_range(0.0..=width),
                    rng.random_range(0.0..=height),
                    rng.random_range(0.0..=max_hill_height.max(0.0)),
                    rng.random_range(resolution..=max_radius),
                )
            })
            .collect();

        Self::from_fn(width, height, resolution, |x, y| {
            hills.iter().fold(base_elevation, |acc, &(hx, hy, h, r)| {
                let d2 = (x - hx).powi(2) + (y - hy).powi(2);
                acc + h * (-d2 / (r * r)).exp()
            })
        })
    }

    /// Terrain from a normalized heightmap
    ///
    /// # Arguments
    /// * `width` - Width of terrain in meters
    /// * `height` - Height of terrain in meters
    /// * `heightmap` - Values in row-major order `[y * nx + x]`
    /// * `nx` - Samples in X direction
    /// * `ny` - Samples in Y direction
    /// * `elevation_scale` - Multiplier for heightmap values
    /// * `base_elevation` - Added to every height
    ///
    /// # Errors
    ///
    /// Returns [`TerrainError::InvalidHeightmap`] when the data length does not
    /// match `nx * ny` or either dimension is below 2.
    pub fn from_heightmap(
        width: f32,
        height: f32,
        heightmap: &[f32],
        nx: usize,
        ny: usize,
        elevation_scale: f32,
        base_elevation: f32,
    ) -> Result<Self, TerrainError> {
        if nx < 2 || ny < 2 {
            return Err(TerrainError::InvalidHeightmap(format!(
                "need at least 2x2 samples, got {nx}x{ny}"
            )));
        }
        if heightmap.len() != nx * ny {
            return Err(TerrainError::InvalidHeightmap(format!(
                "{} values for {nx}x{ny} samples",
                heightmap.len()
            )));
        }

        let mut min_elev = f32::MAX;
        let mut max_elev = f32::MIN;
        let elevations: Vec<f32> = heightmap
            .iter()
            .map(|&h| {
                let elev = base_elevation + h * elevation_scale;
                min_elev = min_elev.min(elev);
                max_elev = max_elev.max(elev);
                elev
            })
            .collect();

        Ok(TerrainData {
            width,
            height,
            resolution: width / (nx - 1) as f32,
            nx,
            ny,
            elevations,
            min_elevation: min_elev,
            max_elevation: max_elev,
        })
    }

    /// Elevation at local position (x, y) using bilinear interpolation
    ///
    /// Positions outside the tile are clamped to its edge.
    pub fn elevation_at(&self, x: f32, y: f32) -> f32 {
        let gx = x.clamp(0.0, self.width) / self.resolution;
        let gy = y.clamp(0.0, self.height) / self.resolution;

        let ix0 = (gx.floor() as usize).min(self.nx - 2);
        let iy0 = (gy.floor() as usize).min(self.ny - 2);
        let fx = (gx - ix0 as f32).clamp(0.0, 1.0);
        let fy = (gy - iy0 as f32).clamp(0.0, 1.0);

        let e00 = self.sample(ix0, iy0);
        let e10 = self.sample(ix0 + 1, iy0);
        let e01 = self.sample(ix0, iy0 + 1);
        let e11 = self.sample(ix0 + 1, iy0 + 1);

        let e0 = e00 * (1.0 - fx) + e10 * fx;
        let e1 = e01 * (1.0 - fx) + e11 * fx;
        e0 * (1.0 - fy) + e1 * fy
    }

    /// Nearest sample on a lattice decimated by `stride`
    pub fn elevation_at_decimated(&self, x: f32, y: f32, stride: usize) -> f32 {
        let stride = stride.max(1);
        let snap = |v: f32, extent: f32, n: usize| {
            let g = v.clamp(0.0, extent) / self.resolution;
            let k = (g / stride as f32).round() as usize * stride;
            // Last coarse sample may fall past the edge
            k.min(n - 1)
        };
        self.sample(snap(x, self.width, self.nx), snap(y, self.height, self.ny))
    }

    #[inline]
    fn sample(&self, ix: usize, iy: usize) -> f32 {
        self.elevations[iy * self.nx + ix]
    }

    /// Width in meters
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Height in meters
    pub fn height(&self) -> f32 {
        self.height
    }

    /// Lowest elevation
    pub fn min_elevation(&self) -> f32 {
        self.min_elevation
    }

    /// Highest elevation
    pub fn max_elevation(&self) -> f32 {
        self.max_elevation
    }

    /// Meters per sample
    pub fn resolution(&self) -> f32 {
        self.resolution
    }
}

/// A [`TerrainData`] tile centered on a geographic point
#[derive(Debug, Clone)]
pub struct GeoTerrain {
    data: TerrainData,
    /// Southwest corner of the tile
    origin: GeoPoint,
    scale: LocalScale,
}

impl GeoTerrain {
    /// Place `data` so its middle sits on `center`
    pub fn centered(data: TerrainData, center: GeoPoint) -> Self {
        let scale = LocalScale::at_latitude(center.latitude);
        let origin = scale.displace(
            center,
            -f64::from(data.width) / 2.0,
            -f64::from(data.height) / 2.0,
        );
        Self {
            data,
            origin,
            scale,
        }
    }

    /// Underlying heightmap
    pub fn data(&self) -> &TerrainData {
        &self.data
    }

    fn local(&self, point: GeoPoint) -> Result<(f32, f32), TerrainError> {
        if !point.is_finite() {
            return Err(TerrainError::OutOfDomain(point));
        }
        let (x, y) = self.scale.offset_meters(self.origin, point);
        Ok((x as f32, y as f32))
    }
}

impl TerrainHeightProvider for GeoTerrain {
    fn sample_heights(&self, points: &[GeoPoint]) -> Result<Vec<f32>, TerrainError> {
        points
            .iter()
            .map(|&p| {
                let (x, y) = self.local(p)?;
                Ok(self.data.elevation_at(x, y))
            })
            .collect()
    }

    fn sample_heights_coarse(
        &self,
        level: u32,
        points: &[GeoPoint],
    ) -> Result<Vec<f32>, TerrainError> {
        let stride = 1_usize << (FULL_DETAIL_LEVEL - level.min(FULL_DETAIL_LEVEL));
        points
            .iter()
            .map(|&p| {
                let (x, y) = self.local(p)?;
                Ok(self.data.elevation_at_decimated(x, y, stride))
            })
            .collect()
    }
}
