//! Immutable description of the simulation grid

use crate::core_types::geo::{GeoPoint, LocalScale};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default grid center (Ho Chi Minh City district 1)
pub const DEFAULT_CENTER: GeoPoint = GeoPoint::new(106.70002399070714, 10.761931120498742);

/// Default angular cell size in degrees
pub const DEFAULT_DEGREES_PER_CELL: f64 = 0.0005;

/// Default number of cells along each axis
pub const DEFAULT_GRID_SIZE: usize = 100;

/// Horizontal size of one cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CellSize {
    /// Same angular size along both axes
    Degrees(f64),
    /// Square cells of this many meters, converted at the grid center
    Meters(f32),
}

impl CellSize {
    fn raw(&self) -> f64 {
        match *self {
            CellSize::Degrees(d) => d,
            CellSize::Meters(m) => f64::from(m),
        }
    }
}

/// Grid dimensions, cell size and geographic center
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Cells along the east-west axis
    pub width: usize,
    /// Cells along the south-north axis
    pub height: usize,
    /// Cell size
    pub cell_size: CellSize,
    /// Geographic center of the grid
    pub center: GeoPoint,
}

impl Default for GridSpec {
    fn default() -> Self {
        Self {
            width: DEFAULT_GRID_SIZE,
            height: DEFAULT_GRID_SIZE,
            cell_size: CellSize::Degrees(DEFAULT_DEGREES_PER_CELL),
            center: DEFAULT_CENTER,
        }
    }
}

impl GridSpec {
    /// Create a grid spec
    pub fn new(width: usize, height: usize, cell_size: CellSize, center: GeoPoint) -> Self {
        Self {
            width,
            height,
            cell_size,
            center,
        }
    }

    /// Total number of cells
    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    /// Metric scale at the grid center
    pub fn scale(&self) -> LocalScale {
        LocalScale::at_latitude(self.center.latitude)
    }

    /// Cell size in degrees as `(longitude, latitude)`
    pub fn degrees_per_cell(&self) -> (f64, f64) {
        match self.cell_size {
            CellSize::Degrees(d) => (d, d),
            CellSize::Meters(m) => {
                let scale = self.scale();
                let m = f64::from(m);
                (
                    m / scale.meters_per_degree_lon,
                    m / scale.meters_per_degree_lat,
                )
            }
        }
    }

    /// Check dimensions, cell size and coordinates
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), GridSpecError> {
        if self.width < 2 || self.height < 2 {
            return Err(GridSpecError::TooSmall {
                width: self.width,
                height: self.height,
            });
        }

        let raw = self.cell_size.raw();
        if !raw.is_finite() || raw <= 0.0 {
            return Err(GridSpecError::InvalidCellSize(raw));
        }

        let c = self.center;
        if !c.is_finite()
            || !(-180.0..=180.0).contains(&c.longitude)
            || c.latitude <= -90.0
            || c.latitude >= 90.0
        {
            return Err(GridSpecError::InvalidCenter(c));
        }

        let (_, dlat) = self.degrees_per_cell();
        let half_extent = dlat * self.height as f64 / 2.0;
        let south = c.latitude - half_extent;
        let north = c.latitude + half_extent;
        if south <= -90.0 || north >= 90.0 {
            return Err(GridSpecError::CrossesPole { south, north });
        }

        Ok(())
    }
}

/// Grid construction errors
#[derive(Debug, Clone, PartialEq)]
pub enum GridSpecError {
    /// Either dimension below 2
    TooSmall {
        /// Requested width
        width: usize,
        /// Requested height
        height: usize,
    },
    /// Cell size not a positive finite number
    InvalidCellSize(f64),
    /// Center outside valid longitude/latitude range
    InvalidCenter(GeoPoint),
    /// Grid extent reaches a pole
    CrossesPole {
        /// Southern edge latitude
        south: f64,
        /// Northern edge latitude
        north: f64,
    },
    /// Caller-supplied terrain does not match the grid
    TerrainLength {
        /// Expected number of heights
        expected: usize,
        /// Number supplied
        actual: usize,
    },
}

impl fmt::Display for GridSpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridSpecError::TooSmall { width, height } => {
                write!(f, "Grid must be at least 2x2, got {width}x{height}")
            }
            GridSpecError::InvalidCellSize(size) => write!(f, "Invalid cell size: {size}"),
            GridSpecError::InvalidCenter(c) => write!(f, "Invalid grid center: {c}"),
            GridSpecError::CrossesPole { south, north } => {
                write!(f, "Grid extent {south:.4}..{north:.4} reaches a pole")
            }
            GridSpecError::TerrainLength { expected, actual } => {
                write!(f, "Expected {expected} terrain heights, got {actual}")
            }
        }
    }
}

impl std::error::Error for GridSpecError {}
