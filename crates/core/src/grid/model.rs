//! Georeferenced cell layout and the terrain sampled onto it
//!
//! Cells are indexed `(i, j)` with `i` growing east and `j` growing north.
//! Vertex `(i, j)` is the southwest corner of cell `(i, j)`; the grid has
//! `(width + 1) x (height + 1)` vertices.

use super::spec::{GridSpec, GridSpecError};
use super::terrain::{TerrainError, TerrainHeightProvider};
use crate::core_types::geo::{GeoPoint, GeoRectangle, LocalScale};
use crate::solver::FieldData;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Default tile level for the fallback terrain query
pub const DEFAULT_FALLBACK_LEVEL: u32 = 11;

/// Which terrain query produced the grid's heights
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerrainQuality {
    /// Full-detail query succeeded
    Detailed,
    /// Detailed query failed, coarse query succeeded
    Coarse,
    /// Both queries failed; all heights are zero
    Defaulted,
}

/// Grid geometry plus cell and vertex terrain
#[derive(Debug, Clone)]
pub struct GridModel {
    spec: GridSpec,
    scale: LocalScale,
    /// Southwest corner of the grid
    origin: GeoPoint,
    delta_lon: f64,
    delta_lat: f64,
    cell_terrain: FieldData,
    vertex_terrain: FieldData,
    quality: TerrainQuality,
}

impl GridModel {
    /// Build the grid and sample its terrain with one batch query
    ///
    /// The query holds every cell center followed by every vertex. On failure
    /// the provider's coarse query at `fallback_level` is tried, and if that
    /// fails too all heights default to zero.
    ///
    /// # Errors
    ///
    /// Returns [`GridSpecError`] if `spec` is invalid. Terrain failures are
    /// never errors.
    pub fn initialize(
        spec: GridSpec,
        provider: &dyn TerrainHeightProvider,
        fallback_level: u32,
    ) -> Result<Self, GridSpecError> {
        let mut model = Self::flat(spec)?;
        let cells = spec.cell_count();
        let points: Vec<GeoPoint> = (0..spec.height)
            .flat_map(|j| (0..spec.width).map(move |i| (i, j)))
            .map(|(i, j)| model.cell_center(i, j))
            .chain(
                (0..=spec.height)
                    .flat_map(|j| (0..=spec.width).map(move |i| (i, j)))
                    .map(|(i, j)| model.vertex_position(i, j)),
            )
            .collect();
        let expected = points.len();

        let checked = |result: Result<Vec<f32>, TerrainError>| {
            result.and_then(|heights| {
                if heights.len() == expected {
                    Ok(heights)
                } else {
                    Err(TerrainError::LengthMismatch {
                        expected,
                        actual: heights.len(),
                    })
                }
            })
        };

        let (heights, quality) = match checked(provider.sample_heights(&points)) {
            Ok(h) => (Some(h), TerrainQuality::Detailed),
            Err(e) => {
                warn!(error = %e, level = fallback_level, "Detailed terrain query failed, trying coarse");
                match checked(provider.sample_heights_coarse(fallback_level, &points)) {
                    Ok(h) => (Some(h), TerrainQuality::Coarse),
                    Err(e) => {
                        warn!(error = %e, "Coarse terrain query failed, starting on flat terrain");
                        (None, TerrainQuality::Defaulted)
                    }
                }
            }
        };

        if let Some(mut heights) = heights {
            let mut replaced = 0_usize;
            for h in &mut heights {
                if !h.is_finite() {
                    *h = 0.0;
                    replaced += 1;
                }
            }
            if replaced > 0 {
                warn!(replaced, "Replaced non-finite terrain heights with 0");
            }
            let vertices = heights.split_off(cells);
            model.cell_terrain.data = heights;
            model.vertex_terrain.data = vertices;
        }
        model.quality = quality;

        info!(
            width = spec.width,
            height = spec.height,
            ?quality,
            "Grid model initialized"
        );
        Ok(model)
    }

    /// Build the grid from heights the caller already has
    ///
    /// # Errors
    ///
    /// Returns [`GridSpecError`] if `spec` is invalid or either height slice
    /// has the wrong length.
    pub fn from_heights(
        spec: GridSpec,
        cell_heights: Vec<f32>,
        vertex_heights: Vec<f32>,
    ) -> Result<Self, GridSpecError> {
        let mut model = Self::flat(spec)?;
        let actual = cell_heights.len();
        model.cell_terrain = FieldData::from_vec(spec.width, spec.height, cell_heights).ok_or(
            GridSpecError::TerrainLength {
                expected: spec.cell_count(),
                actual,
            },
        )?;
        let actual = vertex_heights.len();
        model.vertex_terrain = FieldData::from_vec(spec.width + 1, spec.height + 1, vertex_heights)
            .ok_or(GridSpecError::TerrainLength {
                expected: (spec.width + 1) * (spec.height + 1),
                actual,
            })?;
        model.quality = TerrainQuality::Detailed;
        Ok(model)
    }

    /// Grid with all heights zero
    ///
    /// # Errors
    ///
    /// Returns [`GridSpecError`] if `spec` is invalid.
    pub fn flat(spec: GridSpec) -> Result<Self, GridSpecError> {
        spec.validate()?;
        let (delta_lon, delta_lat) = spec.degrees_per_cell();
        let origin = GeoPoint::new(
            spec.center.longitude - delta_lon * spec.width as f64 / 2.0,
            spec.center.latitude - delta_lat * spec.height as f64 / 2.0,
        );
        Ok(Self {
            spec,
            scale: spec.scale(),
            origin,
            delta_lon,
            delta_lat,
            cell_terrain: FieldData::new(spec.width, spec.height),
            vertex_terrain: FieldData::new(spec.width + 1, spec.height + 1),
            quality: TerrainQuality::Defaulted,
        })
    }

    /// Grid description
    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    /// Cells along the east-west axis
    #[inline]
    pub fn width(&self) -> usize {
        self.spec.width
    }

    /// Cells along the south-north axis
    #[inline]
    pub fn height(&self) -> usize {
        self.spec.height
    }

    /// Total cells
    pub fn cell_count(&self) -> usize {
        self.spec.cell_count()
    }

    /// Terrain at cell centers
    pub fn cell_terrain(&self) -> &FieldData {
        &self.cell_terrain
    }

    /// Terrain at cell corners
    pub fn vertex_terrain(&self) -> &FieldData {
        &self.vertex_terrain
    }

    /// How the terrain was obtained
    pub fn quality(&self) -> TerrainQuality {
        self.quality
    }

    /// Local metric at the grid center
    pub fn scale(&self) -> LocalScale {
        self.scale
    }

    /// Flat index of cell `(i, j)`
    #[inline]
    pub fn cell_index(&self, i: usize, j: usize) -> usize {
        debug_assert!(i < self.width() && j < self.height());
        j * self.width() + i
    }

    /// Inverse of [`Self::cell_index`]
    #[inline]
    pub fn cell_coords(&self, index: usize) -> (usize, usize) {
        (index % self.width(), index / self.width())
    }

    /// In-bounds von Neumann neighbors, west, east, south, north
    pub fn neighbors(&self, i: usize, j: usize) -> impl Iterator<Item = (usize, usize)> {
        neighbor_slots(i, j, self.width(), self.height())
            .into_iter()
            .flatten()
    }

    /// Geographic center of cell `(i, j)`
    pub fn cell_center(&self, i: usize, j: usize) -> GeoPoint {
        GeoPoint::new(
            self.origin.longitude + (i as f64 + 0.5) * self.delta_lon,
            self.origin.latitude + (j as f64 + 0.5) * self.delta_lat,
        )
    }

    /// Geographic position of vertex `(i, j)`, `i <= width`, `j <= height`
    pub fn vertex_position(&self, i: usize, j: usize) -> GeoPoint {
        GeoPoint::new(
            self.origin.longitude + i as f64 * self.delta_lon,
            self.origin.latitude + j as f64 * self.delta_lat,
        )
    }

    /// Cell containing `point`, `None` outside the grid
    pub fn cell_at(&self, point: GeoPoint) -> Option<(usize, usize)> {
        if !point.is_finite() {
            return None;
        }
        let fx = (point.longitude - self.origin.longitude) / self.delta_lon;
        let fy = (point.latitude - self.origin.latitude) / self.delta_lat;
        if fx < 0.0 || fy < 0.0 {
            return None;
        }
        let (i, j) = (fx.floor() as usize, fy.floor() as usize);
        (i < self.width() && j < self.height()).then_some((i, j))
    }

    /// Ground distance in meters between two points
    pub fn distance_meters(&self, a: GeoPoint, b: GeoPoint) -> f64 {
        self.scale.distance_meters(a, b)
    }

    /// Rectangle covering every cell
    pub fn bounds(&self) -> GeoRectangle {
        let ne = self.vertex_position(self.width(), self.height());
        GeoRectangle {
            west: self.origin.longitude,
            south: self.origin.latitude,
            east: ne.longitude,
            north: ne.latitude,
        }
    }

    /// Cell footprint in square meters
    pub fn cell_area_m2(&self) -> f64 {
        let dx = self.delta_lon * self.scale.meters_per_degree_lon;
        let dy = self.delta_lat * self.scale.meters_per_degree_lat;
        dx * dy
    }
}

/// Von Neumann neighbors of cell `(i, j)` on a `width x height` grid
///
/// Slots are west, east, south, north; a slot is `None` where the neighbor
/// would fall outside the grid.
#[inline]
pub fn neighbor_slots(
    i: usize,
    j: usize,
    width: usize,
    height: usize,
) -> [Option<(usize, usize)>; 4] {
    [
        i.checked_sub(1).map(|x| (x, j)),
        (i + 1 < width).then_some((i + 1, j)),
        j.checked_sub(1).map(|y| (i, y)),
        (j + 1 < height).then_some((i, j + 1)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::spec::{CellSize, DEFAULT_CENTER};
    use crate::grid::terrain::{GeoTerrain, TerrainData};
    use approx::assert_relative_eq;

    struct Failing;

    impl TerrainHeightProvider for Failing {
        fn sample_heights(&self, _: &[GeoPoint]) -> Result<Vec<f32>, TerrainError> {
            Err(TerrainError::Unavailable("offline".into()))
        }
    }

    struct CoarseOnly;

    impl TerrainHeightProvider for CoarseOnly {
        fn sample_heights(&self, points: &[GeoPoint]) -> Result<Vec<f32>, TerrainError> {
            Ok(vec![1.0; points.len() - 1])
        }

        fn sample_heights_coarse(
            &self,
            level: u32,
            points: &[GeoPoint],
        ) -> Result<Vec<f32>, TerrainError> {
            assert_eq!(level, DEFAULT_FALLBACK_LEVEL);
            Ok(vec![2.0; points.len()])
        }
    }

    fn spec(w: usize, h: usize) -> GridSpec {
        GridSpec::new(w, h, CellSize::Degrees(0.001), DEFAULT_CENTER)
    }

    #[test]
    fn test_index_round_trip() {
        let grid = GridModel::flat(spec(7, 5)).unwrap();
        for index in 0..grid.cell_count() {
            let (i, j) = grid.cell_coords(index);
            assert_eq!(grid.cell_index(i, j), index);
        }
    }

    #[test]
    fn test_cell_center_inverse() {
        let grid = GridModel::flat(spec(6, 4)).unwrap();
        for j in 0..4 {
            for i in 0..6 {
                assert_eq!(grid.cell_at(grid.cell_center(i, j)), Some((i, j)));
            }
        }
        let b = grid.bounds();
        assert_eq!(grid.cell_at(GeoPoint::new(b.west - 1e-6, b.south)), None);
        assert_eq!(grid.cell_at(GeoPoint::new(b.east + 1e-6, b.north)), None);
    }

    #[test]
    fn test_grid_centered_on_spec_center() {
        let grid = GridModel::flat(spec(10, 10)).unwrap();
        let b = grid.bounds();
        assert_relative_eq!((b.west + b.east) / 2.0, DEFAULT_CENTER.longitude, epsilon = 1e-9);
        assert_relative_eq!((b.south + b.north) / 2.0, DEFAULT_CENTER.latitude, epsilon = 1e-9);
    }

    #[test]
    fn test_neighbors_respect_boundary() {
        let grid = GridModel::flat(spec(3, 3)).unwrap();
        let corner: Vec<_> = grid.neighbors(0, 0).collect();
        assert_eq!(corner, vec![(1, 0), (0, 1)]);
        assert_eq!(grid.neighbors(1, 1).count(), 4);
        let edge: Vec<_> = grid.neighbors(2, 1).collect();
        assert_eq!(edge, vec![(1, 1), (2, 0), (2, 2)]);
    }

    #[test]
    fn test_meter_cells_have_expected_area() {
        let grid = GridModel::flat(GridSpec::new(4, 4, CellSize::Meters(10.0), DEFAULT_CENTER))
            .unwrap();
        assert_relative_eq!(grid.cell_area_m2(), 100.0, epsilon = 1e-6);
        let d = grid.distance_meters(grid.cell_center(0, 0), grid.cell_center(1, 0));
        assert_relative_eq!(d, 10.0, epsilon = 1e-6);
    }

    #[test]
    fn test_initialize_detailed() {
        let terrain = GeoTerrain::centered(TerrainData::flat(2000.0, 2000.0, 10.0, 7.5), DEFAULT_CENTER);
        let grid = GridModel::initialize(spec(5, 5), &terrain, DEFAULT_FALLBACK_LEVEL).unwrap();
        assert_eq!(grid.quality(), TerrainQuality::Detailed);
        assert!(grid.cell_terrain().data.iter().all(|&h| (h - 7.5).abs() < 1e-4));
        assert_eq!(grid.vertex_terrain().len(), 36);
    }

    #[test]
    fn test_length_mismatch_falls_back_to_coarse() {
        let grid = GridModel::initialize(spec(4, 4), &CoarseOnly, DEFAULT_FALLBACK_LEVEL).unwrap();
        assert_eq!(grid.quality(), TerrainQuality::Coarse);
        assert_eq!(grid.cell_terrain().get(2, 2), 2.0);
    }

    #[test]
    fn test_failing_provider_defaults_to_zero() {
        let grid = GridModel::initialize(spec(4, 4), &Failing, DEFAULT_FALLBACK_LEVEL).unwrap();
        assert_eq!(grid.quality(), TerrainQuality::Defaulted);
        assert!(grid.cell_terrain().data.iter().all(|&h| h == 0.0));
        assert!(grid.vertex_terrain().data.iter().all(|&h| h == 0.0));
    }

    #[test]
    fn test_invalid_spec_is_rejected() {
        assert!(GridModel::initialize(spec(1, 4), &Failing, DEFAULT_FALLBACK_LEVEL).is_err());
    }

    #[test]
    fn test_from_heights_checks_lengths() {
        let err = GridModel::from_heights(spec(2, 2), vec![0.0; 4], vec![0.0; 8]);
        assert_eq!(
            err.unwrap_err(),
            GridSpecError::TerrainLength {
                expected: 9,
                actual: 8
            }
        );
    }
}
