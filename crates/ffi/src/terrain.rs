//! FFI-exposed terrain configuration types.
//!
//! The `Terrain` enum describes a synthetic or caller-supplied heightmap. It is
//! centered on the grid center when the instance is created and sampled once,
//! like any other height provider.

use crate::error::DefaultFloodSimError;
use flood_sim_core::TerrainData;

/// Terrain under the flood grid.
///
/// FFI-safe tagged union (`#[repr(C)]`); every variant's `width` and `height`
/// are the footprint in meters.
///
/// # Example (Conceptual)
///
/// ```c
/// Terrain terrain;
/// terrain.tag = Terrain_SingleHill;
/// terrain.single_hill.width = 6000.0;
/// terrain.single_hill.height = 6000.0;
/// terrain.single_hill.resolution = 20.0;
/// terrain.single_hill.base_elevation = 2.0;
/// terrain.single_hill.hill_height = 15.0;
/// terrain.single_hill.hill_radius = 1500.0;
/// ```
#[repr(C)]
pub enum Terrain {
    /// Level ground.
    Flat {
        /// Width of the terrain in meters.
        width: f32,
        /// Height of the terrain in meters.
        height: f32,
        /// Heightmap sample spacing in meters.
        resolution: f32,
        /// Elevation in meters.
        base_elevation: f32,
    },

    /// One cosine hill in the middle.
    SingleHill {
        /// Width of the terrain in meters.
        width: f32,
        /// Height of the terrain in meters.
        height: f32,
        /// Heightmap sample spacing in meters.
        resolution: f32,
        /// Elevation around the hill in meters.
        base_elevation: f32,
        /// Height of the hill above base elevation in meters.
        hill_height: f32,
        /// Radius of the hill in meters.
        hill_radius: f32,
    },

    /// Valley running north-south between two ridges.
    ValleyBetweenHills {
        /// Width of the terrain in meters.
        width: f32,
        /// Height of the terrain in meters.
        height: f32,
        /// Heightmap sample spacing in meters.
        resolution: f32,
        /// Elevation of the valley floor in meters.
        base_elevation: f32,
        /// Height of the ridges above base elevation in meters.
        hill_height: f32,
    },

    /// Seeded random hills; the same seed gives the same terrain.
    RandomHills {
        /// Width of the terrain in meters.
        width: f32,
        /// Height of the terrain in meters.
        height: f32,
        /// Heightmap sample spacing in meters.
        resolution: f32,
        /// Elevation between hills in meters.
        base_elevation: f32,
        /// Tallest possible hill above base elevation in meters.
        max_hill_height: f32,
        /// Number of hills.
        hill_count: u32,
        /// RNG seed.
        seed: u64,
    },

    /// Create terrain from a heightmap.
    ///
    /// The heightmap pointer should point to nx*ny f32 values in row-major
    /// order, row 0 at the south edge.
    FromHeightmap {
        /// Width of the terrain in meters.
        width: f32,
        /// Height of the terrain in meters.
        height: f32,
        /// Pointer to heightmap data (nx*ny f32 values in row-major order).
        heightmap_ptr: *const f32,
        /// Number of columns in the heightmap grid.
        nx: usize,
        /// Number of rows in the heightmap grid.
        ny: usize,
        /// Scale factor to convert heightmap values to meters.
        elevation_scale: f32,
        /// Base elevation to add to all heightmap values in meters.
        base_elevation: f32,
    },
}

fn check_positive(name: &str, value: f32) -> Result<(), DefaultFloodSimError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(DefaultFloodSimError::invalid_terrain_parameter(name, value))
    }
}

impl Terrain {
    /// Validate and build the heightmap, copying caller memory.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTerrainParameters` for non-positive dimensions or a bad
    /// heightmap size, `NullPointer` for a null heightmap.
    pub(crate) fn to_terrain_data(&self) -> Result<TerrainData, DefaultFloodSimError> {
        match *self {
            Terrain::Flat {
                width,
                height,
                resolution,
                base_elevation,
            } => {
                check_positive("width", width)?;
                check_positive("height", height)?;
                check_positive("resolution", resolution)?;
                Ok(TerrainData::flat(width, height, resolution, base_elevation))
            }

            Terrain::SingleHill {
                width,
                height,
                resolution,
                base_elevation,
                hill_height,
                hill_radius,
            } => {
                check_positive("width", width)?;
                check_positive("height", height)?;
                check_positive("resolution", resolution)?;
                check_positive("hill_radius", hill_radius)?;
                Ok(TerrainData::single_hill(
                    width,
                    height,
                    resolution,
                    base_elevation,
                    hill_height,
                    hill_radius,
                ))
            }

            Terrain::ValleyBetweenHills {
                width,
                height,
                resolution,
                base_elevation,
                hill_height,
            } => {
                check_positive("width", width)?;
                check_positive("height", height)?;
                check_positive("resolution", resolution)?;
                Ok(TerrainData::valley_between_hills(
                    width,
                    height,
                    resolution,
                    base_elevation,
                    hill_height,
                ))
            }

            Terrain::RandomHills {
                width,
                height,
                resolution,
                base_elevation,
                max_hill_height,
                hill_count,
                seed,
            } => {
                check_positive("width", width)?;
                check_positive("height", height)?;
                check_positive("resolution", resolution)?;
                Ok(TerrainData::random_hills(
                    width,
                    height,
                    resolution,
                    base_elevation,
                    max_hill_height,
                    hill_count as usize,
                    seed,
                ))
            }

            Terrain::FromHeightmap {
                width,
                height,
                heightmap_ptr,
                nx,
                ny,
                elevation_scale,
                base_elevation,
            } => {
                check_positive("width", width)?;
                check_positive("height", height)?;
                let len = match nx.checked_mul(ny) {
                    Some(len) if nx >= 2 && ny >= 2 => len,
                    _ => return Err(DefaultFloodSimError::invalid_heightmap_dimensions(nx, ny)),
                };
                if heightmap_ptr.is_null() {
                    return Err(DefaultFloodSimError::null_pointer("heightmap_ptr"));
                }
                // SAFETY: caller guarantees heightmap_ptr points to nx*ny readable f32 values
                let samples = unsafe { std::slice::from_raw_parts(heightmap_ptr, len) };
                TerrainData::from_heightmap(
                    width,
                    height,
                    samples,
                    nx,
                    ny,
                    elevation_scale,
                    base_elevation,
                )
                .map_err(|e| {
                    DefaultFloodSimError::invalid_terrain_parameter_msg("heightmap", &e.to_string())
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{FloodSimError, FloodSimErrorCode};

    #[test]
    fn test_flat_rejects_zero_resolution() {
        let terrain = Terrain::Flat {
            width: 100.0,
            height: 100.0,
            resolution: 0.0,
            base_elevation: 0.0,
        };
        let err = terrain.to_terrain_data().unwrap_err();
        assert_eq!(err.code(), FloodSimErrorCode::InvalidTerrainParameters);
    }

    #[test]
    fn test_heightmap_is_copied() {
        let samples = vec![0.0_f32, 1.0, 2.0, 3.0];
        let terrain = Terrain::FromHeightmap {
            width: 10.0,
            height: 10.0,
            heightmap_ptr: samples.as_ptr(),
            nx: 2,
            ny: 2,
            elevation_scale: 2.0,
            base_elevation: 1.0,
        };
        let data = terrain.to_terrain_data().unwrap();
        drop(samples);
        assert_eq!(data.min_elevation(), 1.0);
        assert_eq!(data.max_elevation(), 7.0);
    }

    #[test]
    fn test_heightmap_null_and_overflow() {
        let null = Terrain::FromHeightmap {
            width: 10.0,
            height: 10.0,
            heightmap_ptr: std::ptr::null(),
            nx: 4,
            ny: 4,
            elevation_scale: 1.0,
            base_elevation: 0.0,
        };
        assert_eq!(
            null.to_terrain_data().unwrap_err().code(),
            FloodSimErrorCode::NullPointer
        );

        let huge = Terrain::FromHeightmap {
            width: 10.0,
            height: 10.0,
            heightmap_ptr: std::ptr::null(),
            nx: usize::MAX,
            ny: 2,
            elevation_scale: 1.0,
            base_elevation: 0.0,
        };
        assert_eq!(
            huge.to_terrain_data().unwrap_err().code(),
            FloodSimErrorCode::InvalidTerrainParameters
        );
    }
}
