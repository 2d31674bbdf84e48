//! Grid geometry and terrain
//!
//! - [`GridSpec`]: immutable dimensions, cell size and center
//! - [`GridModel`]: cell/vertex layout with terrain sampled once at start-up
//! - [`TerrainHeightProvider`]: batch elevation source, with [`GeoTerrain`]
//!   as the bundled heightmap implementation

pub mod model;
pub mod spec;
pub mod terrain;

pub use model::{neighbor_slots, GridModel, TerrainQuality, DEFAULT_FALLBACK_LEVEL};
pub use spec::{CellSize, GridSpec, GridSpecError, DEFAULT_CENTER, DEFAULT_DEGREES_PER_CELL};
pub use terrain::{GeoTerrain, TerrainData, TerrainError, TerrainHeightProvider};
