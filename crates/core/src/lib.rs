//! Flood Simulation Core Library
//!
//! A grid-based rainfall, surface flow and drainage model for urban flood
//! visualization. Water on each cell moves toward lower-head neighbors at a
//! rate proportional to the head difference, never more than the cell holds.
//!
//! ## Layout
//!
//! - [`grid`]: georeferenced grid and one-time terrain sampling
//! - [`solver`]: hydraulic engine, parameters and tick planning
//! - [`render`]: water surface mesh and depth raster builders
//! - [`simulation`]: the controller hosts drive, plus its control queue
//! - [`config`]: JSON configuration
//!
//! ## Example
//!
//! ```
//! use flood_sim_core::{GeoTerrain, SimulationConfig, SimulationController, TerrainData};
//!
//! let config = SimulationConfig::default();
//! let terrain = GeoTerrain::centered(
//!     TerrainData::single_hill(6000.0, 6000.0, 20.0, 2.0, 15.0, 1500.0),
//!     config.grid.center,
//! );
//! let mut sim = SimulationController::from_config(&config, &terrain).unwrap();
//! sim.tick(0.016);
//! assert!(sim.stats().total_volume_m3 >= 0.0);
//! ```

pub mod config;
pub mod core_types;
pub mod grid;
pub mod render;
pub mod simulation;
pub mod solver;

pub use config::{ConfigError, SimulationConfig};
pub use core_types::{GeoPoint, GeoRectangle, MillimetersPerDay, MillimetersPerHour, Seconds};
pub use grid::{
    CellSize, GeoTerrain, GridModel, GridSpec, GridSpecError, TerrainData, TerrainError,
    TerrainHeightProvider, TerrainQuality,
};
pub use render::{BuildError, DepthImage, OutputMode, RenderOutput, WaterMesh};
pub use simulation::{ControlAction, ControlHandle, SimulationController, SimulationStats};
pub use solver::{FieldData, HydraulicEngine, SimulationParameters, TickDriver, WaterPulse};
