#![allow(clippy::not_unsafe_ptr_arg_deref)]

use flood_sim_core::{
    CellSize, GeoPoint, GeoTerrain, GridSpec, SimulationConfig, SimulationController,
};
use std::ffi::CStr;
use std::os::raw::c_char;
use std::ptr;
use std::sync::RwLock;
use tracing::info;

use crate::error::{DefaultFloodSimError, FloodSimErrorCode};
use crate::helpers::{handle_ffi_result_error, write_out};
use crate::terrain::Terrain;

/// The main flood simulation context.
///
/// # Thread Safety
/// The controller sits behind an `RwLock`: queries take the shared read lock,
/// `flood_sim_update` and the setters take the write lock briefly. An instance
/// may be shared between a host's game thread, render thread and workers.
///
/// ## Unreal Engine Example
/// ```cpp
/// FloodSimInstance* FloodPtr = nullptr;
///
/// void AFloodActor::BeginPlay() {
///     FloodSimGrid grid = flood_sim_default_grid();
///     Terrain terrain = make_single_hill(6000.0f, 6000.0f, 20.0f, 2.0f, 15.0f, 1500.0f);
///     if (flood_sim_new(grid, terrain, &FloodPtr) != FloodSimErrorCode::Ok) {
///         UE_LOG(LogTemp, Error, TEXT("%hs"), flood_sim_get_last_error());
///     }
/// }
///
/// void AFloodActor::Tick(float DeltaTime) {
///     flood_sim_update(FloodPtr, DeltaTime, nullptr);
/// }
///
/// void AFloodActor::EndPlay(const EEndPlayReason::Type) {
///     flood_sim_destroy(FloodPtr);
///     FloodPtr = nullptr;
/// }
/// ```
pub struct FloodSimInstance {
    pub(crate) sim: RwLock<SimulationController>,
}

/// Grid placement for `flood_sim_new`.
///
/// `cell_size_meters > 0` selects square metric cells; otherwise
/// `degrees_per_cell` is used.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct FloodSimGrid {
    /// Cells along longitude.
    pub width: usize,
    /// Cells along latitude.
    pub height: usize,
    /// Cell edge in meters, or 0 to use degrees.
    pub cell_size_meters: f32,
    /// Cell edge in degrees when `cell_size_meters` is 0.
    pub degrees_per_cell: f64,
    /// Grid center longitude (degrees).
    pub center_longitude: f64,
    /// Grid center latitude (degrees).
    pub center_latitude: f64,
}

impl From<GridSpec> for FloodSimGrid {
    fn from(spec: GridSpec) -> Self {
        let (cell_size_meters, degrees_per_cell) = match spec.cell_size {
            CellSize::Meters(m) => (m, 0.0),
            CellSize::Degrees(d) => (0.0, d),
        };
        Self {
            width: spec.width,
            height: spec.height,
            cell_size_meters,
            degrees_per_cell,
            center_longitude: spec.center.longitude,
            center_latitude: spec.center.latitude,
        }
    }
}

impl From<FloodSimGrid> for GridSpec {
    fn from(grid: FloodSimGrid) -> Self {
        let cell_size = if grid.cell_size_meters > 0.0 {
            CellSize::Meters(grid.cell_size_meters)
        } else {
            CellSize::Degrees(grid.degrees_per_cell)
        };
        GridSpec::new(
            grid.width,
            grid.height,
            cell_size,
            GeoPoint::new(grid.center_longitude, grid.center_latitude),
        )
    }
}

impl FloodSimInstance {
    /// Build a controller from `config`, sampling `terrain` centered on the grid.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTerrainParameters` / `NullPointer` for a bad terrain
    /// description and `InvalidGrid` when the grid is rejected.
    pub(crate) fn new(
        config: &SimulationConfig,
        terrain: &Terrain,
    ) -> Result<Box<Self>, DefaultFloodSimError> {
        config
            .validate()
            .map_err(|e| DefaultFloodSimError::invalid_grid(e.to_string()))?;
        let provider = GeoTerrain::centered(terrain.to_terrain_data()?, config.grid.center);
        let sim = SimulationController::from_config(config, &provider)
            .map_err(|e| DefaultFloodSimError::invalid_grid(e.to_string()))?;
        info!(
            width = config.grid.width,
            height = config.grid.height,
            "FFI instance created"
        );
        Ok(Box::new(Self {
            sim: RwLock::new(sim),
        }))
    }
}

/// Default grid: 100x100 cells of 0.0005° around the built-in center.
#[no_mangle]
pub extern "C" fn flood_sim_default_grid() -> FloodSimGrid {
    GridSpec::default().into()
}

fn publish(
    result: Result<Box<FloodSimInstance>, DefaultFloodSimError>,
    out_instance: *mut *mut FloodSimInstance,
) -> Result<(), DefaultFloodSimError> {
    match result {
        Ok(instance) => write_out(out_instance, "out_instance", Box::into_raw(instance)),
        Err(e) => {
            // Leave the caller with a null handle on failure
            let _ = write_out(out_instance, "out_instance", ptr::null_mut());
            Err(e)
        }
    }
}

/// Create a new flood simulation with default parameters and return it via
/// out-parameter.
///
/// Parameters
/// - `grid`: grid size, cell size and center.
/// - `terrain`: terrain centered on the grid. For `Terrain::FromHeightmap`
///   the samples are copied; the caller may free them after this call.
/// - `out_instance`: receives the instance on success, null on failure.
///
/// Returns
/// - `FloodSimErrorCode::Ok` (0) on success
/// - `FloodSimErrorCode::NullPointer` if `out_instance` or the heightmap is null
/// - `FloodSimErrorCode::InvalidTerrainParameters` for bad terrain dimensions
/// - `FloodSimErrorCode::InvalidGrid` if the grid is too small, the cell size
///   is not positive or the center is off the globe
///
/// # Safety
///
/// - `out_instance` must be valid for writes.
/// - The caller owns the instance and MUST call `flood_sim_destroy` exactly once.
#[no_mangle]
pub extern "C" fn flood_sim_new(
    grid: FloodSimGrid,
    terrain: Terrain,
    out_instance: *mut *mut FloodSimInstance,
) -> FloodSimErrorCode {
    handle_ffi_result_error(|| {
        if out_instance.is_null() {
            return Err(DefaultFloodSimError::null_pointer("out_instance"));
        }
        let config = SimulationConfig {
            grid: grid.into(),
            ..SimulationConfig::default()
        };
        publish(FloodSimInstance::new(&config, &terrain), out_instance)
    })
}

/// Create a new flood simulation from a JSON configuration.
///
/// Every key of the JSON object is optional; `"{}"` gives the defaults.
/// The grid in the JSON also decides where `terrain` is centered.
///
/// Returns
/// - `FloodSimErrorCode::Ok` (0) on success
/// - `FloodSimErrorCode::NullPointer` if `config_json` or `out_instance` is null
/// - `FloodSimErrorCode::InvalidParameter` if the text is not UTF-8
/// - `FloodSimErrorCode::InvalidGrid` if the JSON cannot be parsed or validated
/// - `FloodSimErrorCode::InvalidTerrainParameters` for bad terrain dimensions
///
/// # Safety
///
/// - `config_json` must be a valid null-terminated string.
/// - `out_instance` must be valid for writes.
#[no_mangle]
pub extern "C" fn flood_sim_new_from_json(
    config_json: *const c_char,
    terrain: Terrain,
    out_instance: *mut *mut FloodSimInstance,
) -> FloodSimErrorCode {
    handle_ffi_result_error(|| {
        if out_instance.is_null() {
            return Err(DefaultFloodSimError::null_pointer("out_instance"));
        }
        if config_json.is_null() {
            let _ = write_out(out_instance, "out_instance", ptr::null_mut());
            return Err(DefaultFloodSimError::null_pointer("config_json"));
        }
        // SAFETY: caller guarantees a valid null-terminated string
        let text = unsafe { CStr::from_ptr(config_json) }.to_str();
        let result = text
            .map_err(|e| DefaultFloodSimError::invalid_parameter(format!("config_json: {e}")))
            .and_then(|json| {
                SimulationConfig::from_json_str(json)
                    .map_err(|e| DefaultFloodSimError::invalid_grid(e.to_string()))
            })
            .and_then(|config| FloodSimInstance::new(&config, &terrain));
        publish(result, out_instance)
    })
}

/// Destroy an instance created by `flood_sim_new` or `flood_sim_new_from_json`.
///
/// Null is a no-op.
///
/// # Safety
///
/// - `ptr` must not be used after this call, and must not be destroyed twice.
#[no_mangle]
pub extern "C" fn flood_sim_destroy(ptr: *mut FloodSimInstance) {
    if ptr.is_null() {
        return;
    }
    // SAFETY: ptr came from Box::into_raw in flood_sim_new and is destroyed once
    drop(unsafe { Box::from_raw(ptr) });
}

#[cfg(test)]
mod tests {
    use super::*;
    use flood_sim_core::grid::DEFAULT_CENTER;

    fn flat_terrain() -> Terrain {
        Terrain::Flat {
            width: 1000.0,
            height: 1000.0,
            resolution: 10.0,
            base_elevation: 0.0,
        }
    }

    #[test]
    fn test_default_grid_round_trip() {
        let grid = flood_sim_default_grid();
        assert_eq!(grid.width, 100);
        assert_eq!(grid.cell_size_meters, 0.0);
        assert_eq!(GridSpec::from(grid), GridSpec::default());
    }

    #[test]
    fn test_new_and_destroy() {
        let grid = FloodSimGrid {
            width: 10,
            height: 10,
            cell_size_meters: 5.0,
            degrees_per_cell: 0.0,
            center_longitude: DEFAULT_CENTER.longitude,
            center_latitude: DEFAULT_CENTER.latitude,
        };
        let mut sim = ptr::null_mut();
        assert_eq!(flood_sim_new(grid, flat_terrain(), &mut sim), FloodSimErrorCode::Ok);
        assert!(!sim.is_null());
        flood_sim_destroy(sim);
    }

    #[test]
    fn test_bad_grid_leaves_null() {
        let mut grid = flood_sim_default_grid();
        grid.width = 1;
        let mut sim = ptr::null_mut();
        assert_eq!(
            flood_sim_new(grid, flat_terrain(), &mut sim),
            FloodSimErrorCode::InvalidGrid
        );
        assert!(sim.is_null());
    }

    #[test]
    fn test_from_json() {
        let json = c"{\"grid\": {\"width\": 8, \"height\": 6, \"cell_size\": {\"meters\": 10.0}, \"center\": {\"longitude\": 0.0, \"latitude\": 0.0}}}";
        let mut sim = ptr::null_mut();
        assert_eq!(
            flood_sim_new_from_json(json.as_ptr(), flat_terrain(), &mut sim),
            FloodSimErrorCode::Ok
        );
        let instance = unsafe { &*sim };
        assert_eq!(instance.sim.read().unwrap().grid().width(), 8);
        flood_sim_destroy(sim);

        let mut sim = ptr::null_mut();
        assert_eq!(
            flood_sim_new_from_json(c"{".as_ptr(), flat_terrain(), &mut sim),
            FloodSimErrorCode::InvalidGrid
        );
        assert!(sim.is_null());
    }

    #[test]
    fn test_null_out_instance() {
        assert_eq!(
            flood_sim_new(flood_sim_default_grid(), flat_terrain(), ptr::null_mut()),
            FloodSimErrorCode::NullPointer
        );
        flood_sim_destroy(ptr::null_mut());
    }
}
