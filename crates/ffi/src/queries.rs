#![allow(clippy::not_unsafe_ptr_arg_deref)]

use flood_sim_core::{RenderOutput, SimulationStats};

use crate::error::{DefaultFloodSimError, FloodSimErrorCode};
use crate::helpers::{
    copy_to_buffer, handle_ffi_result_error, instance_from_ptr, with_flood_sim, write_out,
};
use crate::instance::FloodSimInstance;
use crate::simulation::FloodSimOutputMode;

/// FFI-friendly snapshot of the running statistics.
/// Keep this layout stable for C/C++/C# consumers.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FloodSimStats {
    /// Simulated seconds since start or reset.
    pub simulated_seconds: f64,
    /// Engine steps since start or reset.
    pub steps: u64,
    /// Water on the grid (m³).
    pub total_volume_m3: f64,
    /// Mean depth over all cells (m).
    pub mean_depth_m: f32,
    /// Deepest cell (m).
    pub max_depth_m: f32,
    /// Cells holding any water.
    pub wet_cells: usize,
    /// Wall time of the last update (ms).
    pub last_update_ms: f64,
    /// Smoothed wall time per update (ms).
    pub average_update_ms: f64,
}

impl From<&SimulationStats> for FloodSimStats {
    fn from(stats: &SimulationStats) -> Self {
        Self {
            simulated_seconds: stats.simulated_seconds,
            steps: stats.steps,
            total_volume_m3: stats.total_volume_m3,
            mean_depth_m: stats.mean_depth_m,
            max_depth_m: stats.max_depth_m,
            wet_cells: stats.wet_cells,
            last_update_ms: stats.last_tick_ms,
            average_update_ms: stats.average_tick_ms,
        }
    }
}

/// Georeferencing of the depth image.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FloodSimImageInfo {
    /// Pixels per row.
    pub width: usize,
    /// Rows; row 0 is the northern edge.
    pub height: usize,
    /// Western edge longitude (degrees).
    pub west: f64,
    /// Southern edge latitude (degrees).
    pub south: f64,
    /// Eastern edge longitude (degrees).
    pub east: f64,
    /// Northern edge latitude (degrees).
    pub north: f64,
    /// Elevation the image is draped at (m).
    pub base_height: f32,
}

/// Sizes and bounds of the water mesh.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default)]
pub struct FloodSimMeshInfo {
    /// Number of vertices; positions need 3 doubles each, st 2 floats each.
    pub vertex_count: usize,
    /// Number of triangle indices (3 per triangle).
    pub index_count: usize,
    /// Bounding sphere center, Earth-centered X (m).
    pub center_x: f64,
    /// Bounding sphere center, Earth-centered Y (m).
    pub center_y: f64,
    /// Bounding sphere center, Earth-centered Z (m).
    pub center_z: f64,
    /// Bounding sphere radius (m).
    pub radius: f64,
}

/// Run a read-only query and report the outcome.
fn query(
    ptr: *const FloodSimInstance,
    f: impl FnOnce(&flood_sim_core::SimulationController) -> Result<(), DefaultFloodSimError>,
) -> FloodSimErrorCode {
    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        with_flood_sim(instance, f)?
    })
}

/// Copy the current statistics into `out_stats`.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by `flood_sim_new`.
/// - `out_stats` must be valid for writes.
#[no_mangle]
pub extern "C" fn flood_sim_get_stats(
    ptr: *const FloodSimInstance,
    out_stats: *mut FloodSimStats,
) -> FloodSimErrorCode {
    query(ptr, |sim| {
        write_out(out_stats, "out_stats", FloodSimStats::from(sim.stats()))
    })
}

/// Grid dimensions in cells.
#[no_mangle]
pub extern "C" fn flood_sim_get_grid_size(
    ptr: *const FloodSimInstance,
    out_width: *mut usize,
    out_height: *mut usize,
) -> FloodSimErrorCode {
    query(ptr, |sim| {
        write_out(out_width, "out_width", sim.grid().width())?;
        write_out(out_height, "out_height", sim.grid().height())
    })
}

/// Current output mode.
#[no_mangle]
pub extern "C" fn flood_sim_get_output_mode(
    ptr: *const FloodSimInstance,
    out_mode: *mut FloodSimOutputMode,
) -> FloodSimErrorCode {
    query(ptr, |sim| {
        write_out(out_mode, "out_mode", sim.output_mode().into())
    })
}

/// Water depth (m) of cell (`i`, `j`); `i` runs east, `j` runs north.
///
/// Returns `InvalidParameter` when the cell is outside the grid.
#[no_mangle]
pub extern "C" fn flood_sim_get_depth(
    ptr: *const FloodSimInstance,
    i: usize,
    j: usize,
    out_depth: *mut f32,
) -> FloodSimErrorCode {
    query(ptr, |sim| {
        let depth = sim.depth();
        if i >= depth.width || j >= depth.height {
            return Err(DefaultFloodSimError::invalid_parameter(format!(
                "cell ({i}, {j}) outside {}x{} grid",
                depth.width, depth.height
            )));
        }
        write_out(out_depth, "out_depth", depth.get(i, j))
    })
}

/// Terrain elevation (m) at the center of cell (`i`, `j`).
#[no_mangle]
pub extern "C" fn flood_sim_get_terrain_height(
    ptr: *const FloodSimInstance,
    i: usize,
    j: usize,
    out_height: *mut f32,
) -> FloodSimErrorCode {
    query(ptr, |sim| {
        let terrain = sim.grid().cell_terrain();
        if i >= terrain.width || j >= terrain.height {
            return Err(DefaultFloodSimError::invalid_parameter(format!(
                "cell ({i}, {j}) outside {}x{} grid",
                terrain.width, terrain.height
            )));
        }
        write_out(out_height, "out_height", terrain.get(i, j))
    })
}

/// Copy the whole depth field, row-major from the south-west cell.
///
/// `buffer_len` is the number of floats `out_depths` can hold; it must be at
/// least width × height or nothing is written and `BufferTooSmall` is returned.
///
/// # Safety
/// - `out_depths` must be valid for `buffer_len` writes.
#[no_mangle]
pub extern "C" fn flood_sim_copy_depth_field(
    ptr: *const FloodSimInstance,
    out_depths: *mut f32,
    buffer_len: usize,
) -> FloodSimErrorCode {
    query(ptr, |sim| {
        copy_to_buffer(sim.depth().as_slice(), out_depths, buffer_len, "out_depths")
    })
}

/// Size and georeferencing of the current depth image.
///
/// Returns `OutputUnavailable` in mesh mode.
#[no_mangle]
pub extern "C" fn flood_sim_get_image_info(
    ptr: *const FloodSimInstance,
    out_info: *mut FloodSimImageInfo,
) -> FloodSimErrorCode {
    query(ptr, |sim| {
        let Some(RenderOutput::Image(image)) = sim.output() else {
            return Err(DefaultFloodSimError::output_unavailable("image"));
        };
        write_out(
            out_info,
            "out_info",
            FloodSimImageInfo {
                width: image.width,
                height: image.height,
                west: image.bounds.west,
                south: image.bounds.south,
                east: image.bounds.east,
                north: image.bounds.north,
                base_height: image.base_height,
            },
        )
    })
}

/// Copy the RGBA8 pixels of the current depth image (width × height × 4 bytes).
///
/// # Safety
/// - `out_rgba` must be valid for `buffer_len` writes.
#[no_mangle]
pub extern "C" fn flood_sim_copy_image_rgba(
    ptr: *const FloodSimInstance,
    out_rgba: *mut u8,
    buffer_len: usize,
) -> FloodSimErrorCode {
    query(ptr, |sim| {
        let Some(RenderOutput::Image(image)) = sim.output() else {
            return Err(DefaultFloodSimError::output_unavailable("image"));
        };
        copy_to_buffer(&image.rgba, out_rgba, buffer_len, "out_rgba")
    })
}

/// Sizes and bounding sphere of the current water mesh.
///
/// Returns `OutputUnavailable` in image mode.
#[no_mangle]
pub extern "C" fn flood_sim_get_mesh_info(
    ptr: *const FloodSimInstance,
    out_info: *mut FloodSimMeshInfo,
) -> FloodSimErrorCode {
    query(ptr, |sim| {
        let Some(RenderOutput::Mesh(mesh)) = sim.output() else {
            return Err(DefaultFloodSimError::output_unavailable("mesh"));
        };
        let sphere = mesh.bounding_sphere;
        write_out(
            out_info,
            "out_info",
            FloodSimMeshInfo {
                vertex_count: mesh.vertex_count(),
                index_count: mesh.indices.len(),
                center_x: sphere.center.x,
                center_y: sphere.center.y,
                center_z: sphere.center.z,
                radius: sphere.radius,
            },
        )
    })
}

/// Copy mesh vertex positions as packed `x, y, z` doubles (3 per vertex).
#[no_mangle]
pub extern "C" fn flood_sim_copy_mesh_positions(
    ptr: *const FloodSimInstance,
    out_xyz: *mut f64,
    buffer_len: usize,
) -> FloodSimErrorCode {
    query(ptr, |sim| {
        let Some(RenderOutput::Mesh(mesh)) = sim.output() else {
            return Err(DefaultFloodSimError::output_unavailable("mesh"));
        };
        let packed: Vec<f64> = mesh
            .positions
            .iter()
            .flat_map(|p| [p.x, p.y, p.z])
            .collect();
        copy_to_buffer(&packed, out_xyz, buffer_len, "out_xyz")
    })
}

/// Copy mesh texture coordinates as packed `s, t` floats (2 per vertex).
#[no_mangle]
pub extern "C" fn flood_sim_copy_mesh_st(
    ptr: *const FloodSimInstance,
    out_st: *mut f32,
    buffer_len: usize,
) -> FloodSimErrorCode {
    query(ptr, |sim| {
        let Some(RenderOutput::Mesh(mesh)) = sim.output() else {
            return Err(DefaultFloodSimError::output_unavailable("mesh"));
        };
        let packed: Vec<f32> = mesh.st.iter().flatten().copied().collect();
        copy_to_buffer(&packed, out_st, buffer_len, "out_st")
    })
}

/// Copy mesh triangle indices (3 per triangle, counter-clockwise seen from above).
#[no_mangle]
pub extern "C" fn flood_sim_copy_mesh_indices(
    ptr: *const FloodSimInstance,
    out_indices: *mut u32,
    buffer_len: usize,
) -> FloodSimErrorCode {
    query(ptr, |sim| {
        let Some(RenderOutput::Mesh(mesh)) = sim.output() else {
            return Err(DefaultFloodSimError::output_unavailable("mesh"));
        };
        copy_to_buffer(&mesh.indices, out_indices, buffer_len, "out_indices")
    })
}
