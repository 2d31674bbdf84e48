#![allow(clippy::not_unsafe_ptr_arg_deref)]

use flood_sim_core::{GeoPoint, MillimetersPerDay, MillimetersPerHour, OutputMode, WaterPulse};

use crate::error::{DefaultFloodSimError, FloodSimErrorCode};
use crate::helpers::{handle_ffi_result_error, instance_from_ptr, with_flood_sim_mut, write_out};
use crate::instance::FloodSimInstance;

/// Output rebuilt after each update.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloodSimOutputMode {
    /// Elevated water surface mesh.
    Mesh = 0,
    /// Draped RGBA depth raster.
    Image = 1,
}

impl From<FloodSimOutputMode> for OutputMode {
    fn from(mode: FloodSimOutputMode) -> Self {
        match mode {
            FloodSimOutputMode::Mesh => OutputMode::Mesh,
            FloodSimOutputMode::Image => OutputMode::Image,
        }
    }
}

impl TryFrom<u32> for FloodSimOutputMode {
    type Error = DefaultFloodSimError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FloodSimOutputMode::Mesh),
            1 => Ok(FloodSimOutputMode::Image),
            other => Err(DefaultFloodSimError::invalid_parameter(format!(
                "output mode {other} is not a FloodSimOutputMode"
            ))),
        }
    }
}

impl From<OutputMode> for FloodSimOutputMode {
    fn from(mode: OutputMode) -> Self {
        match mode {
            OutputMode::Mesh => FloodSimOutputMode::Mesh,
            OutputMode::Image => FloodSimOutputMode::Image,
        }
    }
}

/// Apply `f` to the controller under the write lock and report the outcome.
fn mutate(
    ptr: *const FloodSimInstance,
    f: impl FnOnce(&mut flood_sim_core::SimulationController),
) -> FloodSimErrorCode {
    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        with_flood_sim_mut(instance, f)
    })
}

/// Advance the simulation by one host frame of `wall_dt` seconds.
///
/// Queued control actions are applied first. `wall_dt` is split into fixed
/// substeps (0.2 s by default), up to the substep cap, and each substep
/// simulates an equal share of `wall_dt × speed_multiplier`. The output is
/// rebuilt afterwards. Non-positive or non-finite `wall_dt` runs no steps but
/// still applies queued actions.
///
/// `out_substeps` may be null; otherwise it receives the number of engine
/// steps taken.
///
/// Thread-safe: acquires the `RwLock` write lock.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by `flood_sim_new`.
#[no_mangle]
pub extern "C" fn flood_sim_update(
    ptr: *const FloodSimInstance,
    wall_dt: f32,
    out_substeps: *mut u32,
) -> FloodSimErrorCode {
    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        let substeps = with_flood_sim_mut(instance, |sim| sim.tick(wall_dt))?;
        if !out_substeps.is_null() {
            write_out(out_substeps, "out_substeps", substeps)?;
        }
        Ok(())
    })
}

/// Advance by exactly `sim_dt` simulated seconds in a single engine step,
/// then rebuild the output.
///
/// Non-positive or non-finite `sim_dt` is a no-op.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by `flood_sim_new`.
#[no_mangle]
pub extern "C" fn flood_sim_step(ptr: *const FloodSimInstance, sim_dt: f32) -> FloodSimErrorCode {
    mutate(ptr, |sim| {
        sim.step(sim_dt);
        sim.refresh_output();
    })
}

/// Dry every cell and zero the statistics. Parameters are kept.
#[no_mangle]
pub extern "C" fn flood_sim_reset(ptr: *const FloodSimInstance) -> FloodSimErrorCode {
    mutate(ptr, |sim| {
        sim.reset();
        sim.refresh_output();
    })
}

/// Set rainfall in mm/h. Negative or NaN values act as 0.
#[no_mangle]
pub extern "C" fn flood_sim_set_rainfall_mm_per_hour(
    ptr: *const FloodSimInstance,
    rate: f32,
) -> FloodSimErrorCode {
    mutate(ptr, |sim| {
        sim.set_rainfall_rate(MillimetersPerHour::new(rate));
    })
}

/// Set rainfall as a 24-hour total in mm.
#[no_mangle]
pub extern "C" fn flood_sim_set_rainfall_mm_per_day(
    ptr: *const FloodSimInstance,
    total: f32,
) -> FloodSimErrorCode {
    mutate(ptr, |sim| {
        sim.set_rainfall_per_day(MillimetersPerDay::new(total));
    })
}

/// Set drainage in mm/h. Negative or NaN values act as 0.
#[no_mangle]
pub extern "C" fn flood_sim_set_drainage_mm_per_hour(
    ptr: *const FloodSimInstance,
    rate: f32,
) -> FloodSimErrorCode {
    mutate(ptr, |sim| {
        sim.set_drainage_rate(MillimetersPerHour::new(rate));
    })
}

/// Set the flow coefficient (1/s).
#[no_mangle]
pub extern "C" fn flood_sim_set_flow_coefficient(
    ptr: *const FloodSimInstance,
    k: f32,
) -> FloodSimErrorCode {
    mutate(ptr, |sim| sim.set_flow_coefficient(k))
}

/// Set simulated seconds per wall-clock second.
#[no_mangle]
pub extern "C" fn flood_sim_set_speed_multiplier(
    ptr: *const FloodSimInstance,
    speed: f32,
) -> FloodSimErrorCode {
    mutate(ptr, |sim| sim.set_speed_multiplier(speed))
}

/// Set the maximum number of engine steps per update.
#[no_mangle]
pub extern "C" fn flood_sim_set_max_substeps(
    ptr: *const FloodSimInstance,
    max_substeps: u32,
) -> FloodSimErrorCode {
    mutate(ptr, |sim| sim.set_max_substeps(max_substeps))
}

/// Set the depth (m) drawn at full color in image mode.
///
/// A non-positive depth makes image builds fail; the last image is kept.
#[no_mangle]
pub extern "C" fn flood_sim_set_max_display_depth(
    ptr: *const FloodSimInstance,
    depth: f32,
) -> FloodSimErrorCode {
    mutate(ptr, |sim| sim.set_max_display_depth(depth))
}

/// Switch between mesh and image output; rebuilds immediately.
///
/// `mode` takes the `FloodSimOutputMode` values (0 = mesh, 1 = image).
/// Any other value returns `InvalidParameter` and leaves the mode unchanged.
#[no_mangle]
pub extern "C" fn flood_sim_set_output_mode(
    ptr: *const FloodSimInstance,
    mode: u32,
) -> FloodSimErrorCode {
    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        let mode = FloodSimOutputMode::try_from(mode)?;
        with_flood_sim_mut(instance, |sim| sim.set_output_mode(mode.into()))
    })
}

/// Add a cone of water centered at (`longitude`, `latitude`).
///
/// Each cell within `radius_m` gains `depth_m × (1 − d / radius_m)`. A
/// non-positive radius or depth adds nothing. `out_cells_touched` may be null.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by `flood_sim_new`.
#[no_mangle]
pub extern "C" fn flood_sim_add_pulse(
    ptr: *const FloodSimInstance,
    longitude: f64,
    latitude: f64,
    radius_m: f32,
    depth_m: f32,
    out_cells_touched: *mut usize,
) -> FloodSimErrorCode {
    handle_ffi_result_error(|| {
        let instance = instance_from_ptr(ptr)?;
        let pulse = WaterPulse::new(GeoPoint::new(longitude, latitude), radius_m, depth_m);
        let touched = with_flood_sim_mut(instance, |sim| {
            let touched = sim.add_localized_pulse(&pulse);
            sim.refresh_output();
            touched
        })?;
        if !out_cells_touched.is_null() {
            write_out(out_cells_touched, "out_cells_touched", touched)?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::small_instance;
    use flood_sim_core::grid::DEFAULT_CENTER;
    use std::ptr;

    #[test]
    fn test_update_reports_substeps() {
        let sim = small_instance();
        let mut substeps = 0;
        assert_eq!(flood_sim_update(sim, 1.0, &mut substeps), FloodSimErrorCode::Ok);
        // 1 s of wall time wants 5 substeps, default cap is 4
        assert_eq!(substeps, 4);
        assert_eq!(
            flood_sim_update(sim, 1.0 / 60.0, &mut substeps),
            FloodSimErrorCode::Ok
        );
        assert_eq!(substeps, 1);
        assert_eq!(flood_sim_update(sim, 0.0, ptr::null_mut()), FloodSimErrorCode::Ok);
        crate::instance::flood_sim_destroy(sim);
    }

    #[test]
    fn test_setters_reach_controller() {
        let sim = small_instance();
        assert_eq!(flood_sim_set_rainfall_mm_per_hour(sim, 12.0), FloodSimErrorCode::Ok);
        assert_eq!(flood_sim_set_drainage_mm_per_hour(sim, 0.0), FloodSimErrorCode::Ok);
        assert_eq!(flood_sim_set_flow_coefficient(sim, 0.3), FloodSimErrorCode::Ok);
        assert_eq!(flood_sim_set_speed_multiplier(sim, 10.0), FloodSimErrorCode::Ok);
        assert_eq!(
            flood_sim_set_output_mode(sim, FloodSimOutputMode::Image as u32),
            FloodSimErrorCode::Ok
        );

        let instance = unsafe { &*sim };
        {
            let controller = instance.sim.read().unwrap();
            assert_eq!(*controller.params().rainfall_rate, 12.0);
            assert_eq!(controller.params().flow_coefficient, 0.3);
            assert_eq!(controller.output_mode(), OutputMode::Image);
        }
        crate::instance::flood_sim_destroy(sim);
    }

    #[test]
    fn test_pulse_counts_cells() {
        let sim = small_instance();
        let mut touched = 0;
        assert_eq!(
            flood_sim_add_pulse(
                sim,
                DEFAULT_CENTER.longitude,
                DEFAULT_CENTER.latitude,
                15.0,
                0.5,
                &mut touched
            ),
            FloodSimErrorCode::Ok
        );
        assert!(touched > 0);
        assert_eq!(flood_sim_reset(sim), FloodSimErrorCode::Ok);
        crate::instance::flood_sim_destroy(sim);
    }

    #[test]
    fn test_unknown_output_mode_rejected() {
        let sim = small_instance();
        assert_eq!(
            flood_sim_set_output_mode(sim, 7),
            FloodSimErrorCode::InvalidParameter
        );
        {
            let instance = unsafe { &*sim };
            let controller = instance.sim.read().unwrap();
            assert_eq!(controller.output_mode(), OutputMode::Mesh);
        }
        crate::instance::flood_sim_destroy(sim);
    }

    #[test]
    fn test_null_instance() {
        assert_eq!(
            flood_sim_step(ptr::null(), 1.0),
            FloodSimErrorCode::NullPointer
        );
    }
}
