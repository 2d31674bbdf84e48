//! Simulation controller
//!
//! [`SimulationController`] owns everything a running flood session needs:
//! the grid with its terrain, the hydraulic engine, the live parameters, the
//! last render output and running statistics. Hosts call [`tick`] once per
//! frame with the wall-clock delta; tests and batch tools call [`step`]
//! directly.
//!
//! [`tick`]: SimulationController::tick
//! [`step`]: SimulationController::step

pub mod action_queue;
pub mod stats;

pub use action_queue::{ActionQueue, ControlAction, ControlHandle};
pub use stats::SimulationStats;

use crate::config::SimulationConfig;
use crate::core_types::units::{MillimetersPerDay, MillimetersPerHour, Seconds};
use crate::grid::{GridModel, GridSpecError, TerrainHeightProvider};
use crate::render::{build_output, OutputMode, RenderOutput};
use crate::solver::{
    FieldData, FrameTimer, HydraulicEngine, ProfilerScope, SimulationParameters, TickPlan,
    WaterPulse,
};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info, warn};

/// A running flood simulation
#[derive(Debug)]
pub struct SimulationController {
    grid: GridModel,
    engine: HydraulicEngine,
    params: SimulationParameters,
    mode: OutputMode,
    output: Option<RenderOutput>,
    stats: SimulationStats,
    queue: Arc<Mutex<ActionQueue>>,
    frame_timer: FrameTimer,
}

impl SimulationController {
    /// Start a dry simulation on `grid` and build the first output
    pub fn new(grid: GridModel, params: SimulationParameters, mode: OutputMode) -> Self {
        let engine = HydraulicEngine::new(grid.width(), grid.height());
        let mut controller = Self {
            grid,
            engine,
            params,
            mode,
            output: None,
            stats: SimulationStats::default(),
            queue: Arc::new(Mutex::new(ActionQueue::new())),
            frame_timer: FrameTimer::new(),
        };
        controller.refresh_stats();
        controller.refresh_output();
        info!(
            width = controller.grid.width(),
            height = controller.grid.height(),
            ?mode,
            "Simulation controller ready"
        );
        controller
    }

    /// Initialize the grid from `provider`, then apply the configured pulses
    ///
    /// # Errors
    ///
    /// Returns [`GridSpecError`] if the configured grid is invalid.
    pub fn from_config(
        config: &SimulationConfig,
        provider: &dyn TerrainHeightProvider,
    ) -> Result<Self, GridSpecError> {
        let grid = GridModel::initialize(config.grid, provider, config.terrain_fallback_level)?;
        let mut controller = Self::new(grid, config.parameters, config.output_mode);
        if !config.initial_pulses.is_empty() {
            for pulse in &config.initial_pulses {
                controller.engine.add_localized_pulse(&controller.grid, pulse);
            }
            controller.refresh_stats();
            controller.refresh_output();
        }
        Ok(controller)
    }

    /// Advance by one wall-clock frame
    ///
    /// Applies queued control actions, runs the planned substeps and rebuilds
    /// the output. Returns the number of engine steps taken.
    pub fn tick(&mut self, wall_dt: f32) -> u32 {
        let scope = ProfilerScope::new("tick");
        let applied = self.apply_queued_actions();

        let Some(plan) = TickPlan::new(wall_dt, &self.params) else {
            if applied > 0 {
                self.refresh_stats();
                self.refresh_output();
            }
            return 0;
        };

        for _ in 0..plan.substeps {
            self.engine
                .step(self.grid.cell_terrain(), &self.params, plan.substep_dt);
        }
        self.stats.steps += u64::from(plan.substeps);
        self.stats.simulated_seconds += f64::from(*plan.sim_dt);
        self.refresh_stats();
        self.refresh_output();

        self.frame_timer.record(scope.elapsed_ms());
        self.stats.last_tick_ms = self.frame_timer.last_frame_time_ms();
        self.stats.average_tick_ms = self.frame_timer.average_ms();
        debug!(
            substeps = plan.substeps,
            sim_dt = *plan.sim_dt,
            max_depth = self.stats.max_depth_m,
            "Tick"
        );
        plan.substeps
    }

    /// Advance by exactly `sim_dt` simulated seconds in one engine step
    ///
    /// Does not rebuild the render output; call [`Self::refresh_output`] when
    /// needed. Non-positive or non-finite durations are ignored.
    pub fn step(&mut self, sim_dt: f32) {
        if !sim_dt.is_finite() || sim_dt <= 0.0 {
            debug!(sim_dt, "Ignoring non-positive step");
            return;
        }
        self.engine
            .step(self.grid.cell_terrain(), &self.params, Seconds::new(sim_dt));
        self.stats.steps += 1;
        self.stats.simulated_seconds += f64::from(sim_dt);
        self.refresh_stats();
    }

    /// Rebuild the render output for the current mode
    ///
    /// On failure the previous output is kept and the next call retries.
    pub fn refresh_output(&mut self) {
        match build_output(
            self.mode,
            &self.grid,
            self.engine.depth(),
            self.params.max_display_depth,
        ) {
            Ok(out) => self.output = Some(out),
            Err(e) => warn!(error = %e, mode = ?self.mode, "Output build failed, keeping previous frame"),
        }
    }

    fn refresh_stats(&mut self) {
        self.stats
            .measure(self.engine.depth(), self.grid.cell_area_m2());
    }

    fn apply_queued_actions(&mut self) -> usize {
        let actions = self
            .queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        for &action in &actions {
            self.apply(action);
        }
        actions.len()
    }

    fn apply(&mut self, action: ControlAction) {
        match action {
            ControlAction::SetRainfall(rate) => self.set_rainfall_rate(rate),
            ControlAction::SetRainfallPerDay(total) => self.set_rainfall_per_day(total),
            ControlAction::SetDrainage(rate) => self.set_drainage_rate(rate),
            ControlAction::SetFlowCoefficient(k) => self.set_flow_coefficient(k),
            ControlAction::SetSpeed(speed) => self.set_speed_multiplier(speed),
            ControlAction::AddPulse(pulse) => {
                self.add_localized_pulse(&pulse);
            }
            ControlAction::Reset => self.reset(),
        }
    }

    /// Handle for queueing actions from other threads
    pub fn control_handle(&self) -> ControlHandle {
        ControlHandle::new(Arc::clone(&self.queue))
    }

    /// Set the rainfall rate; takes effect on the next step
    pub fn set_rainfall_rate(&mut self, rate: MillimetersPerHour) {
        self.params.rainfall_rate = rate;
    }

    /// Set the rainfall rate from a 24-hour total
    pub fn set_rainfall_per_day(&mut self, total: MillimetersPerDay) {
        self.params.set_rainfall_per_day(total);
    }

    /// Set the drainage rate; takes effect on the next step
    pub fn set_drainage_rate(&mut self, rate: MillimetersPerHour) {
        self.params.drainage_rate = rate;
    }

    /// Set the flow coefficient (1/s)
    pub fn set_flow_coefficient(&mut self, k: f32) {
        self.params.flow_coefficient = k;
    }

    /// Set simulated seconds per wall-clock second
    pub fn set_speed_multiplier(&mut self, speed: f32) {
        self.params.speed_multiplier = speed;
    }

    /// Set the substep cap per tick
    pub fn set_max_substeps(&mut self, max: u32) {
        self.params.max_substeps_per_tick = max;
    }

    /// Set the depth shown at full color
    pub fn set_max_display_depth(&mut self, depth: f32) {
        self.params.max_display_depth = depth;
    }

    /// Replace all parameters at once
    pub fn set_parameters(&mut self, params: SimulationParameters) {
        self.params = params;
    }

    /// Switch output mode and rebuild
    pub fn set_output_mode(&mut self, mode: OutputMode) {
        if mode != self.mode {
            info!(from = ?self.mode, to = ?mode, "Output mode changed");
            self.mode = mode;
            self.refresh_output();
        }
    }

    /// Inject a pulse of water; returns the number of cells touched
    pub fn add_localized_pulse(&mut self, pulse: &WaterPulse) -> usize {
        let touched = self.engine.add_localized_pulse(&self.grid, pulse);
        self.refresh_stats();
        touched
    }

    /// Replace the depth field
    ///
    /// # Panics
    ///
    /// Panics if `depth` does not match the grid dimensions.
    pub fn set_depth(&mut self, depth: &FieldData) {
        self.engine.set_depth(depth);
        self.refresh_stats();
    }

    /// Dry the grid and zero statistics
    pub fn reset(&mut self) {
        self.engine.reset();
        self.stats = SimulationStats::default();
        self.refresh_stats();
        info!("Simulation reset");
    }

    /// Grid and terrain
    pub fn grid(&self) -> &GridModel {
        &self.grid
    }

    /// Current water depth (m)
    pub fn depth(&self) -> &FieldData {
        self.engine.depth()
    }

    /// Engine, for outflow and transfer diagnostics
    pub fn engine(&self) -> &HydraulicEngine {
        &self.engine
    }

    /// Live parameters as set (before clamping)
    pub fn params(&self) -> &SimulationParameters {
        &self.params
    }

    /// Current output mode
    pub fn output_mode(&self) -> OutputMode {
        self.mode
    }

    /// Last successfully built output
    pub fn output(&self) -> Option<&RenderOutput> {
        self.output.as_ref()
    }

    /// Statistics as of the last step
    pub fn stats(&self) -> &SimulationStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{CellSize, GridSpec, DEFAULT_CENTER};
    use approx::assert_relative_eq;

    fn flat_controller(mode: OutputMode) -> SimulationController {
        let spec = GridSpec::new(6, 6, CellSize::Meters(10.0), DEFAULT_CENTER);
        SimulationController::new(
            GridModel::flat(spec).unwrap(),
            SimulationParameters::default(),
            mode,
        )
    }

    #[test]
    fn test_initial_output_built() {
        let c = flat_controller(OutputMode::Image);
        assert!(matches!(c.output(), Some(RenderOutput::Image(_))));
        assert_eq!(c.stats().wet_cells, 0);
    }

    #[test]
    fn test_tick_runs_planned_substeps() {
        let mut c = flat_controller(OutputMode::Mesh);
        assert_eq!(c.tick(1.0), 4);
        assert_eq!(c.stats().steps, 4);
        assert_relative_eq!(c.stats().simulated_seconds, 60.0, epsilon = 1e-6);
        assert_eq!(c.tick(0.0), 0);
    }

    #[test]
    fn test_queued_actions_apply_on_tick() {
        let mut c = flat_controller(OutputMode::Mesh);
        let handle = c.control_handle();
        handle.set_rainfall_rate(MillimetersPerHour::new(7.0));
        handle.add_localized_pulse(WaterPulse::new(DEFAULT_CENTER, 15.0, 0.4));
        assert_eq!(*c.params().rainfall_rate, 50.0 / 24.0);

        c.tick(0.0);
        assert_eq!(*c.params().rainfall_rate, 7.0);
        assert!(c.stats().wet_cells > 0);
        assert_eq!(handle.pending_len(), 0);
    }

    #[test]
    fn test_failed_build_keeps_previous_output() {
        let mut c = flat_controller(OutputMode::Image);
        let before = c.output().cloned();
        c.set_max_display_depth(0.0);
        c.set_depth(&FieldData::with_value(6, 6, 0.1));
        c.refresh_output();
        assert_eq!(c.output().cloned(), before);

        c.set_max_display_depth(0.2);
        c.refresh_output();
        assert_ne!(c.output().cloned(), before);
    }

    #[test]
    fn test_mode_switch_rebuilds() {
        let mut c = flat_controller(OutputMode::Mesh);
        c.set_output_mode(OutputMode::Image);
        assert_eq!(c.output().map(RenderOutput::mode), Some(OutputMode::Image));
    }

    #[test]
    fn test_reset_dries_grid() {
        let mut c = flat_controller(OutputMode::Mesh);
        c.step(600.0);
        assert!(c.stats().total_volume_m3 > 0.0);
        c.reset();
        assert_eq!(c.stats().total_volume_m3, 0.0);
        assert_eq!(c.stats().steps, 0);
    }
}
