//! Rainfall, head-driven flow and drainage on the cell grid
//!
//! Each step runs in a fixed order:
//!
//! 1. rainfall is added to every cell
//! 2. each cell's outflow toward lower-head neighbors is computed from the
//!    depth field as it stood after rainfall, then clamped to the water the
//!    cell holds
//! 3. outflows and inflows are applied into a back buffer that is swapped in
//! 4. drainage is removed, flooring at zero
//! 5. residue below the depth epsilon is cleared
//!
//! Steps 2 and 3 are data-parallel over rows. Every cell reads only the
//! previous depth field and writes only its own entries, so the result does
//! not depend on iteration order or thread count. Neighbors are the
//! [`neighbor_slots`] of each cell, in [`Direction`] order.
//!
//! Heads are summed in f64. In f32 a centimeter-scale depth on terrain a few
//! hundred meters up loses most of its digits, which would make flow depend
//! on the base elevation.

use super::fields::FieldData;
use super::params::SimulationParameters;
use super::profiler::ProfilerScope;
use crate::core_types::geo::GeoPoint;
use crate::core_types::units::Seconds;
use crate::grid::{neighbor_slots, GridModel};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Neighbor direction in the per-cell transfer table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum Direction {
    /// `i - 1`
    West = 0,
    /// `i + 1`
    East = 1,
    /// `j - 1`
    South = 2,
    /// `j + 1`
    North = 3,
}

impl Direction {
    /// All directions in table order
    pub const ALL: [Direction; 4] = [
        Direction::West,
        Direction::East,
        Direction::South,
        Direction::North,
    ];

    /// Direction pointing back at the sender
    pub fn opposite(self) -> Self {
        match self {
            Direction::West => Direction::East,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::North => Direction::South,
        }
    }
}

/// Circular depth injection applied once at a geographic point
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterPulse {
    /// Pulse center
    pub center: GeoPoint,
    /// Radius in meters
    pub radius_m: f32,
    /// Depth added at the center in meters
    pub depth_m: f32,
}

impl WaterPulse {
    /// Create a pulse
    pub fn new(center: GeoPoint, radius_m: f32, depth_m: f32) -> Self {
        Self {
            center,
            radius_m,
            depth_m,
        }
    }
}

/// Depth state plus the scratch buffers one step needs
#[derive(Debug, Clone)]
pub struct HydraulicEngine {
    depth: FieldData,
    depth_back: FieldData,
    /// Clamped outflow per cell in the last step (m)
    outflow: FieldData,
    /// Per-direction transfers in the last step (m), indexed by [`Direction`]
    transfers: Vec<[f32; 4]>,
}

impl HydraulicEngine {
    /// Dry engine for a `width x height` grid
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            depth: FieldData::new(width, height),
            depth_back: FieldData::new(width, height),
            outflow: FieldData::new(width, height),
            transfers: vec![[0.0; 4]; width * height],
        }
    }

    /// Current water depth (m)
    pub fn depth(&self) -> &FieldData {
        &self.depth
    }

    /// Clamped outflow of each cell in the last step (m)
    pub fn outflow(&self) -> &FieldData {
        &self.outflow
    }

    /// Depth moved from cell `index` toward `dir` in the last step (m)
    pub fn transfer(&self, index: usize, dir: Direction) -> f32 {
        self.transfers[index][dir as usize]
    }

    /// Replace the depth field, clamping negative and non-finite values to 0
    ///
    /// # Panics
    ///
    /// Panics if `depth` has different dimensions than the engine.
    pub fn set_depth(&mut self, depth: &FieldData) {
        assert!(
            depth.width == self.depth.width && depth.height == self.depth.height,
            "Depth field size mismatch"
        );
        for (dst, &src) in self.depth.data.iter_mut().zip(&depth.data) {
            *dst = if src.is_finite() { src.max(0.0) } else { 0.0 };
        }
    }

    /// Dry every cell and clear diagnostics
    pub fn reset(&mut self) {
        self.depth.fill(0.0);
        self.outflow.fill(0.0);
        self.transfers.fill([0.0; 4]);
    }

    /// Advance by `dt` simulated seconds
    ///
    /// # Arguments
    ///
    /// * `terrain` - Cell-center terrain, same dimensions as the depth field
    /// * `params` - Parameters; clamped before use
    /// * `dt` - Step length
    ///
    /// A terrain field of the wrong size is logged and the step is skipped.
    pub fn step(&mut self, terrain: &FieldData, params: &SimulationParameters, dt: Seconds) {
        let _scope = ProfilerScope::new("hydraulic_step");
        if terrain.width != self.depth.width || terrain.height != self.depth.height {
            warn!(
                terrain_width = terrain.width,
                terrain_height = terrain.height,
                depth_width = self.depth.width,
                depth_height = self.depth.height,
                "Terrain does not match depth field, skipping step"
            );
            return;
        }
        if dt.is_nan() || *dt <= 0.0 {
            return;
        }
        let p = params.sanitized();

        add_uniform(
            &mut self.depth.data,
            p.rainfall_rate.to_meters_per_second().over(dt),
        );

        compute_outflows(
            &self.depth,
            terrain,
            p.flow_coefficient,
            dt.value(),
            &mut self.outflow.data,
            &mut self.transfers,
        );

        apply_transfers(
            &self.depth.data,
            &self.outflow.data,
            &self.transfers,
            self.depth.width,
            &mut self.depth_back.data,
        );
        std::mem::swap(&mut self.depth, &mut self.depth_back);

        drain(
            &mut self.depth.data,
            p.drainage_rate.to_meters_per_second().over(dt),
            p.depth_epsilon,
        );
    }

    /// Add `depth * (1 - d / radius)` to every cell whose center lies within
    /// `radius` meters of the pulse center
    ///
    /// Returns the number of cells that received water. Pulses with a
    /// non-positive radius or depth are ignored.
    pub fn add_localized_pulse(&mut self, grid: &GridModel, pulse: &WaterPulse) -> usize {
        let valid = pulse.center.is_finite()
            && pulse.radius_m.is_finite()
            && pulse.radius_m > 0.0
            && pulse.depth_m.is_finite()
            && pulse.depth_m > 0.0;
        if !valid {
            debug!(?pulse, "Ignoring degenerate water pulse");
            return 0;
        }

        let radius = f64::from(pulse.radius_m);
        let mut touched = 0;
        for j in 0..grid.height() {
            for i in 0..grid.width() {
                let d = grid.distance_meters(pulse.center, grid.cell_center(i, j));
                if d <= radius {
                    let added = pulse.depth_m * (1.0 - (d / radius) as f32);
                    let idx = grid.cell_index(i, j);
                    self.depth.data[idx] += added.max(0.0);
                    touched += 1;
                }
            }
        }
        debug!(cells = touched, depth = pulse.depth_m, "Applied water pulse");
        touched
    }
}

/// Add `amount` to every cell
fn add_uniform(depth: &mut [f32], amount: f32) {
    if amount > 0.0 {
        depth.par_iter_mut().for_each(|d| *d += amount);
    }
}

/// Compute clamped outflow and its split across lower-head neighbors
///
/// # Arguments
///
/// * `depth` - Depth field after rainfall
/// * `terrain` - Cell-center terrain
/// * `flow_k` - Flow coefficient (1/s)
/// * `dt` - Step length (s)
/// * `outflow` - Output: total water leaving each cell
/// * `transfers` - Output: water sent toward each direction
fn compute_outflows(
    depth: &FieldData,
    terrain: &FieldData,
    flow_k: f32,
    dt: f32,
    outflow: &mut [f32],
    transfers: &mut [[f32; 4]],
) {
    let width = depth.width;
    let height = depth.height;
    let d = &depth.data;
    let t = &terrain.data;
    let k = f64::from(flow_k);

    outflow
        .par_chunks_mut(width)
        .zip(transfers.par_chunks_mut(width))
        .enumerate()
        .for_each(|(y, (out_row, share_row))| {
            for x in 0..width {
                let idx = y * width + x;
                let water = d[idx];
                share_row[x] = [0.0; 4];
                out_row[x] = 0.0;
                if water <= 0.0 || flow_k <= 0.0 {
                    continue;
                }

                let head = f64::from(t[idx]) + f64::from(water);
                let mut potential = [0.0_f64; 4];
                let mut total = 0.0_f64;
                for (slot, n) in neighbor_slots(x, y, width, height).into_iter().enumerate() {
                    let Some((nx, ny)) = n else { continue };
                    let n = ny * width + nx;
                    let diff = head - (f64::from(t[n]) + f64::from(d[n]));
                    if diff > 0.0 {
                        potential[slot] = k * diff;
                        total += potential[slot];
                    }
                }
                if total <= 0.0 {
                    continue;
                }

                let out = f64::from(water).min(total * f64::from(dt));
                out_row[x] = out as f32;
                for (share, p) in share_row[x].iter_mut().zip(potential) {
                    *share = (out * p / total) as f32;
                }
            }
        });
}

/// Write `depth - outflow + inflow` for every cell into `depth_out`
fn apply_transfers(
    depth_in: &[f32],
    outflow: &[f32],
    transfers: &[[f32; 4]],
    width: usize,
    depth_out: &mut [f32],
) {
    let height = depth_in.len() / width;
    depth_out
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, cell) in row.iter_mut().enumerate() {
                let idx = y * width + x;
                let mut inflow = 0.0;
                for (dir, n) in Direction::ALL.into_iter().zip(neighbor_slots(x, y, width, height)) {
                    if let Some((nx, ny)) = n {
                        // The neighbor on our `dir` side sends toward us
                        inflow += transfers[ny * width + nx][dir.opposite() as usize];
                    }
                }
                *cell = (depth_in[idx] - outflow[idx] + inflow).max(0.0);
            }
        });
}

/// Remove `amount` from every cell, then clear residue below `epsilon`
fn drain(depth: &mut [f32], amount: f32, epsilon: f32) {
    depth.par_iter_mut().for_each(|d| {
        let left = (*d - amount).max(0.0);
        *d = if left < epsilon { 0.0 } else { left };
    });
}
