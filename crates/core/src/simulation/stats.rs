//! Aggregate water statistics

use crate::solver::FieldData;
use serde::{Deserialize, Serialize};

/// Running totals and a snapshot of the depth field
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationStats {
    /// Simulated seconds since start or reset
    pub simulated_seconds: f64,
    /// Engine steps since start or reset
    pub steps: u64,
    /// Water held on the grid (m³)
    pub total_volume_m3: f64,
    /// Mean depth over all cells (m)
    pub mean_depth_m: f32,
    /// Deepest cell (m)
    pub max_depth_m: f32,
    /// Cells holding any water
    pub wet_cells: usize,
    /// Wall time of the last tick (ms)
    pub last_tick_ms: f64,
    /// Smoothed wall time per tick (ms)
    pub average_tick_ms: f64,
}

impl SimulationStats {
    /// Refresh the depth snapshot
    pub fn measure(&mut self, depth: &FieldData, cell_area_m2: f64) {
        let total = depth.sum();
        self.total_volume_m3 = total * cell_area_m2;
        self.mean_depth_m = if depth.is_empty() {
            0.0
        } else {
            (total / depth.len() as f64) as f32
        };
        self.max_depth_m = depth.max();
        self.wet_cells = depth.data.iter().filter(|&&d| d > 0.0).count();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_measure() {
        let depth = FieldData::from_vec(2, 2, vec![0.0, 0.1, 0.3, 0.0]).unwrap();
        let mut stats = SimulationStats::default();
        stats.measure(&depth, 100.0);
        assert_relative_eq!(stats.total_volume_m3, 40.0, epsilon = 1e-5);
        assert_relative_eq!(stats.mean_depth_m, 0.1, epsilon = 1e-6);
        assert_relative_eq!(stats.max_depth_m, 0.3);
        assert_eq!(stats.wet_cells, 2);
    }
}
