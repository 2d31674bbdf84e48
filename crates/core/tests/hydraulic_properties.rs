//! Invariants of the hydraulic step: non-negativity, conservation, source
//! monotonicity, downhill-only flow, outflow clamping, pulse locality and two
//! exact small-grid scenarios.
use approx::assert_relative_eq;
use flood_sim_core::grid::{CellSize, GridModel, GridSpec, DEFAULT_CENTER};
use flood_sim_core::solver::{
    Direction, FieldData, HydraulicEngine, SimulationParameters, WaterPulse,
};
use flood_sim_core::{MillimetersPerHour, Seconds};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Flow only: no rain, no drainage, no residue snapping
fn closed_params(flow_coefficient: f32) -> SimulationParameters {
    SimulationParameters {
        rainfall_rate: MillimetersPerHour::ZERO,
        drainage_rate: MillimetersPerHour::ZERO,
        flow_coefficient,
        depth_epsilon: 0.0,
        ..SimulationParameters::default()
    }
}

fn random_field(width: usize, height: usize, max: f32, rng: &mut StdRng) -> FieldData {
    let data = (0..width * height)
        .map(|_| rng.random_range(0.0..max))
        .collect();
    FieldData::from_vec(width, height, data).unwrap()
}

fn heads(terrain: &FieldData, depth: &FieldData) -> Vec<f32> {
    terrain
        .data
        .iter()
        .zip(&depth.data)
        .map(|(t, d)| t + d)
        .collect()
}

#[test]
fn depth_never_negative() {
    let mut rng = StdRng::seed_from_u64(7);
    let (w, h) = (24, 17);
    let terrain = random_field(w, h, 5.0, &mut rng);
    let mut engine = HydraulicEngine::new(w, h);
    engine.set_depth(&random_field(w, h, 0.3, &mut rng));

    let params = SimulationParameters {
        rainfall_rate: MillimetersPerHour::new(20.0),
        drainage_rate: MillimetersPerHour::new(400.0),
        flow_coefficient: 2.0,
        ..SimulationParameters::default()
    };

    for _ in 0..200 {
        engine.step(&terrain, &params, Seconds::new(5.0));
        assert!(engine.depth().data.iter().all(|&d| d >= 0.0));
    }
}

#[test]
fn closed_system_conserves_water() {
    let mut rng = StdRng::seed_from_u64(11);
    let (w, h) = (30, 20);
    let terrain = random_field(w, h, 3.0, &mut rng);
    let mut engine = HydraulicEngine::new(w, h);
    engine.set_depth(&random_field(w, h, 0.5, &mut rng));
    let initial = engine.depth().sum();

    let params = closed_params(0.6);
    for _ in 0..500 {
        engine.step(&terrain, &params, Seconds::new(0.5));
    }

    assert_relative_eq!(engine.depth().sum(), initial, max_relative = 1e-4);
}

#[test]
fn rain_without_flow_raises_every_cell() {
    let (w, h) = (8, 8);
    let terrain = FieldData::new(w, h);
    let mut engine = HydraulicEngine::new(w, h);
    let params = SimulationParameters {
        rainfall_rate: MillimetersPerHour::new(10.0),
        drainage_rate: MillimetersPerHour::ZERO,
        flow_coefficient: 0.0,
        ..SimulationParameters::default()
    };

    let mut previous = engine.depth().clone();
    for _ in 0..50 {
        engine.step(&terrain, &params, Seconds::new(2.0));
        for (now, before) in engine.depth().data.iter().zip(&previous.data) {
            assert!(now > before);
        }
        previous = engine.depth().clone();
    }
}

#[test]
fn flow_only_runs_downhill() {
    let mut rng = StdRng::seed_from_u64(23);
    let (w, h) = (16, 12);
    let terrain = random_field(w, h, 2.0, &mut rng);
    let mut engine = HydraulicEngine::new(w, h);
    engine.set_depth(&random_field(w, h, 0.4, &mut rng));
    let params = closed_params(0.8);

    for _ in 0..20 {
        let before = heads(&terrain, engine.depth());
        engine.step(&terrain, &params, Seconds::new(0.25));

        for y in 0..h {
            for x in 0..w {
                let idx = y * w + x;
                let targets = [
                    (Direction::West, x.checked_sub(1).map(|_| idx - 1)),
                    (Direction::East, (x + 1 < w).then_some(idx + 1)),
                    (Direction::South, y.checked_sub(1).map(|_| idx - w)),
                    (Direction::North, (y + 1 < h).then_some(idx + w)),
                ];
                for (dir, n) in targets {
                    let sent = engine.transfer(idx, dir);
                    assert!(sent >= 0.0);
                    match n {
                        Some(n) if before[idx] <= before[n] => assert_eq!(sent, 0.0),
                        None => assert_eq!(sent, 0.0),
                        _ => {}
                    }
                }
            }
        }
    }
}

#[test]
fn outflow_is_clamped_to_available_water() {
    // Middle cell sits 10 m above dry neighbors; potential far exceeds depth
    let terrain = FieldData::from_vec(3, 1, vec![0.0, 10.0, 0.0]).unwrap();
    let mut engine = HydraulicEngine::new(3, 1);
    engine.set_depth(&FieldData::from_vec(3, 1, vec![0.0, 0.1, 0.0]).unwrap());

    engine.step(&terrain, &closed_params(0.6), Seconds::new(1.0));

    assert_eq!(engine.outflow().get(1, 0), 0.1);
    assert_eq!(engine.depth().get(1, 0), 0.0);
    assert_relative_eq!(engine.depth().get(0, 0), 0.05, epsilon = 1e-7);
    assert_relative_eq!(engine.depth().get(2, 0), 0.05, epsilon = 1e-7);
}

#[test]
fn pulse_only_touches_cells_within_radius() {
    let spec = GridSpec::new(21, 21, CellSize::Meters(10.0), DEFAULT_CENTER);
    let grid = GridModel::flat(spec).unwrap();
    let mut engine = HydraulicEngine::new(21, 21);
    engine.set_depth(&FieldData::with_value(21, 21, 0.2));

    let center = grid.cell_center(10, 10);
    let pulse = WaterPulse::new(center, 35.0, 1.5);
    let touched = engine.add_localized_pulse(&grid, &pulse);
    assert!(touched > 1);

    for j in 0..21 {
        for i in 0..21 {
            let d = grid.distance_meters(center, grid.cell_center(i, j));
            let depth = engine.depth().get(i, j);
            if d > 35.0 {
                assert_eq!(depth, 0.2, "cell ({i}, {j}) at {d:.1} m changed");
            } else {
                assert!(depth >= 0.2);
            }
        }
    }
    assert_relative_eq!(engine.depth().get(10, 10), 1.7, epsilon = 1e-6);
}

#[test]
fn flat_grid_single_rain_step() {
    let terrain = FieldData::new(5, 5);
    let mut engine = HydraulicEngine::new(5, 5);
    let params = SimulationParameters {
        rainfall_rate: MillimetersPerHour::new(3600.0),
        drainage_rate: MillimetersPerHour::ZERO,
        flow_coefficient: 0.0,
        ..SimulationParameters::default()
    };

    engine.step(&terrain, &params, Seconds::new(1.0));

    assert!(engine.depth().data.iter().all(|&d| d == 0.001));
}

#[test]
fn two_cell_head_difference_splits_evenly() {
    // A: terrain 0, dry. B: terrain 0, 10 m deep. Head gap 10 m, k = 0.5.
    let terrain = FieldData::from_vec(2, 1, vec![0.0, 0.0]).unwrap();
    let mut engine = HydraulicEngine::new(2, 1);
    engine.set_depth(&FieldData::from_vec(2, 1, vec![0.0, 10.0]).unwrap());

    engine.step(&terrain, &closed_params(0.5), Seconds::new(1.0));

    assert_eq!(engine.transfer(1, Direction::West), 5.0);
    assert_eq!(engine.depth().data, vec![5.0, 5.0]);
}

#[test]
fn equal_heads_do_not_exchange_water() {
    // A: terrain 10, dry. B: terrain 0, 10 m deep. Both heads are 10 m.
    let terrain = FieldData::from_vec(2, 1, vec![10.0, 0.0]).unwrap();
    let mut engine = HydraulicEngine::new(2, 1);
    engine.set_depth(&FieldData::from_vec(2, 1, vec![0.0, 10.0]).unwrap());

    engine.step(&terrain, &closed_params(0.5), Seconds::new(1.0));

    assert_eq!(engine.depth().data, vec![0.0, 10.0]);
    assert_eq!(engine.outflow().get(1, 0), 0.0);
}

#[test]
fn rain_then_flow_then_drainage() {
    // Dry cell 1 m above a wet one. Rain must land before flow so the upper
    // cell's rain runs off in the same step; drainage must come after flow.
    let terrain = FieldData::from_vec(2, 1, vec![1.0, 0.0]).unwrap();
    let mut engine = HydraulicEngine::new(2, 1);
    engine.set_depth(&FieldData::from_vec(2, 1, vec![0.0, 0.1]).unwrap());
    let params = SimulationParameters {
        // 2 mm and 1 mm per one-second step
        rainfall_rate: MillimetersPerHour::new(7200.0),
        drainage_rate: MillimetersPerHour::new(3600.0),
        flow_coefficient: 0.5,
        ..SimulationParameters::default()
    };
    engine.step(&terrain, &params, Seconds::new(1.0));

    // Flow before rain would leave [0.001, 0.101]; drainage before flow [0, 0.102]
    assert_eq!(engine.depth().get(0, 0), 0.0);
    assert_relative_eq!(engine.depth().get(1, 0), 0.103, epsilon = 1e-6);
}
