use clap::{Parser, ValueEnum};
use flood_sim_core::grid::{TerrainData, DEFAULT_CENTER};
use flood_sim_core::solver::{FieldData, HydraulicEngine, SimulationParameters};
use flood_sim_core::{
    CellSize, GeoPoint, GeoTerrain, GridSpec, MillimetersPerDay, MillimetersPerHour, OutputMode,
    RenderOutput, Seconds, SimulationConfig, SimulationController, WaterPulse,
};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum TerrainKind {
    Flat,
    Hill,
    Valley,
    Random,
}

/// Flood simulation demo with configurable parameters
#[derive(Parser, Debug)]
#[command(name = "flood-sim-demo")]
#[command(about = "Headless rainfall and surface flow simulation", long_about = None)]
struct Args {
    /// JSON config file; command-line options override it
    #[arg(short, long)]
    config: Option<String>,

    /// Cells along longitude
    #[arg(long)]
    width: Option<usize>,

    /// Cells along latitude
    #[arg(long)]
    height: Option<usize>,

    /// Cell edge in meters (default is 0.0005° cells)
    #[arg(long)]
    cell_meters: Option<f32>,

    /// Grid center as `longitude,latitude`
    #[arg(long, value_parser = parse_point)]
    center: Option<GeoPoint>,

    /// Synthetic terrain under the grid
    #[arg(short, long, value_enum, default_value_t = TerrainKind::Hill)]
    terrain: TerrainKind,

    /// Relief of the synthetic terrain in meters
    #[arg(long, default_value_t = 15.0)]
    relief: f32,

    /// Seed for random terrain
    #[arg(long, default_value_t = 42)]
    seed: u64,

    /// Rainfall as a 24-hour total in mm
    #[arg(short, long)]
    rain_per_day: Option<f32>,

    /// Drainage in mm/h
    #[arg(short, long)]
    drainage: Option<f32>,

    /// Flow coefficient (1/s)
    #[arg(long)]
    flow_k: Option<f32>,

    /// Simulated seconds per wall-clock second
    #[arg(short, long)]
    speed: Option<f32>,

    /// Wall-clock seconds to simulate
    #[arg(long, default_value_t = 60.0)]
    duration: f32,

    /// Wall-clock frame length in seconds
    #[arg(long, default_value_t = 1.0 / 60.0)]
    frame_dt: f32,

    /// Report interval in wall-clock seconds
    #[arg(long, default_value_t = 5.0)]
    report_interval: f32,

    /// Output rebuilt each frame
    #[arg(short, long, value_enum)]
    output: Option<Mode>,

    /// Water pulse as `longitude,latitude,radius_m,depth_m`; repeatable
    #[arg(short, long, value_parser = parse_pulse)]
    pulse: Vec<WaterPulse>,

    /// Print the effective config as JSON and exit
    #[arg(long)]
    dump_config: bool,

    /// Run validation checks
    #[arg(short, long)]
    validate: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Mode {
    Mesh,
    Image,
}

impl From<Mode> for OutputMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Mesh => OutputMode::Mesh,
            Mode::Image => OutputMode::Image,
        }
    }
}

fn parse_floats(s: &str, n: usize) -> Result<Vec<f64>, String> {
    let values: Vec<f64> = s
        .split(',')
        .map(|v| v.trim().parse::<f64>().map_err(|e| format!("'{v}': {e}")))
        .collect::<Result<_, _>>()?;
    if values.len() == n {
        Ok(values)
    } else {
        Err(format!("expected {n} comma-separated numbers, got {}", values.len()))
    }
}

fn parse_point(s: &str) -> Result<GeoPoint, String> {
    let v = parse_floats(s, 2)?;
    Ok(GeoPoint::new(v[0], v[1]))
}

fn parse_pulse(s: &str) -> Result<WaterPulse, String> {
    let v = parse_floats(s, 4)?;
    Ok(WaterPulse::new(
        GeoPoint::new(v[0], v[1]),
        v[2] as f32,
        v[3] as f32,
    ))
}

/// Config file (or defaults) with command-line overrides applied
fn build_config(args: &Args) -> Result<SimulationConfig, String> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path).map_err(|e| e.to_string())?,
        None => SimulationConfig::default(),
    };

    let grid = &mut config.grid;
    if let Some(w) = args.width {
        grid.width = w;
    }
    if let Some(h) = args.height {
        grid.height = h;
    }
    if let Some(m) = args.cell_meters {
        grid.cell_size = CellSize::Meters(m);
    }
    if let Some(c) = args.center {
        grid.center = c;
    }

    let params = &mut config.parameters;
    if let Some(total) = args.rain_per_day {
        params.set_rainfall_per_day(MillimetersPerDay::new(total));
    }
    if let Some(d) = args.drainage {
        params.drainage_rate = MillimetersPerHour::new(d);
    }
    if let Some(k) = args.flow_k {
        params.flow_coefficient = k;
    }
    if let Some(s) = args.speed {
        params.speed_multiplier = s;
    }
    if let Some(mode) = args.output {
        config.output_mode = mode.into();
    }
    config.initial_pulses.extend(args.pulse.iter().copied());

    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

/// Synthetic terrain covering the grid footprint
fn build_terrain(args: &Args, spec: &GridSpec) -> GeoTerrain {
    let (dlon, dlat) = spec.degrees_per_cell();
    let scale = spec.scale();
    let width = (spec.width as f64 * dlon * scale.meters_per_degree_lon) as f32;
    let height = (spec.height as f64 * dlat * scale.meters_per_degree_lat) as f32;
    let resolution = (width.min(height) / 200.0).max(1.0);

    let data = match args.terrain {
        TerrainKind::Flat => TerrainData::flat(width, height, resolution, 0.0),
        TerrainKind::Hill => TerrainData::single_hill(
            width,
            height,
            resolution,
            0.0,
            args.relief,
            width.min(height) * 0.3,
        ),
        TerrainKind::Valley => {
            TerrainData::valley_between_hills(width, height, resolution, 0.0, args.relief)
        }
        TerrainKind::Random => {
            TerrainData::random_hills(width, height, resolution, 0.0, args.relief, 8, args.seed)
        }
    };
    info!(
        width_m = width,
        height_m = height,
        kind = ?args.terrain,
        "Built synthetic terrain"
    );
    GeoTerrain::centered(data, spec.center)
}

fn describe_output(output: Option<&RenderOutput>) -> String {
    match output {
        Some(RenderOutput::Mesh(mesh)) => format!(
            "mesh: {} vertices, {} triangles, r={:.0}m",
            mesh.vertex_count(),
            mesh.triangle_count(),
            mesh.bounding_sphere.radius
        ),
        Some(RenderOutput::Image(image)) => format!(
            "image: {}x{} px at {:.2}m",
            image.width, image.height, image.base_height
        ),
        None => "none".to_string(),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();

    let config = match build_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if args.dump_config {
        return match config.to_json_string() {
            Ok(json) => {
                println!("{json}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                error!("{e}");
                ExitCode::FAILURE
            }
        };
    }

    println!("=== Flood Simulation Demo ===\n");

    let terrain = build_terrain(&args, &config.grid);
    let mut sim = match SimulationController::from_config(&config, &terrain) {
        Ok(sim) => sim,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let p = sim.params();
    println!(
        "Grid: {}x{} cells of {:.0} m², centered at {}",
        sim.grid().width(),
        sim.grid().height(),
        sim.grid().cell_area_m2(),
        config.grid.center
    );
    println!(
        "Rain: {:.2} mm/h, Drainage: {:.2} mm/h, k: {:.2}/s, Speed: {:.0}x",
        *p.rainfall_rate, *p.drainage_rate, p.flow_coefficient, p.speed_multiplier
    );
    println!("Terrain quality: {:?}\n", sim.grid().quality());

    println!("Wall(s) | Sim(s)  | Steps  | Volume(m³)  | Mean(mm) | Max(m)  | Wet cells");
    println!("--------|---------|--------|-------------|----------|---------|----------");

    let frame_dt = if args.frame_dt.is_finite() && args.frame_dt > 0.0 {
        args.frame_dt
    } else {
        1.0 / 60.0
    };
    let mut wall = 0.0_f32;
    let mut next_report = 0.0_f32;

    while wall < args.duration {
        sim.tick(frame_dt);
        wall += frame_dt;

        if wall >= next_report {
            let s = sim.stats();
            println!(
                "{:7.1} | {:7.0} | {:6} | {:11.2} | {:8.3} | {:7.3} | {:9}",
                wall,
                s.simulated_seconds,
                s.steps,
                s.total_volume_m3,
                s.mean_depth_m * 1000.0,
                s.max_depth_m,
                s.wet_cells
            );
            next_report += args.report_interval.max(frame_dt);
        }
    }

    let s = sim.stats();
    println!("\n=== Simulation Complete ===");
    println!("Simulated time: {:.0}s in {} steps", s.simulated_seconds, s.steps);
    println!("Water on grid: {:.2} m³", s.total_volume_m3);
    println!("Deepest cell: {:.3} m", s.max_depth_m);
    println!(
        "Tick time: {:.3} ms last, {:.3} ms average",
        s.last_tick_ms, s.average_tick_ms
    );
    println!("Output: {}", describe_output(sim.output()));

    if args.validate && !run_validation_tests() {
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

fn check(name: &str, pass: bool, detail: &str) -> bool {
    let mark = if pass { "PASS" } else { "FAIL" };
    println!("  {mark}: {name} ({detail})");
    pass
}

fn run_validation_tests() -> bool {
    println!("\n=== Running Validation Tests ===\n");
    let mut all = true;

    // Test 1: 3600 mm/h for one second on a flat grid gives 1 mm everywhere
    println!("Test 1: Uniform Rainfall");
    let terrain = FieldData::new(5, 5);
    let mut engine = HydraulicEngine::new(5, 5);
    let params = SimulationParameters {
        rainfall_rate: MillimetersPerHour::new(3600.0),
        drainage_rate: MillimetersPerHour::ZERO,
        flow_coefficient: 0.0,
        ..SimulationParameters::default()
    };
    engine.step(&terrain, &params, Seconds::new(1.0));
    let max_err = engine
        .depth()
        .data
        .iter()
        .map(|d| (d - 0.001).abs())
        .fold(0.0_f32, f32::max);
    all &= check(
        "every cell holds 1 mm",
        max_err < 1e-7,
        &format!("max error {max_err:e}"),
    );

    // Test 2: flow alone moves water but never creates or destroys it
    println!("\nTest 2: Closed-System Conservation");
    let terrain = FieldData {
        data: vec![3.0, 2.0, 1.0, 0.0],
        width: 4,
        height: 1,
    };
    let mut engine = HydraulicEngine::new(4, 1);
    engine.set_depth(&FieldData::with_value(4, 1, 0.5));
    let closed = SimulationParameters {
        rainfall_rate: MillimetersPerHour::ZERO,
        drainage_rate: MillimetersPerHour::ZERO,
        depth_epsilon: 0.0,
        ..SimulationParameters::default()
    };
    let before = engine.depth().sum();
    for _ in 0..200 {
        engine.step(&terrain, &closed, Seconds::new(0.2));
    }
    let after = engine.depth().sum();
    all &= check(
        "total depth unchanged",
        (after - before).abs() < 1e-4,
        &format!("{before:.5} -> {after:.5}"),
    );
    all &= check(
        "water gathered downhill",
        engine.depth().get(3, 0) > engine.depth().get(0, 0),
        &format!(
            "top {:.3} m, bottom {:.3} m",
            engine.depth().get(0, 0),
            engine.depth().get(3, 0)
        ),
    );

    // Test 3: a pulse only wets cells inside its radius
    println!("\nTest 3: Pulse Locality");
    let spec = GridSpec::new(21, 21, CellSize::Meters(10.0), DEFAULT_CENTER);
    match SimulationController::from_config(
        &SimulationConfig {
            grid: spec,
            ..SimulationConfig::default()
        },
        &GeoTerrain::centered(TerrainData::flat(300.0, 300.0, 10.0, 0.0), DEFAULT_CENTER),
    ) {
        Ok(mut sim) => {
            let touched = sim.add_localized_pulse(&WaterPulse::new(DEFAULT_CENTER, 25.0, 1.0));
            let wet = sim.stats().wet_cells;
            all &= check(
                "only touched cells are wet",
                wet > 0 && wet <= touched,
                &format!("{touched} touched, {wet} wet"),
            );
        }
        Err(e) => all &= check("pulse grid", false, &e.to_string()),
    }

    println!("\n=== Validation Complete ===");
    all
}
