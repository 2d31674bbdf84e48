//! Hydraulic solver
//!
//! [`HydraulicEngine`] owns the depth field and advances it with
//! [`HydraulicEngine::step`]. [`TickPlan`] turns wall-clock deltas into the
//! substeps the engine runs.

pub mod fields;
pub mod hydraulics;
pub mod params;
pub mod profiler;
pub mod tick;

pub use fields::FieldData;
pub use hydraulics::{Direction, HydraulicEngine, WaterPulse};
pub use params::SimulationParameters;
pub use profiler::{FrameTimer, ProfilerScope};
pub use tick::{TickDriver, TickPlan};
