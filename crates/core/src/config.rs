//! Simulation configuration
//!
//! Loaded from JSON; every field is optional and defaults to the values the
//! flood layer ships with (100x100 cells of 0.0005°, 50 mm of rain per day,
//! 1 mm/h drainage).

use crate::grid::{GridSpec, GridSpecError, DEFAULT_FALLBACK_LEVEL};
use crate::render::OutputMode;
use crate::solver::{SimulationParameters, WaterPulse};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

/// Deepest tile level accepted for the fallback terrain query
const MAX_FALLBACK_LEVEL: u32 = 22;

/// Everything needed to start a simulation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Grid dimensions and placement
    pub grid: GridSpec,
    /// Engine parameters
    pub parameters: SimulationParameters,
    /// Output rebuilt after each tick
    pub output_mode: OutputMode,
    /// Tile level for the coarse terrain query
    pub terrain_fallback_level: u32,
    /// Pulses applied once at start-up
    pub initial_pulses: Vec<WaterPulse>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            grid: GridSpec::default(),
            parameters: SimulationParameters::default(),
            output_mode: OutputMode::default(),
            terrain_fallback_level: DEFAULT_FALLBACK_LEVEL,
            initial_pulses: Vec::new(),
        }
    }
}

impl SimulationConfig {
    /// Load and validate a JSON config file
    ///
    /// # Errors
    /// Returns error if the file cannot be read, parsed or validated
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        Self::from_json_str(&contents)
    }

    /// Parse and validate a JSON config
    ///
    /// # Errors
    /// Returns error if the text cannot be parsed or validated
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize as pretty JSON
    ///
    /// # Errors
    /// Returns error if serialization fails
    pub fn to_json_string(&self) -> Result<String, ConfigError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check values that would otherwise fail later
    ///
    /// Rates and coefficients are not checked here; the engine clamps them.
    ///
    /// # Errors
    /// Returns the first invalid setting found
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid.validate().map_err(ConfigError::Grid)?;

        let d = self.parameters.max_display_depth;
        if !d.is_finite() || d <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "max_display_depth must be positive, got {d}"
            )));
        }
        if self.terrain_fallback_level > MAX_FALLBACK_LEVEL {
            return Err(ConfigError::Invalid(format!(
                "terrain_fallback_level must be at most {MAX_FALLBACK_LEVEL}, got {}",
                self.terrain_fallback_level
            )));
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Failed to read file
    Io(String),
    /// Failed to parse or serialize JSON
    Parse(String),
    /// Grid settings invalid
    Grid(GridSpecError),
    /// Other setting invalid
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io(msg) => write!(f, "Failed to read config: {msg}"),
            ConfigError::Parse(msg) => write!(f, "Failed to parse config: {msg}"),
            ConfigError::Grid(e) => write!(f, "Invalid grid: {e}"),
            ConfigError::Invalid(msg) => write!(f, "Invalid config: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Grid(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::CellSize;

    #[test]
    fn test_empty_json_gives_defaults() {
        let config = SimulationConfig::from_json_str("{}").unwrap();
        assert_eq!(config, SimulationConfig::default());
        assert_eq!(config.grid.width, 100);
        assert_eq!(config.terrain_fallback_level, 11);
    }

    #[test]
    fn test_overrides() {
        let json = r#"{
            "grid": {"width": 20, "height": 10, "cell_size": {"meters": 5.0},
                     "center": {"longitude": 106.7, "latitude": 10.76}},
            "output_mode": "image",
            "initial_pulses": [
                {"center": {"longitude": 106.7, "latitude": 10.76}, "radius_m": 20.0, "depth_m": 0.5}
            ]
        }"#;
        let config = SimulationConfig::from_json_str(json).unwrap();
        assert_eq!(config.grid.cell_size, CellSize::Meters(5.0));
        assert_eq!(config.output_mode, OutputMode::Image);
        assert_eq!(config.initial_pulses.len(), 1);
    }

    #[test]
    fn test_invalid_grid_rejected() {
        let json = r#"{"grid": {"width": 1, "height": 10, "cell_size": {"degrees": 0.001},
                       "center": {"longitude": 0.0, "latitude": 0.0}}}"#;
        assert!(matches!(
            SimulationConfig::from_json_str(json),
            Err(ConfigError::Grid(GridSpecError::TooSmall { .. }))
        ));
    }

    #[test]
    fn test_bad_display_depth_rejected() {
        let json = r#"{"parameters": {"max_display_depth": 0.0}}"#;
        assert!(matches!(
            SimulationConfig::from_json_str(json),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(
            SimulationConfig::from_json_str("{"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let config = SimulationConfig::default();
        let text = config.to_json_string().unwrap();
        assert_eq!(SimulationConfig::from_json_str(&text).unwrap(), config);
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            SimulationConfig::load("/nonexistent/flood.json"),
            Err(ConfigError::Io(_))
        ));
    }
}
