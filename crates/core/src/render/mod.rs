//! Render-ready outputs built from the depth field
//!
//! Builders only read the grid and depth field, so the same inputs always
//! produce the same output. Renderers replace their previous output wholesale.

pub mod image;
pub mod mesh;

pub use image::{build_image, depth_color, DepthImage};
pub use mesh::{build_mesh, BoundingSphere, WaterMesh};

use crate::grid::GridModel;
use crate::solver::FieldData;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which output the controller rebuilds after each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputMode {
    /// Elevated water surface mesh
    #[default]
    Mesh,
    /// Draped RGBA depth raster
    Image,
}

/// Output of one build
#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutput {
    /// Surface mesh
    Mesh(WaterMesh),
    /// Depth raster
    Image(DepthImage),
}

impl RenderOutput {
    /// Mode this output was built for
    pub fn mode(&self) -> OutputMode {
        match self {
            RenderOutput::Mesh(_) => OutputMode::Mesh,
            RenderOutput::Image(_) => OutputMode::Image,
        }
    }
}

/// Build the output for `mode`
///
/// # Errors
///
/// Propagates the builder's [`BuildError`].
pub fn build_output(
    mode: OutputMode,
    grid: &GridModel,
    depth: &FieldData,
    max_display_depth: f32,
) -> Result<RenderOutput, BuildError> {
    match mode {
        OutputMode::Mesh => build_mesh(grid, depth).map(RenderOutput::Mesh),
        OutputMode::Image => build_image(grid, depth, max_display_depth).map(RenderOutput::Image),
    }
}

/// Output builder errors
#[derive(Debug, Clone, PartialEq)]
pub enum BuildError {
    /// Grid has no cells
    EmptyGrid,
    /// Depth field dimensions differ from the grid's
    DepthSizeMismatch {
        /// Grid `(width, height)`
        expected: (usize, usize),
        /// Depth field `(width, height)`
        actual: (usize, usize),
    },
    /// Vertex `(i, j)` has a non-finite position
    NonFiniteVertex {
        /// Column
        i: usize,
        /// Row
        j: usize,
    },
    /// Display depth must be positive
    InvalidDisplayDepth(f32),
}

impl fmt::Display for BuildError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildError::EmptyGrid => write!(f, "Grid has no cells"),
            BuildError::DepthSizeMismatch { expected, actual } => write!(
                f,
                "Depth field is {}x{}, grid is {}x{}",
                actual.0, actual.1, expected.0, expected.1
            ),
            BuildError::NonFiniteVertex { i, j } => {
                write!(f, "Vertex ({i}, {j}) has a non-finite position")
            }
            BuildError::InvalidDisplayDepth(d) => write!(f, "Invalid display depth: {d}"),
        }
    }
}

impl std::error::Error for BuildError {}
