//! Water surface mesh export
//!
//! One vertex per grid corner, lifted by the mean depth of the cells that
//! share it. Positions are WGS84 Earth-centered meters, ready for a globe
//! renderer.

use super::BuildError;
use crate::core_types::geo::geodetic_to_ecef;
use crate::grid::GridModel;
use crate::solver::FieldData;
use nalgebra::Vector3;

/// Sphere enclosing every mesh vertex
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    /// Centroid of the vertices
    pub center: Vector3<f64>,
    /// Distance from the centroid to the farthest vertex
    pub radius: f64,
}

impl BoundingSphere {
    /// Sphere around `points`, `None` if empty
    pub fn from_points(points: &[Vector3<f64>]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }
        let center = points.iter().fold(Vector3::zeros(), |acc, p| acc + p) / points.len() as f64;
        let radius = points
            .iter()
            .map(|p| (p - center).norm())
            .fold(0.0, f64::max);
        Some(Self { center, radius })
    }
}

/// Triangle mesh of the water surface
#[derive(Debug, Clone, PartialEq)]
pub struct WaterMesh {
    /// Vertex positions, row-major over `(width + 1) x (height + 1)` corners
    pub positions: Vec<Vector3<f64>>,
    /// Texture coordinates `(i / width, j / height)` per vertex
    pub st: Vec<[f32; 2]>,
    /// Two triangles per cell
    pub indices: Vec<u32>,
    /// Bounds for culling
    pub bounding_sphere: BoundingSphere,
}

impl WaterMesh {
    /// Number of vertices
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of triangles
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }
}

/// Depth at vertex `(i, j)`: mean over the up to four adjacent cells
fn corner_depth(depth: &FieldData, i: usize, j: usize) -> f32 {
    let (w, h) = (depth.width, depth.height);
    let mut sum = 0.0;
    let mut count = 0_u32;
    for (ci, cj) in [
        (i.checked_sub(1), j.checked_sub(1)),
        (Some(i), j.checked_sub(1)),
        (i.checked_sub(1), Some(j)),
        (Some(i), Some(j)),
    ] {
        if let (Some(ci), Some(cj)) = (ci, cj) {
            if ci < w && cj < h {
                sum += depth.data[cj * w + ci];
                count += 1;
            }
        }
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f32
    }
}

/// Build the water surface mesh
///
/// # Errors
///
/// Returns [`BuildError`] if the depth field does not match the grid or a
/// vertex ends up at a non-finite position.
pub fn build_mesh(grid: &GridModel, depth: &FieldData) -> Result<WaterMesh, BuildError> {
    let (w, h) = (grid.width(), grid.height());
    if w == 0 || h == 0 {
        return Err(BuildError::EmptyGrid);
    }
    if depth.width != w || depth.height != h {
        return Err(BuildError::DepthSizeMismatch {
            expected: (w, h),
            actual: (depth.width, depth.height),
        });
    }

    let vertex_terrain = grid.vertex_terrain();
    let mut positions = Vec::with_capacity((w + 1) * (h + 1));
    let mut st = Vec::with_capacity((w + 1) * (h + 1));

    for j in 0..=h {
        for i in 0..=w {
            let elevation = vertex_terrain.get(i, j) + corner_depth(depth, i, j);
            let p = geodetic_to_ecef(grid.vertex_position(i, j), f64::from(elevation));
            if !(p.x.is_finite() && p.y.is_finite() && p.z.is_finite()) {
                return Err(BuildError::NonFiniteVertex { i, j });
            }
            positions.push(p);
            st.push([i as f32 / w as f32, j as f32 / h as f32]);
        }
    }

    let row = (w + 1) as u32;
    let mut indices = Vec::with_capacity(w * h * 6);
    for j in 0..h as u32 {
        for i in 0..w as u32 {
            let a = j * row + i;
            let b = a + 1;
            let c = a + row;
            let d = c + 1;
            indices.extend_from_slice(&[a, b, c, b, d, c]);
        }
    }

    let bounding_sphere = BoundingSphere::from_points(&positions).ok_or(BuildError::EmptyGrid)?;

    Ok(WaterMesh {
        positions,
        st,
        indices,
        bounding_sphere,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{CellSize, GridSpec, DEFAULT_CENTER};
    use approx::assert_relative_eq;

    fn grid(w: usize, h: usize) -> GridModel {
        GridModel::flat(GridSpec::new(w, h, CellSize::Meters(10.0), DEFAULT_CENTER)).unwrap()
    }

    #[test]
    fn test_mesh_topology() {
        let g = grid(3, 2);
        let mesh = build_mesh(&g, &FieldData::new(3, 2)).unwrap();
        assert_eq!(mesh.vertex_count(), 12);
        assert_eq!(mesh.triangle_count(), 12);
        assert_eq!(&mesh.indices[..6], &[0, 1, 4, 1, 5, 4]);
        assert_eq!(mesh.st[11], [1.0, 1.0]);
        assert!(mesh.indices.iter().all(|&k| (k as usize) < mesh.vertex_count()));
    }

    #[test]
    fn test_corner_depth_averages_adjacent_cells() {
        let depth = FieldData::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_relative_eq!(corner_depth(&depth, 0, 0), 1.0);
        assert_relative_eq!(corner_depth(&depth, 1, 0), 1.5);
        assert_relative_eq!(corner_depth(&depth, 1, 1), 2.5);
        assert_relative_eq!(corner_depth(&depth, 2, 2), 4.0);
    }

    #[test]
    fn test_depth_lifts_surface() {
        let g = grid(2, 2);
        let dry = build_mesh(&g, &FieldData::new(2, 2)).unwrap();
        let wet = build_mesh(&g, &FieldData::with_value(2, 2, 0.5)).unwrap();
        let lift = wet.positions[4].norm() - dry.positions[4].norm();
        assert_relative_eq!(lift, 0.5, epsilon = 1e-3);
    }

    #[test]
    fn test_mismatched_depth_rejected() {
        let g = grid(2, 2);
        assert!(matches!(
            build_mesh(&g, &FieldData::new(3, 2)),
            Err(BuildError::DepthSizeMismatch { .. })
        ));
    }

    #[test]
    fn test_bounding_sphere_contains_vertices() {
        let g = grid(4, 4);
        let mesh = build_mesh(&g, &FieldData::with_value(4, 4, 0.1)).unwrap();
        let s = mesh.bounding_sphere;
        assert!(mesh
            .positions
            .iter()
            .all(|p| (p - s.center).norm() <= s.radius + 1e-9));
    }
}
