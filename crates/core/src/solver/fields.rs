//! Row-major scalar fields shared by the grid and the hydraulic engine

/// 2D scalar field stored as a flat `Vec<f32>` in row-major order
///
/// Row `y` is the `y`-th row from the south edge, so `(x, y)` matches the
/// grid's `(i, j)` cell coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldData {
    /// Field values in row-major order (y * width + x)
    pub data: Vec<f32>,
    /// Grid width in cells
    pub width: usize,
    /// Grid height in cells
    pub height: usize,
}

impl FieldData {
    /// Dry field of `width` x `height` cells
    #[must_use]
    pub fn new(width: usize, height: usize) -> Self {
        Self::with_value(width, height, 0.0)
    }

    /// Create a new field with every cell set to `value`
    #[must_use]
    pub fn with_value(width: usize, height: usize, value: f32) -> Self {
        Self {
            data: vec![value; width * height],
            width,
            height,
        }
    }

    /// Wrap existing row-major values
    ///
    /// Returns `None` if `data.len() != width * height`.
    #[must_use]
    pub fn from_vec(width: usize, height: usize, data: Vec<f32>) -> Option<Self> {
        (data.len() == width * height).then_some(Self {
            data,
            width,
            height,
        })
    }

    /// Values in row-major order
    #[must_use]
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Number of cells
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the field has no cells
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> usize {
        assert!(
            x < self.width && y < self.height,
            "Cell ({x}, {y}) outside {}x{} field",
            self.width,
            self.height
        );
        y * self.width + x
    }

    /// Value of cell `(x, y)`
    ///
    /// # Panics
    ///
    /// Panics if the cell is outside the field.
    #[must_use]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[self.index(x, y)]
    }

    /// Overwrite cell `(x, y)`
    ///
    /// # Panics
    ///
    /// Panics if the cell is outside the field.
    pub fn set(&mut self, x: usize, y: usize, value: f32) {
        let i = self.index(x, y);
        self.data[i] = value;
    }

    /// Set every cell to `value`
    pub fn fill(&mut self, value: f32) {
        self.data.fill(value);
    }

    /// Sum of all values in f64
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.data.iter().map(|&v| f64::from(v)).sum()
    }

    /// Largest value, or 0 for an empty field
    #[must_use]
    pub fn max(&self) -> f32 {
        self.data.iter().copied().fold(0.0, f32::max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_start_at_south_edge() {
        let mut field = FieldData::new(4, 3);
        assert_eq!(field.len(), 12);
        field.set(1, 2, 0.75);
        assert_eq!(field.data[2 * 4 + 1], 0.75);
        assert_eq!(field.get(1, 2), 0.75);
        assert_eq!(field.max(), 0.75);
    }

    #[test]
    fn test_from_vec_checks_length() {
        assert!(FieldData::from_vec(2, 2, vec![0.0; 3]).is_none());
        let field = FieldData::from_vec(2, 2, vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(field.get(1, 1), 4.0);
        assert_eq!(field.sum(), 10.0);
        assert_eq!(field.max(), 4.0);
    }

    #[test]
    #[should_panic(expected = "outside 10x10 field")]
    fn test_field_bounds_check() {
        let field = FieldData::new(10, 10);
        let _ = field.get(10, 5);
    }
}
