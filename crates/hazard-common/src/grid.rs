//! 2-D scalar grids stored as flat row-major arrays.

/// A 2-D array of f32 values in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid2 {
    pub values: Vec<f32>,
    /// Number of rows (latitude direction).
    pub ny: usize,
    /// Number of columns (longitude direction).
    pub nx: usize,
}

impl Grid2 {
    pub fn new(values: Vec<f32>, ny: usize, nx: usize) -> Self {
        debug_assert_eq!(values.len(), ny * nx);
        Self { values, ny, nx }
    }

    /// Grid filled with a constant value.
    pub fn filled(value: f32, ny: usize, nx: usize) -> Self {
        Self {
            values: vec![value; ny * nx],
            ny,
            nx,
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.ny, self.nx)
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row >= self.ny || col >= self.nx {
            return None;
        }
        self.values.get(row * self.nx + col).copied()
    }

    pub fn set(&mut self, row: usize, col: usize, value: f32) {
        if row < self.ny && col < self.nx {
            self.values[row * self.nx + col] = value;
        }
    }
}
