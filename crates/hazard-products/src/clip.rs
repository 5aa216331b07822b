//! Region clipping with a cached per-shape index.
//!
//! All three products clip the full model grid down to the configured
//! bounding box with the same subsetting logic. The scan over the coordinate
//! arrays is the expensive part, and its result depends only on the grid
//! shape, so the computed [`ClipIndex`] is cached keyed by shape and reused
//! for every field from the same grid.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::debug;

use grid_source::LatLonGrid;
use hazard_common::{BoundingBox, Grid2};

use crate::error::ProductError;

/// Row/column window plus stride that extracts the region from a grid of a
/// particular shape. `row1`/`col1` are exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClipIndex {
    pub row0: usize,
    pub row1: usize,
    pub col0: usize,
    pub col1: usize,
    pub stride: usize,
}

impl ClipIndex {
    /// Shape of the clipped output.
    pub fn out_shape(&self) -> (usize, usize) {
        let ny = (self.row1 - self.row0).div_ceil(self.stride);
        let nx = (self.col1 - self.col0).div_ceil(self.stride);
        (ny, nx)
    }

    /// Extract the strided window from a value grid.
    pub fn apply(&self, grid: &Grid2) -> Grid2 {
        let (ny, nx) = self.out_shape();
        let mut values = Vec::with_capacity(ny * nx);
        for row in (self.row0..self.row1).step_by(self.stride) {
            for col in (self.col0..self.col1).step_by(self.stride) {
                values.push(grid.values[row * grid.nx + col]);
            }
        }
        Grid2::new(values, ny, nx)
    }

    /// Extract the strided window from coordinate arrays.
    pub fn apply_coords(&self, coords: &LatLonGrid) -> LatLonGrid {
        let (ny, nx) = self.out_shape();
        let mut lat = Vec::with_capacity(ny * nx);
        let mut lon = Vec::with_capacity(ny * nx);
        for row in (self.row0..self.row1).step_by(self.stride) {
            for col in (self.col0..self.col1).step_by(self.stride) {
                lat.push(coords.lat_at(row, col));
                lon.push(coords.lon_at(row, col));
            }
        }
        LatLonGrid { lat, lon, ny, nx }
    }
}

/// Clips fields to a bounding box at a fixed stride.
pub struct RegionClipper {
    bbox: BoundingBox,
    stride: usize,
    /// ClipIndex per source grid shape.
    cache: Mutex<HashMap<(usize, usize), ClipIndex>>,
}

impl RegionClipper {
    pub fn new(bbox: BoundingBox, stride: usize) -> Self {
        assert!(stride >= 1, "stride must be at least 1");
        Self {
            bbox,
            stride,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn bbox(&self) -> BoundingBox {
        self.bbox
    }

    /// The clip index for a grid's coordinate arrays, computed once per shape.
    pub fn index_for(&self, coords: &LatLonGrid) -> Result<ClipIndex, ProductError> {
        let shape = coords.shape();
        if let Some(idx) = self.cache.lock().unwrap().get(&shape) {
            return Ok(*idx);
        }
        let idx = self.compute_index(coords)?;
        debug!(
            ny = shape.0,
            nx = shape.1,
            rows = ?(idx.row0, idx.row1),
            cols = ?(idx.col0, idx.col1),
            "computed clip index"
        );
        self.cache.lock().unwrap().insert(shape, idx);
        Ok(idx)
    }

    fn compute_index(&self, coords: &LatLonGrid) -> Result<ClipIndex, ProductError> {
        let (ny, nx) = coords.shape();
        let mut row0 = usize::MAX;
        let mut row1 = 0usize;
        let mut col0 = usize::MAX;
        let mut col1 = 0usize;
        for row in 0..ny {
            for col in 0..nx {
                if self.bbox.contains(coords.lat_at(row, col), coords.lon_at(row, col)) {
                    row0 = row0.min(row);
                    row1 = row1.max(row + 1);
                    col0 = col0.min(col);
                    col1 = col1.max(col + 1);
                }
            }
        }
        if row0 == usize::MAX {
            return Err(ProductError::RegionEmpty {
                ny,
                nx,
                bbox: self.bbox,
            });
        }
        Ok(ClipIndex {
            row0,
            row1,
            col0,
            col1,
            stride: self.stride,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{grid_from_fn, uniform_latlon};

    fn colorado_clipper(stride: usize) -> RegionClipper {
        RegionClipper::new(BoundingBox::colorado(), stride)
    }

    #[test]
    fn test_clip_selects_interior_window() {
        // 10x10 grid spanning well past the box on every side.
        let coords = uniform_latlon(10, 10, 30.0, 48.0, -115.0, -97.0);
        let clipper = colorado_clipper(1);
        let idx = clipper.index_for(&coords).unwrap();
        let (ny, nx) = idx.out_shape();
        assert!(ny > 0 && nx > 0);
        assert!(ny < 10 && nx < 10, "clip did not shrink the grid");
        let clipped = idx.apply_coords(&coords);
        for j in 0..clipped.ny {
            for i in 0..clipped.nx {
                let (la, lo) = (clipped.lat_at(j, i), clipped.lon_at(j, i));
                assert!(
                    BoundingBox::colorado().contains(la, lo),
                    "({la}, {lo}) escaped the box"
                );
            }
        }
    }

    #[test]
    fn test_clip_index_deterministic_and_cached() {
        let coords = uniform_latlon(20, 20, 30.0, 48.0, -115.0, -97.0);
        let clipper = colorado_clipper(2);
        let a = clipper.index_for(&coords).unwrap();
        let b = clipper.index_for(&coords).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_values_and_coords_share_shape() {
        let coords = uniform_latlon(12, 15, 30.0, 48.0, -115.0, -97.0);
        let values = grid_from_fn(12, 15, |j, i| (j * 15 + i) as f32);
        let clipper = colorado_clipper(2);
        let idx = clipper.index_for(&coords).unwrap();
        let v = idx.apply(&values);
        let c = idx.apply_coords(&coords);
        assert_eq!(v.shape(), (c.ny, c.nx));
        assert_eq!(v.shape(), idx.out_shape());
    }

    #[test]
    fn test_empty_region_is_an_error() {
        // Grid entirely over the Atlantic.
        let coords = uniform_latlon(8, 8, 20.0, 30.0, -40.0, -30.0);
        let clipper = colorado_clipper(2);
        let err = clipper.index_for(&coords).unwrap_err();
        assert!(matches!(err, ProductError::RegionEmpty { .. }));
    }

    #[test]
    fn test_stride_subsamples_rows_and_cols() {
        // All 6x6 cells inside the box; stride 2 keeps every other one.
        let coords = uniform_latlon(6, 6, 37.0, 41.0, -108.0, -103.0);
        let values = grid_from_fn(6, 6, |j, i| (j * 10 + i) as f32);
        let clipper = colorado_clipper(2);
        let idx = clipper.index_for(&coords).unwrap();
        let v = idx.apply(&values);
        assert_eq!(v.shape(), (3, 3));
        assert_eq!(v.get(0, 0), Some(0.0));
        assert_eq!(v.get(0, 1), Some(2.0));
        assert_eq!(v.get(1, 0), Some(20.0));
        assert_eq!(v.get(2, 2), Some(44.0));
    }
}
