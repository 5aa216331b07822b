//! Synthetic grid generators for tests.

use hazard_common::Grid2;
use grid_source::LatLonGrid;

/// Build a regularly spaced lat/lon grid spanning the given ranges.
///
/// Row 0 is at `lat_min`; column 0 at `lon_min`. With a single row or
/// column the coordinate is pinned at the minimum.
pub fn uniform_latlon(ny: usize, nx: usize, lat_min: f64, lat_max: f64, lon_min: f64, lon_max: f64) -> LatLonGrid {
    let mut lat = Vec::with_capacity(ny * nx);
    let mut lon = Vec::with_capacity(ny * nx);
    for j in 0..ny {
        let la = if ny > 1 {
            lat_min + (lat_max - lat_min) * j as f64 / (ny - 1) as f64
        } else {
            lat_min
        };
        for i in 0..nx {
            let lo = if nx > 1 {
                lon_min + (lon_max - lon_min) * i as f64 / (nx - 1) as f64
            } else {
                lon_min
            };
            lat.push(la);
            lon.push(lo);
        }
    }
    LatLonGrid { lat, lon, ny, nx }
}

/// A lat/lon grid entirely inside the Colorado bounding box.
pub fn colorado_latlon(ny: usize, nx: usize) -> LatLonGrid {
    uniform_latlon(ny, nx, 37.0, 41.0, -109.0, -102.0)
}

/// Build a value grid from a per-cell function of (row, col).
pub fn grid_from_fn(ny: usize, nx: usize, f: impl Fn(usize, usize) -> f32) -> Grid2 {
    let mut values = Vec::with_capacity(ny * nx);
    for j in 0..ny {
        for i in 0..nx {
            values.push(f(j, i));
        }
    }
    Grid2::new(values, ny, nx)
}

/// Grid holding one constant everywhere.
pub fn constant_grid(ny: usize, nx: usize, value: f32) -> Grid2 {
    Grid2::filled(value, ny, nx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_latlon_spans_ranges() {
        let g = uniform_latlon(3, 5, 36.0, 42.0, -110.0, -100.0);
        assert_eq!(g.shape(), (3, 5));
        assert_eq!(g.lat_at(0, 0), 36.0);
        assert_eq!(g.lat_at(2, 4), 42.0);
        assert_eq!(g.lon_at(0, 0), -110.0);
        assert_eq!(g.lon_at(2, 4), -100.0);
    }

    #[test]
    fn test_grid_from_fn() {
        let g = grid_from_fn(2, 2, |j, i| (j * 10 + i) as f32);
        assert_eq!(g.get(0, 1), Some(1.0));
        assert_eq!(g.get(1, 0), Some(10.0));
    }
}
