//! Geographic bounding box and longitude conventions.

use serde::{Deserialize, Serialize};

/// Normalize a longitude to the (-180, 180] convention.
///
/// Model grids frequently carry 0-360 longitudes. Every coordinate array
/// entering this workspace passes through here exactly once, at the grid
/// source boundary, so downstream bounding-box comparisons never see a
/// mixed convention.
pub fn normalize_lon(lon: f64) -> f64 {
    let mut l = lon % 360.0;
    if l > 180.0 {
        l -= 360.0;
    } else if l <= -180.0 {
        l += 360.0;
    }
    l
}

/// A geographic bounding box in WGS84 degrees, longitudes in (-180, 180].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    /// The Colorado region the hazard products cover.
    pub fn colorado() -> Self {
        Self::new(36.8, 41.2, -109.2, -101.9)
    }

    /// Check if a point is contained within this bounding box.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lon >= self.min_lon && lon <= self.max_lon
    }

    /// Width of the box in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Height of the box in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lon_range() {
        // normalize(L) must land in (-180, 180] and stay congruent mod 360
        for raw in [-720.0, -360.5, -180.0, -101.9, 0.0, 180.0, 237.28, 258.1, 360.0, 540.0] {
            let n = normalize_lon(raw);
            assert!(n > -180.0 && n <= 180.0, "normalize({raw}) = {n} out of range");
            let diff = (n - raw).rem_euclid(360.0);
            assert!(diff.abs() < 1e-9 || (diff - 360.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_normalize_lon_0_360_grid() {
        // HRRR-style 0-360 longitudes must compare correctly against a
        // negative-longitude box after normalization.
        let bbox = BoundingBox::colorado();
        let raw_lon = 255.0; // 255E == -105W, inside Colorado
        assert!(!bbox.contains(39.0, raw_lon));
        assert!(bbox.contains(39.0, normalize_lon(raw_lon)));
    }

    #[test]
    fn test_contains() {
        let bbox = BoundingBox::colorado();
        assert!(bbox.contains(39.7, -104.9)); // Denver
        assert!(!bbox.contains(35.0, -104.9)); // too far south
        assert!(!bbox.contains(39.7, -95.0)); // too far east
    }
}
