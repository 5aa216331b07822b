//! JSON payload types shared by the product calculators.

use serde::{Deserialize, Serialize};

/// Approximate cell size in degrees of the clipped, strided output grid
/// (3 km native spacing at stride 2).
pub const CELL_SIZE_DEG: f64 = 0.055;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GustPoint {
    pub lat: f64,
    pub lon: f64,
    pub gust_kt: f64,
}

/// Surface wind gust product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GustPayload {
    pub model: String,
    pub cycle_utc: String,
    pub valid_utc: String,
    pub fxx: u8,
    pub cell_size_deg: f64,
    pub point_count: usize,
    pub points: Vec<GustPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FroudePoint {
    pub lat: f64,
    pub lon: f64,
    /// Froude number, clipped to [0, 10].
    pub fr: f64,
    /// Flow regime category, 1 (blocked) through 4 (supercritical).
    pub cat: u8,
    /// 700 mb wind speed in knots.
    pub wind_kt: f64,
    /// Brunt-Vaisala frequency, 1/s.
    #[serde(rename = "N")]
    pub n: f64,
    /// Effective barrier height above the reference plain, meters.
    pub h_m: f64,
    /// Model terrain height, meters.
    pub orog_m: f64,
}

/// Mountain-wave Froude number product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FroudePayload {
    pub model: String,
    pub product: String,
    pub wind_level_mb: u16,
    pub stability_layers: String,
    pub cycle_utc: String,
    pub valid_utc: String,
    pub fxx: u8,
    pub cell_size_deg: f64,
    pub point_count: usize,
    pub points: Vec<FroudePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirgaPoint {
    pub lat: f64,
    pub lon: f64,
    /// Strongest sub-cloud RH decrease, percentage points, clamped to [0, 100].
    pub virga_pct: f64,
    /// Severity category 1 through 4.
    pub cat: u8,
    /// Wind speed near the inferred cloud base, knots.
    pub cb_wind_kt: f64,
    /// Best upper-level moisture window mean RH, percent.
    pub upper_rh: f64,
}

/// Virga-potential product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VirgaPayload {
    pub model: String,
    pub product: String,
    pub levels_mb: String,
    pub cycle_utc: String,
    pub valid_utc: String,
    pub fxx: u8,
    pub cell_size_deg: f64,
    pub point_count: usize,
    pub points: Vec<VirgaPoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_froude_point_serializes_n_uppercase() {
        let p = FroudePoint {
            lat: 39.1235,
            lon: -105.5,
            fr: 0.483,
            cat: 1,
            wind_kt: 19.4,
            n: 0.01379,
            h_m: 1500.0,
            orog_m: 3000.0,
        };
        let v = serde_json::to_value(&p).unwrap();
        assert!(v.get("N").is_some());
        assert!(v.get("n").is_none());
    }
}
