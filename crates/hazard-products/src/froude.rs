//! Mountain-wave Froude number.
//!
//! Fr = |U_perp| / (N * h): the 700 mb wind component perpendicular to the
//! barrier, over Brunt-Vaisala frequency from the 850-500 mb layer times an
//! effective barrier height above the reference plain. Low Fr means blocked
//! flow; Fr near 1 favors large-amplitude mountain waves.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use grid_source::{FieldSelector, GridField, GridSource, ModelProduct, SourceError};
use hazard_common::{cycle_iso, round_to, valid_iso, MS_TO_KT};

use crate::clip::RegionClipper;
use crate::error::ProductError;
use crate::payload::{FroudePayload, FroudePoint, CELL_SIZE_DEG};

const G: f64 = 9.81;
/// Reference plain elevation subtracted from terrain, meters.
const PLAIN_ELEVATION_M: f64 = 1500.0;
/// Smallest effective barrier height, meters.
const MIN_BARRIER_M: f64 = 100.0;
/// Floor for N^2 so neutral or unstable layers stay finite.
const N2_FLOOR: f64 = 1e-6;

pub struct FroudeCalculator {
    source: Arc<dyn GridSource>,
    clipper: Arc<RegionClipper>,
    /// Barrier orientation in degrees; 270 is a north-south ridge facing
    /// westerly flow.
    barrier_angle_deg: f64,
}

impl FroudeCalculator {
    pub fn new(
        source: Arc<dyn GridSource>,
        clipper: Arc<RegionClipper>,
        barrier_angle_deg: f64,
    ) -> Self {
        Self {
            source,
            clipper,
            barrier_angle_deg,
        }
    }

    pub async fn compute(
        &self,
        cycle: DateTime<Utc>,
        fxx: u8,
    ) -> Result<FroudePayload, ProductError> {
        let selectors = [
            FieldSelector::pressure("UGRD", 700),
            FieldSelector::pressure("VGRD", 700),
            FieldSelector::pressure("TMP", 850),
            FieldSelector::pressure("TMP", 500),
            FieldSelector::pressure("HGT", 850),
            FieldSelector::pressure("HGT", 500),
        ];
        let mut fields = self
            .source
            .materialize_batch(cycle, ModelProduct::Prs, fxx, &selectors)
            .await?;

        let mut take = |slot: usize, name: &str| -> Result<GridField, ProductError> {
            fields[slot].take().ok_or_else(|| ProductError::MissingField {
                field: name.to_string(),
            })
        };
        let u700 = take(0, "UGRD 700 mb")?;
        let v700 = take(1, "VGRD 700 mb")?;
        let t850 = take(2, "TMP 850 mb")?;
        let t500 = take(3, "TMP 500 mb")?;
        let z850 = take(4, "HGT 850 mb")?;
        let z500 = take(5, "HGT 500 mb")?;

        let orog = self.terrain_height(cycle, fxx, &z850).await?;

        for f in [&v700, &t850, &t500, &z850, &z500, &orog] {
            if f.shape() != u700.shape() {
                return Err(ProductError::ShapeMismatch {
                    a: u700.shape(),
                    b: f.shape(),
                });
            }
        }

        let idx = self.clipper.index_for(&u700.coords)?;
        let coords = idx.apply_coords(&u700.coords);
        let u = idx.apply(&u700.values);
        let v = idx.apply(&v700.values);
        let t8 = idx.apply(&t850.values);
        let t5 = idx.apply(&t500.values);
        let z8 = idx.apply(&z850.values);
        let z5 = idx.apply(&z500.values);
        let or = idx.apply(&orog.values);

        let barrier_rad = self.barrier_angle_deg.to_radians();
        let mut points = Vec::with_capacity(u.values.len());
        for c in 0..u.values.len() {
            let Some(cell) = froude_cell(
                u.values[c] as f64,
                v.values[c] as f64,
                t8.values[c] as f64,
                t5.values[c] as f64,
                z8.values[c] as f64,
                z5.values[c] as f64,
                or.values[c] as f64,
                barrier_rad,
            ) else {
                continue;
            };
            points.push(FroudePoint {
                lat: round_to(coords.lat[c], 4),
                lon: round_to(coords.lon[c], 4),
                fr: round_to(cell.fr, 3),
                cat: cell.cat,
                wind_kt: round_to(cell.wind_ms * MS_TO_KT, 1),
                n: round_to(cell.n, 5),
                h_m: round_to(cell.h_m, 0),
                orog_m: round_to(cell.orog_m, 0),
            });
        }
        info!(
            cycle = %cycle_iso(cycle),
            fxx,
            points = points.len(),
            "computed froude product"
        );
        Ok(FroudePayload {
            model: "HRRR".to_string(),
            product: "prs+sfc".to_string(),
            wind_level_mb: 700,
            stability_layers: "850-500 mb".to_string(),
            cycle_utc: cycle_iso(cycle),
            valid_utc: valid_iso(cycle, fxx),
            fxx,
            cell_size_deg: CELL_SIZE_DEG,
            point_count: points.len(),
            points,
        })
    }

    /// Terrain height from the surface file, with a fallback chain: surface
    /// geopotential height, then geometric height, then the 850 mb height
    /// field as a last-resort proxy.
    async fn terrain_height(
        &self,
        cycle: DateTime<Utc>,
        fxx: u8,
        z850: &GridField,
    ) -> Result<GridField, ProductError> {
        for selector in [
            FieldSelector::surface("HGT"),
            FieldSelector::surface("DIST"),
        ] {
            match self
                .source
                .materialize(cycle, ModelProduct::Sfc, fxx, &selector)
                .await
            {
                Ok(field) => return Ok(field),
                Err(SourceError::FieldNotFound { .. }) => continue,
                Err(e) => return Err(e.into()),
            }
        }
        warn!("no terrain field in surface file, using 850 mb height as proxy");
        Ok(z850.clone())
    }
}

pub(crate) struct FroudeCell {
    pub fr: f64,
    pub cat: u8,
    pub wind_ms: f64,
    pub n: f64,
    pub h_m: f64,
    pub orog_m: f64,
}

/// Froude diagnostics for one cell; `None` when any input is NaN.
#[allow(clippy::too_many_arguments)]
pub(crate) fn froude_cell(
    u: f64,
    v: f64,
    t850: f64,
    t500: f64,
    z850: f64,
    z500: f64,
    orog: f64,
    barrier_rad: f64,
) -> Option<FroudeCell> {
    let n = brunt_vaisala(
        potential_temperature(t850, 850.0),
        potential_temperature(t500, 500.0),
        z850,
        z500,
    );
    let h = terrain_scale(orog);
    let u_perp = u * barrier_rad.cos() + v * barrier_rad.sin();
    let fr = (u_perp.abs() / (n * h)).clamp(0.0, 10.0);
    if fr.is_nan() {
        return None;
    }
    Some(FroudeCell {
        fr,
        cat: froude_category(fr),
        wind_ms: u.hypot(v),
        n,
        h_m: h,
        orog_m: orog,
    })
}

/// Potential temperature via Poisson's equation with kappa = 0.286.
pub fn potential_temperature(t_k: f64, p_mb: f64) -> f64 {
    t_k * (1000.0 / p_mb).powf(0.286)
}

/// Dry Brunt-Vaisala frequency over a layer, floored at sqrt(1e-6) 1/s.
pub fn brunt_vaisala(theta_lo: f64, theta_hi: f64, z_lo: f64, z_hi: f64) -> f64 {
    let theta_mean = 0.5 * (theta_lo + theta_hi);
    let n2 = (G / theta_mean) * (theta_hi - theta_lo) / (z_hi - z_lo);
    n2.max(N2_FLOOR).sqrt()
}

/// Effective barrier height above the reference plain.
pub fn terrain_scale(orog_m: f64) -> f64 {
    (orog_m - PLAIN_ELEVATION_M).max(MIN_BARRIER_M)
}

/// Flow regime category: 1 blocked, 2 transitional, 3 wave-favorable,
/// 4 supercritical.
pub fn froude_category(fr: f64) -> u8 {
    if fr < 0.5 {
        1
    } else if fr < 0.8 {
        2
    } else if fr <= 1.5 {
        3
    } else {
        4
    }
}
