//! Virga-potential index.
//!
//! Virga needs moist air aloft over a dry sub-cloud layer. The index scans
//! a 500-850 mb pressure column per cell: a 200 mb "moisture window" in the
//! upper levels must average at least 80% RH (the gate), and the score is
//! the strongest RH decrease across any 100 mb step below, read bottom-up.
//! The wind at the level nearest the midpoint of the winning step is
//! reported as the cloud-base wind.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use grid_source::{FieldSelector, GridSource, ModelProduct};
use hazard_common::{cycle_iso, round_to, valid_iso, MS_TO_KT};

use crate::clip::RegionClipper;
use crate::error::ProductError;
use crate::payload::{VirgaPayload, VirgaPoint, CELL_SIZE_DEG};

/// Pressure levels scanned, ascending (top of the column first).
pub const VIRGA_LEVELS_MB: [u16; 15] = [
    500, 525, 550, 575, 600, 625, 650, 675, 700, 725, 750, 775, 800, 825, 850,
];

/// Mean RH a moisture window must reach for the cell to score at all.
const UPPER_RH_GATE_PCT: f64 = 80.0;
/// Moisture windows anchor at levels at or above (<=) this pressure.
const UPPER_ANCHOR_MAX_MB: u16 = 700;
/// Depth of a moisture window, mb.
const WINDOW_DEPTH_MB: u16 = 200;
/// Depth of one drying step, mb.
const DRYING_STEP_MB: u16 = 100;
/// Scores below this are noise and dropped from the payload.
const MIN_VIRGA_PCT: f64 = 20.0;

/// One cell's column, levels parallel to [`VIRGA_LEVELS_MB`].
struct Column<'a> {
    rh: &'a [f64],
    /// Wind speed in m/s per level, `None` where winds were unavailable.
    wind_ms: &'a [Option<f64>],
}

struct VirgaCell {
    pct: f64,
    cb_wind_ms: f64,
    upper_rh: f64,
}

pub struct VirgaCalculator {
    source: Arc<dyn GridSource>,
    clipper: Arc<RegionClipper>,
}

impl VirgaCalculator {
    pub fn new(source: Arc<dyn GridSource>, clipper: Arc<RegionClipper>) -> Self {
        Self { source, clipper }
    }

    pub async fn compute(
        &self,
        cycle: DateTime<Utc>,
        fxx: u8,
    ) -> Result<VirgaPayload, ProductError> {
        // One batch for the whole column: 4 fields per level, one idx pass.
        let mut selectors = Vec::with_capacity(VIRGA_LEVELS_MB.len() * 4);
        for &lev in &VIRGA_LEVELS_MB {
            selectors.push(FieldSelector::pressure("TMP", lev));
            selectors.push(FieldSelector::pressure("DPT", lev));
            selectors.push(FieldSelector::pressure("UGRD", lev));
            selectors.push(FieldSelector::pressure("VGRD", lev));
        }
        let mut fields = self
            .source
            .materialize_batch(cycle, ModelProduct::Prs, fxx, &selectors)
            .await?;

        let mut idx = None;
        let mut cells = 0usize;
        // rh[level][cell], wind_ms[level] present only when U and V both are.
        let mut rh: Vec<Vec<f64>> = Vec::with_capacity(VIRGA_LEVELS_MB.len());
        let mut wind_ms: Vec<Option<Vec<f64>>> = Vec::with_capacity(VIRGA_LEVELS_MB.len());
        let mut coords = None;

        for (k, &lev) in VIRGA_LEVELS_MB.iter().enumerate() {
            let base = k * 4;
            let t = fields[base]
                .take()
                .ok_or_else(|| ProductError::MissingField {
                    field: format!("TMP {lev} mb"),
                })?;
            let td = fields[base + 1]
                .take()
                .ok_or_else(|| ProductError::MissingField {
                    field: format!("DPT {lev} mb"),
                })?;
            if td.shape() != t.shape() {
                return Err(ProductError::ShapeMismatch {
                    a: t.shape(),
                    b: td.shape(),
                });
            }

            let clip = match idx {
                Some(i) => i,
                None => {
                    let i = self.clipper.index_for(&t.coords)?;
                    coords = Some(i.apply_coords(&t.coords));
                    let (cy, cx) = i.out_shape();
                    cells = cy * cx;
                    idx = Some(i);
                    i
                }
            };

            let t_clip = clip.apply(&t.values);
            let td_clip = clip.apply(&td.values);
            let mut level_rh = Vec::with_capacity(cells);
            for c in 0..cells {
                level_rh.push(relative_humidity(
                    t_clip.values[c] as f64,
                    td_clip.values[c] as f64,
                ));
            }
            rh.push(level_rh);

            // Winds are optional per level; missing winds report 0 kt later.
            let u = fields[base + 2].take();
            let v = fields[base + 3].take();
            wind_ms.push(match (u, v) {
                (Some(u), Some(v)) => {
                    let uc = clip.apply(&u.values);
                    let vc = clip.apply(&v.values);
                    Some(
                        (0..cells)
                            .map(|c| (uc.values[c] as f64).hypot(vc.values[c] as f64))
                            .collect(),
                    )
                }
                _ => None,
            });
        }
        let coords = coords.expect("levels array is non-empty");

        let mut points = Vec::new();
        let mut rh_col = vec![0f64; VIRGA_LEVELS_MB.len()];
        let mut wind_col = vec![None; VIRGA_LEVELS_MB.len()];
        for c in 0..cells {
            for k in 0..VIRGA_LEVELS_MB.len() {
                rh_col[k] = rh[k][c];
                wind_col[k] = wind_ms[k].as_ref().map(|w| w[c]);
            }
            let cell = score_column(&Column {
                rh: &rh_col,
                wind_ms: &wind_col,
            });
            if !retain_cell(&cell) {
                continue;
            }
            points.push(VirgaPoint {
                lat: round_to(coords.lat[c], 4),
                lon: round_to(coords.lon[c], 4),
                virga_pct: round_to(cell.pct, 1),
                cat: virga_category(cell.pct),
                cb_wind_kt: round_to(cell.cb_wind_ms * MS_TO_KT, 1),
                upper_rh: round_to(cell.upper_rh, 1),
            });
        }
        info!(
            cycle = %cycle_iso(cycle),
            fxx,
            points = points.len(),
            "computed virga product"
        );
        Ok(VirgaPayload {
            model: "HRRR".to_string(),
            product: "prs".to_string(),
            levels_mb: "500-850 by 25".to_string(),
            cycle_utc: cycle_iso(cycle),
            valid_utc: valid_iso(cycle, fxx),
            fxx,
            cell_size_deg: CELL_SIZE_DEG,
            point_count: points.len(),
            points,
        })
    }
}

/// Emission filter: scores under 20% are noise and dropped to keep the
/// payload small. NaN scores fail the comparison and drop too.
fn retain_cell(cell: &VirgaCell) -> bool {
    cell.pct >= MIN_VIRGA_PCT
}

/// Score one column. NaN RH anywhere it matters propagates to a NaN or zero
/// score, so bad cells drop out of the payload.
fn score_column(col: &Column<'_>) -> VirgaCell {
    let levels = &VIRGA_LEVELS_MB;

    // Best 200 mb moisture window among anchors at or above 700 mb.
    let upper: Vec<usize> = (0..levels.len())
        .filter(|&k| levels[k] <= UPPER_ANCHOR_MAX_MB)
        .collect();
    let mut best_window_rh = 0f64;
    for &k_top in &upper {
        let lev_top = levels[k_top];
        let window: Vec<usize> = upper
            .iter()
            .copied()
            .filter(|&k| levels[k] >= lev_top && levels[k] <= lev_top + WINDOW_DEPTH_MB)
            .collect();
        if window.len() < 2 {
            continue;
        }
        let mean = window.iter().map(|&k| col.rh[k]).sum::<f64>() / window.len() as f64;
        if mean > best_window_rh {
            best_window_rh = mean;
        }
    }

    // Strongest drying across any 100 mb step, scanned bottom-up.
    let mut max_decrease = 0f64;
    let mut cb_wind_ms = 0f64;
    for k_bot in (0..levels.len()).rev() {
        let lev_bot = levels[k_bot];
        let Some(k_top) = levels.iter().position(|&l| l == lev_bot - DRYING_STEP_MB) else {
            continue;
        };
        let decrease = col.rh[k_bot] - col.rh[k_top];
        if decrease > max_decrease {
            max_decrease = decrease;
            // Wind at the level nearest the step midpoint.
            let lev_mid = lev_bot - DRYING_STEP_MB / 2;
            cb_wind_ms = (0..levels.len())
                .filter(|&k| col.wind_ms[k].is_some())
                .min_by_key(|&k| (levels[k] as i32 - lev_mid as i32).abs())
                .and_then(|k| col.wind_ms[k])
                .unwrap_or(0.0);
        }
    }

    let pct = if best_window_rh >= UPPER_RH_GATE_PCT {
        max_decrease.clamp(0.0, 100.0)
    } else {
        0.0
    };
    VirgaCell {
        pct,
        cb_wind_ms,
        upper_rh: best_window_rh,
    }
}

/// Relative humidity from temperature and dew point in Kelvin, via the
/// Magnus saturation vapor pressure formula, clamped to [0, 100].
pub fn relative_humidity(t_k: f64, td_k: f64) -> f64 {
    let e = magnus_vapor_pressure(td_k);
    let es = magnus_vapor_pressure(t_k);
    (100.0 * e / es).clamp(0.0, 100.0)
}

fn magnus_vapor_pressure(t_k: f64) -> f64 {
    let t_c = t_k - 273.15;
    6.112 * (17.67 * t_c / (t_c + 243.5)).exp()
}

/// Severity category from the virga percentage: 1 marginal through
/// 4 extreme. Zero is reserved for cells dropped before emission.
pub fn virga_category(pct: f64) -> u8 {
    if pct >= 80.0 {
        4
    } else if pct >= 60.0 {
        3
    } else if pct >= 40.0 {
        2
    } else if pct >= 20.0 {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use hazard_common::BoundingBox;
    use test_utils::{assert_approx_eq, colorado_latlon, constant_grid, MockGridSource};

    fn cycle() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 22, 2, 0, 0).unwrap()
    }

    /// Column with uniform RH above 700 mb and a dry step below.
    fn column(upper_rh: f64, rh_850: f64, rh_750: f64) -> Vec<f64> {
        VIRGA_LEVELS_MB
            .iter()
            .map(|&lev| match lev {
                850 => rh_850,
                750 => rh_750,
                l if l <= 700 => upper_rh,
                _ => 50.0,
            })
            .collect()
    }

    fn no_winds() -> Vec<Option<f64>> {
        vec![None; VIRGA_LEVELS_MB.len()]
    }

    #[test]
    fn test_gate_just_below_threshold_scores_zero() {
        // 95 points of drying available, but the moisture gate fails.
        let rh = column(79.999, 99.0, 4.0);
        let winds = no_winds();
        let cell = score_column(&Column {
            rh: &rh,
            wind_ms: &winds,
        });
        assert_eq!(cell.pct, 0.0);
        assert_approx_eq!(cell.upper_rh, 79.999, 1e-9);
    }

    #[test]
    fn test_gate_at_threshold_scores_drying() {
        let rh = column(80.0, 99.0, 4.0);
        let winds = no_winds();
        let cell = score_column(&Column {
            rh: &rh,
            wind_ms: &winds,
        });
        assert_approx_eq!(cell.pct, 95.0, 1e-9);
        // No winds scripted: cloud-base wind falls back to zero.
        assert_eq!(cell.cb_wind_ms, 0.0);
    }

    #[test]
    fn test_cloud_base_wind_tracks_winning_step() {
        // Winning step is 850 -> 750; its midpoint is 800 mb.
        let rh = column(90.0, 99.0, 10.0);
        let mut winds = no_winds();
        for (k, &lev) in VIRGA_LEVELS_MB.iter().enumerate() {
            winds[k] = Some(if lev == 800 { 12.5 } else { 3.0 });
        }
        let cell = score_column(&Column {
            rh: &rh,
            wind_ms: &winds,
        });
        assert_approx_eq!(cell.cb_wind_ms, 12.5, 1e-9);
    }

    #[test]
    fn test_emission_boundary() {
        let cell = |pct| VirgaCell {
            pct,
            cb_wind_ms: 0.0,
            upper_rh: 90.0,
        };
        assert!(!retain_cell(&cell(19.9)));
        assert!(retain_cell(&cell(20.0)));
        assert!(!retain_cell(&cell(f64::NAN)));
    }

    #[test]
    fn test_category_breaks() {
        assert_eq!(virga_category(19.9), 0);
        assert_eq!(virga_category(20.0), 1);
        assert_eq!(virga_category(40.0), 2);
        assert_eq!(virga_category(60.0), 3);
        assert_eq!(virga_category(79.9), 3);
        assert_eq!(virga_category(80.0), 4);
    }

    #[test]
    fn test_saturated_air_is_100_pct() {
        assert_approx_eq!(relative_humidity(273.15, 273.15), 100.0, 1e-9);
        // A 10 K dew point depression at 0 C is roughly 47% RH.
        let rh = relative_humidity(273.15, 263.15);
        assert!(rh > 40.0 && rh < 55.0, "rh = {rh}");
    }

    #[test]
    fn test_rh_is_clamped() {
        // Supersaturation reports as exactly 100.
        assert_eq!(relative_humidity(263.15, 273.15), 100.0);
    }

    fn dry_750_source(td_offset_750: f32) -> MockGridSource {
        // Saturated column except at 750 mb; the dew point depression there
        // controls how sharply the 850 -> 750 step dries upward.
        let mut source = MockGridSource::new(colorado_latlon(2, 2));
        for &lev in &VIRGA_LEVELS_MB {
            let t = 273.15f32;
            let td = if lev == 750 { t - td_offset_750 } else { t };
            source = source
                .with_field(ModelProduct::Prs, 1, "TMP", &format!("{lev} mb"), constant_grid(2, 2, t))
                .with_field(ModelProduct::Prs, 1, "DPT", &format!("{lev} mb"), constant_grid(2, 2, td))
                .with_field(ModelProduct::Prs, 1, "UGRD", &format!("{lev} mb"), constant_grid(2, 2, 5.0))
                .with_field(ModelProduct::Prs, 1, "VGRD", &format!("{lev} mb"), constant_grid(2, 2, 0.0));
        }
        source
    }

    fn calculator(source: MockGridSource) -> VirgaCalculator {
        let clipper = Arc::new(RegionClipper::new(BoundingBox::colorado(), 1));
        VirgaCalculator::new(Arc::new(source), clipper)
    }

    #[tokio::test]
    async fn test_weak_columns_are_filtered_out() {
        // Everything saturated: zero drying anywhere, so no points at all.
        let payload = calculator(dry_750_source(0.0)).compute(cycle(), 1).await.unwrap();
        assert_eq!(payload.point_count, 0);
        assert_eq!(payload.levels_mb, "500-850 by 25");
    }

    #[tokio::test]
    async fn test_strong_drying_emits_points() {
        // A 30 K dew point depression at 750 mb dries that level to under
        // 10% RH, a ~90 point decrease from the saturated 850 mb below it.
        let payload = calculator(dry_750_source(30.0)).compute(cycle(), 1).await.unwrap();
        assert_eq!(payload.point_count, 4);
        for p in &payload.points {
            assert!(p.virga_pct >= 90.0, "pct = {}", p.virga_pct);
            assert_eq!(p.cat, 4);
            assert_approx_eq!(p.cb_wind_kt, 9.7, 0.05); // 5 m/s
            assert_approx_eq!(p.upper_rh, 100.0, 1e-6);
        }
    }

    #[tokio::test]
    async fn test_missing_dewpoint_is_hard_error() {
        let mut source = MockGridSource::new(colorado_latlon(2, 2));
        for &lev in &VIRGA_LEVELS_MB {
            source = source.with_field(
                ModelProduct::Prs,
                1,
                "TMP",
                &format!("{lev} mb"),
                constant_grid(2, 2, 273.15),
            );
        }
        let err = calculator(source).compute(cycle(), 1).await.unwrap_err();
        assert!(matches!(err, ProductError::MissingField { ref field } if field.contains("DPT")));
    }

    #[tokio::test]
    async fn test_missing_winds_fall_back_to_zero() {
        let mut source = MockGridSource::new(colorado_latlon(2, 2));
        for &lev in &VIRGA_LEVELS_MB {
            let td = if lev == 750 { 243.15 } else { 273.15 };
            source = source
                .with_field(ModelProduct::Prs, 1, "TMP", &format!("{lev} mb"), constant_grid(2, 2, 273.15))
                .with_field(ModelProduct::Prs, 1, "DPT", &format!("{lev} mb"), constant_grid(2, 2, td));
        }
        let payload = calculator(source).compute(cycle(), 1).await.unwrap();
        assert!(payload.point_count > 0);
        assert!(payload.points.iter().all(|p| p.cb_wind_kt == 0.0));
    }
}
