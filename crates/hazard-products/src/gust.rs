//! Surface wind gust extraction.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::info;

use grid_source::{FieldSelector, GridSource, ModelProduct};
use hazard_common::{cycle_iso, round_to, valid_iso, MS_TO_KT};

use crate::clip::RegionClipper;
use crate::error::ProductError;
use crate::payload::{GustPayload, GustPoint, CELL_SIZE_DEG};

/// Plausible instantaneous gust range in m/s. Values outside it mean the
/// selector matched the wrong GRIB message.
const GUST_MIN_MS: f64 = 0.0;
const GUST_MAX_MS: f64 = 150.0;

pub struct GustExtractor {
    source: Arc<dyn GridSource>,
    clipper: Arc<RegionClipper>,
}

impl GustExtractor {
    pub fn new(source: Arc<dyn GridSource>, clipper: Arc<RegionClipper>) -> Self {
        Self { source, clipper }
    }

    pub async fn compute(
        &self,
        cycle: DateTime<Utc>,
        fxx: u8,
    ) -> Result<GustPayload, ProductError> {
        let selector = FieldSelector::height_above_ground("GUST", 10);
        let field = self
            .source
            .materialize(cycle, ModelProduct::Sfc, fxx, &selector)
            .await?;

        check_plausible(&field.values.values)?;

        let idx = self.clipper.index_for(&field.coords)?;
        let gust = idx.apply(&field.values);
        let coords = idx.apply_coords(&field.coords);

        let mut points = Vec::with_capacity(gust.values.len());
        for j in 0..gust.ny {
            for i in 0..gust.nx {
                let g = gust.values[j * gust.nx + i] as f64;
                if g.is_nan() {
                    continue;
                }
                points.push(GustPoint {
                    lat: round_to(coords.lat_at(j, i), 4),
                    lon: round_to(coords.lon_at(j, i), 4),
                    gust_kt: round_to(g * MS_TO_KT, 1),
                });
            }
        }
        info!(
            cycle = %cycle_iso(cycle),
            fxx,
            points = points.len(),
            "computed gust product"
        );
        Ok(GustPayload {
            model: "HRRR".to_string(),
            cycle_utc: cycle_iso(cycle),
            valid_utc: valid_iso(cycle, fxx),
            fxx,
            cell_size_deg: CELL_SIZE_DEG,
            point_count: points.len(),
            points,
        })
    }
}

fn check_plausible(values: &[f32]) -> Result<(), ProductError> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values {
        let v = v as f64;
        if v.is_nan() {
            continue;
        }
        min = min.min(v);
        max = max.max(v);
    }
    if min < GUST_MIN_MS || max > GUST_MAX_MS {
        return Err(ProductError::WrongFieldRange {
            field: "GUST".to_string(),
            min,
            max,
        });
    }
    Ok(())
}

/// Gust severity category in knots: 0 calm, 1 breezy, 2 windy, 3 damaging.
pub fn gust_category(gust_kt: f64) -> u8 {
    if gust_kt >= 50.0 {
        3
    } else if gust_kt >= 35.0 {
        2
    } else if gust_kt >= 20.0 {
        1
    } else {
        0
    }
}
