//! Grid source abstraction over numerical-weather-model output.
//!
//! The rest of the workspace talks to model output through the [`GridSource`]
//! trait: a cheap `inventory` probe (is this cycle/hour published?) and the
//! expensive `materialize`/`materialize_batch` calls that return decoded 2-D
//! fields with parallel lat/lon coordinate arrays. The concrete
//! implementation ([`HrrrSource`]) reads HRRR GRIB2 files from the NOAA
//! open-data bucket via their `.idx` sidecars and byte-range requests.

pub mod error;
pub mod hrrr;
pub mod idx;
pub mod latlon;
pub mod resolver;
pub mod selector;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use hazard_common::Grid2;

pub use error::SourceError;
pub use hrrr::{HrrrSource, HrrrSourceConfig};
pub use latlon::{LambertGrid, LatLonGrid};
pub use resolver::{resolve_latest_cycle, resolve_latest_cycle_at};
pub use selector::{FieldSelector, StepKind};

/// HRRR product families this system reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModelProduct {
    /// Pressure-level product (`wrfprs`).
    Prs,
    /// Surface product (`wrfsfc`).
    Sfc,
}

impl ModelProduct {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelProduct::Prs => "prs",
            ModelProduct::Sfc => "sfc",
        }
    }
}

impl std::fmt::Display for ModelProduct {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded scalar field with its coordinate arrays.
///
/// Longitudes in `coords` are already normalized to (-180, 180]; the grid
/// source boundary is the single place that normalization happens.
#[derive(Debug, Clone)]
pub struct GridField {
    pub values: Grid2,
    pub coords: Arc<LatLonGrid>,
}

impl GridField {
    pub fn shape(&self) -> (usize, usize) {
        self.values.shape()
    }
}

/// Access to one model's published grid files.
#[async_trait]
pub trait GridSource: Send + Sync {
    /// Cheap metadata-only probe: does upstream have this cycle/product/hour?
    ///
    /// Returns `SourceError::NotPublished` when the answer is a definitive
    /// "not yet", so callers can distinguish that from transport failures.
    async fn inventory(
        &self,
        cycle: DateTime<Utc>,
        product: ModelProduct,
        fxx: u8,
    ) -> Result<(), SourceError>;

    /// Retrieve and decode a single field.
    ///
    /// The selector must match exactly one message; zero matches is
    /// `FieldNotFound` and several is `AmbiguousField`.
    async fn materialize(
        &self,
        cycle: DateTime<Utc>,
        product: ModelProduct,
        fxx: u8,
        selector: &FieldSelector,
    ) -> Result<GridField, SourceError>;

    /// Retrieve many fields from one file in a single index pass.
    ///
    /// Selectors that match nothing yield `None` in the corresponding slot;
    /// the caller decides which fields are required. An ambiguous selector
    /// is still a hard error.
    async fn materialize_batch(
        &self,
        cycle: DateTime<Utc>,
        product: ModelProduct,
        fxx: u8,
        selectors: &[FieldSelector],
    ) -> Result<Vec<Option<GridField>>, SourceError>;
}
