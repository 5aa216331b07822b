//! Hazard product calculators for HRRR grids.
//!
//! Three products are derived from the model output: surface wind gusts,
//! a mountain-wave Froude number, and a virga-potential index. Each
//! calculator pulls the fields it needs through a [`grid_source::GridSource`],
//! clips them to the configured region, and emits a JSON-serializable
//! payload of per-cell points.

pub mod clip;
pub mod error;
pub mod froude;
pub mod gust;
pub mod payload;
pub mod virga;

pub use clip::{ClipIndex, RegionClipper};
pub use error::ProductError;
pub use froude::FroudeCalculator;
pub use gust::GustExtractor;
pub use payload::{FroudePayload, FroudePoint, GustPayload, GustPoint, VirgaPayload, VirgaPoint};
pub use virga::VirgaCalculator;
