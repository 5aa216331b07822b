use grid_source::SourceError;
use hazard_common::BoundingBox;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProductError {
    #[error(transparent)]
    Source(#[from] SourceError),

    /// The bounding box selected zero grid cells. Usually a longitude
    /// convention mismatch rather than a genuinely empty region.
    #[error("region {bbox:?} matched no cells on a {ny}x{nx} grid")]
    RegionEmpty { ny: usize, nx: usize, bbox: BoundingBox },

    /// A decoded field fell outside its physically plausible range,
    /// meaning the wrong GRIB message was selected.
    #[error("{field} outside plausible range: min {min:.1}, max {max:.1}")]
    WrongFieldRange { field: String, min: f64, max: f64 },

    #[error("required field missing from batch: {field}")]
    MissingField { field: String },

    /// Fields that must be co-registered came back with different shapes.
    #[error("grid shape mismatch: {a:?} vs {b:?}")]
    ShapeMismatch { a: (usize, usize), b: (usize, usize) },
}

impl ProductError {
    /// True when the underlying cause is a cycle/hour that the upstream
    /// archive has not published yet.
    pub fn is_not_published(&self) -> bool {
        matches!(self, ProductError::Source(e) if e.is_not_published())
    }

    /// True for transient upstream transport failures.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            ProductError::Source(SourceError::Download { .. })
                | ProductError::Source(SourceError::Timeout { .. })
        )
    }
}
