//! Error types for grid source access.

use thiserror::Error;

/// Errors from probing or materializing model output.
#[derive(Error, Debug)]
pub enum SourceError {
    /// Upstream has no data for this cycle/product/hour yet. This is the
    /// structural "try an earlier hour" signal; it is never conflated with
    /// transport failures.
    #[error("not yet published upstream: {key}")]
    NotPublished { key: String },

    /// Selector matched no messages in the file.
    #[error("field not found: {selector}")]
    FieldNotFound { selector: String },

    /// Selector matched more than one message. Selection must discriminate
    /// down to exactly one field; silently picking one would risk reading a
    /// same-named field with different units.
    #[error("ambiguous selector {selector}: matched {count} messages")]
    AmbiguousField { selector: String, count: usize },

    /// Transport-level failure (connect error, bad status, truncated body).
    #[error("download failed for {key}: {detail}")]
    Download { key: String, detail: String },

    /// The request exceeded its deadline.
    #[error("timed out fetching {key}")]
    Timeout { key: String },

    /// The retrieved bytes could not be decoded as the expected grid.
    #[error("failed to decode {key}: {detail}")]
    Decode { key: String, detail: String },
}

impl SourceError {
    /// Map a reqwest error, preserving the timeout distinction.
    pub fn from_reqwest(key: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                key: key.to_string(),
            }
        } else {
            Self::Download {
                key: key.to_string(),
                detail: err.to_string(),
            }
        }
    }

    pub fn decode(key: &str, detail: impl Into<String>) -> Self {
        Self::Decode {
            key: key.to_string(),
            detail: detail.into(),
        }
    }

    pub fn is_not_published(&self) -> bool {
        matches!(self, Self::NotPublished { .. })
    }
}
