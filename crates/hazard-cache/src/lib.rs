//! Caching and background-readiness state for the hazard products.
//!
//! Three pieces: a per-product TTL [`ResultCache`] that coalesces concurrent
//! computations of the same key, an [`AvailabilityTracker`] that probes which
//! forecast hours upstream has published, and the [`PrefetchRegistry`] that
//! records per-(product, hour) readiness for the background prefetcher.

pub mod availability;
pub mod prefetch;
pub mod result_cache;

pub use availability::{AvailabilityStatus, AvailabilityTracker, CycleAvailability};
pub use prefetch::{PrefetchRegistry, PrefetchStatus, PrefetchStatusReport, ProductKind};
pub use result_cache::{CacheKey, ResultCache};
