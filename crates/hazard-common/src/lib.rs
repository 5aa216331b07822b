//! Common types and utilities shared across the hazard-grids workspace.

pub mod bbox;
pub mod grid;
pub mod time;
pub mod units;

pub use bbox::{normalize_lon, BoundingBox};
pub use grid::Grid2;
pub use time::{cycle_iso, truncate_to_hour, valid_iso};
pub use units::{round_to, MS_TO_KT};
