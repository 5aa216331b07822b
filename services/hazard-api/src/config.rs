//! Service configuration: CLI flags plus an optional YAML file.

use std::path::Path;

use anyhow::Context;
use clap::Parser;
use serde::Deserialize;

use hazard_common::BoundingBox;

#[derive(Parser, Debug)]
#[command(name = "hazard-api")]
#[command(about = "HRRR hazard products API server")]
pub struct Args {
    /// Listen address
    #[arg(short, long, env = "HAZARD_LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: String,

    /// Log level
    #[arg(long, env = "HAZARD_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Optional YAML config file; fields it names override the defaults
    #[arg(long, env = "HAZARD_CONFIG")]
    pub config: Option<std::path::PathBuf>,

    /// Disable the background prefetch loop
    #[arg(long)]
    pub no_prefetch: bool,
}

/// Pipeline tuning knobs. Every field has a default, so a YAML file only
/// needs the values it wants to change.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HazardConfig {
    /// Region the products cover.
    pub bbox: BoundingBox,
    /// Downsampling stride over the native 3 km grid.
    pub stride: usize,
    /// Barrier orientation for the Froude calculation, degrees.
    pub barrier_angle_deg: f64,
    /// HRRR bucket base URL.
    pub base_url: String,
    /// How many hours back to search for the latest cycle.
    pub max_lookback_hours: u32,
    /// Highest forecast hour served and prefetched.
    pub max_fxx: u8,
    pub product_ttl_secs: u64,
    pub prefetch_ttl_secs: u64,
    pub availability_ttl_secs: u64,
    pub metar_ttl_secs: u64,
    pub prefetch_interval_secs: u64,
    pub prefetch_startup_delay_secs: u64,
    pub request_timeout_secs: u64,
    pub probe_timeout_secs: u64,
    /// Concurrent availability probes per sweep.
    pub probe_concurrency: usize,
}

impl Default for HazardConfig {
    fn default() -> Self {
        Self {
            bbox: BoundingBox::colorado(),
            stride: 2,
            barrier_angle_deg: 270.0,
            base_url: "https://noaa-hrrr-bdp-pds.s3.amazonaws.com".to_string(),
            max_lookback_hours: 6,
            max_fxx: 12,
            product_ttl_secs: 600,
            prefetch_ttl_secs: 3600,
            availability_ttl_secs: 300,
            metar_ttl_secs: 120,
            prefetch_interval_secs: 600,
            prefetch_startup_delay_secs: 180,
            request_timeout_secs: 30,
            probe_timeout_secs: 10,
            probe_concurrency: 8,
        }
    }
}

impl HazardConfig {
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            None => Ok(Self::default()),
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                serde_yaml::from_str(&raw)
                    .with_context(|| format!("parsing config file {}", path.display()))
            }
        }
    }
}
