//! Shared application state.

use std::sync::Arc;
use std::time::Duration;

use grid_source::{GridSource, HrrrSource, HrrrSourceConfig};
use hazard_cache::{AvailabilityTracker, PrefetchRegistry, ResultCache};
use hazard_products::{
    FroudeCalculator, FroudePayload, GustExtractor, GustPayload, RegionClipper, VirgaCalculator,
    VirgaPayload,
};

use crate::config::HazardConfig;
use crate::metar::MetarProxy;

pub struct AppState {
    pub config: HazardConfig,
    pub gust: GustExtractor,
    pub froude: FroudeCalculator,
    pub virga: VirgaCalculator,
    pub gust_cache: ResultCache<GustPayload>,
    pub froude_cache: ResultCache<FroudePayload>,
    pub virga_cache: ResultCache<VirgaPayload>,
    pub availability: AvailabilityTracker,
    pub prefetch: Arc<PrefetchRegistry>,
    pub metar: MetarProxy,
}

impl AppState {
    pub fn new(config: HazardConfig) -> anyhow::Result<Self> {
        let source = Arc::new(HrrrSource::new(HrrrSourceConfig {
            base_url: config.base_url.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            probe_timeout: Duration::from_secs(config.probe_timeout_secs),
            ..HrrrSourceConfig::default()
        })?);
        Self::with_source(config, source)
    }

    /// Build the state over any grid source; tests inject a scripted one.
    pub fn with_source(
        config: HazardConfig,
        source: Arc<dyn GridSource>,
    ) -> anyhow::Result<Self> {
        let clipper = Arc::new(RegionClipper::new(config.bbox, config.stride));
        Ok(Self {
            gust: GustExtractor::new(source.clone(), clipper.clone()),
            froude: FroudeCalculator::new(
                source.clone(),
                clipper.clone(),
                config.barrier_angle_deg,
            ),
            virga: VirgaCalculator::new(source.clone(), clipper),
            gust_cache: ResultCache::new("winds"),
            froude_cache: ResultCache::new("froude"),
            virga_cache: ResultCache::new("virga"),
            availability: AvailabilityTracker::new(
                source,
                config.max_fxx,
                config.probe_concurrency,
                config.max_lookback_hours,
                Duration::from_secs(config.availability_ttl_secs),
            ),
            prefetch: Arc::new(PrefetchRegistry::new(config.max_fxx)),
            metar: MetarProxy::new(
                Duration::from_secs(config.metar_ttl_secs),
                Duration::from_secs(20),
            )?,
            config,
        })
    }

    pub fn product_ttl(&self) -> Duration {
        Duration::from_secs(self.config.product_ttl_secs)
    }

    pub fn prefetch_ttl(&self) -> Duration {
        Duration::from_secs(self.config.prefetch_ttl_secs)
    }
}
