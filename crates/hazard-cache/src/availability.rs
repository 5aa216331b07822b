//! Per-cycle forecast-hour availability probing.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, warn};

use grid_source::{resolve_latest_cycle, GridSource, ModelProduct, SourceError};
use hazard_common::cycle_iso;

/// Availability of one model cycle's forecast hours.
#[derive(Debug, Clone, Serialize)]
pub struct CycleAvailability {
    #[serde(skip_serializing)]
    pub cycle: DateTime<Utc>,
    pub cycle_utc: String,
    pub available_hours: Vec<u8>,
    pub total_hours: u8,
    pub pct_complete: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityStatus {
    pub cycles: Vec<CycleAvailability>,
    pub checked_utc: String,
}

/// Probes upstream for which (cycle, fxx) pairs exist, with a TTL cache so
/// the request path and the prefetcher share one probe sweep.
///
/// Probes use the pressure-level product: two of the three hazard products
/// need it, and in practice both HRRR files for an hour publish together.
pub struct AvailabilityTracker {
    source: Arc<dyn GridSource>,
    max_fxx: u8,
    probe_concurrency: usize,
    max_lookback_hours: u32,
    ttl: Duration,
    cached: RwLock<Option<(Instant, AvailabilityStatus)>>,
}

impl AvailabilityTracker {
    pub fn new(
        source: Arc<dyn GridSource>,
        max_fxx: u8,
        probe_concurrency: usize,
        max_lookback_hours: u32,
        ttl: Duration,
    ) -> Self {
        Self {
            source,
            max_fxx,
            probe_concurrency,
            max_lookback_hours,
            ttl,
            cached: RwLock::new(None),
        }
    }

    /// Current availability, refreshed when the cached sweep is stale.
    pub async fn status(&self) -> AvailabilityStatus {
        if let Some((checked, status)) = self.cached.read().await.as_ref() {
            if checked.elapsed() <= self.ttl {
                return status.clone();
            }
        }
        let status = self.refresh().await;
        *self.cached.write().await = Some((Instant::now(), status.clone()));
        status
    }

    /// The most recent cycle known to upstream.
    pub async fn latest_cycle(&self) -> DateTime<Utc> {
        // cycles is never empty: refresh always pushes both candidates.
        self.status().await.cycles[0].cycle
    }

    async fn refresh(&self) -> AvailabilityStatus {
        let latest = resolve_latest_cycle(self.source.as_ref(), self.max_lookback_hours).await;
        let candidates = [latest, latest - chrono::Duration::hours(1)];

        let mut cycles = Vec::with_capacity(candidates.len());
        for cycle in candidates {
            let available_hours = self.probe_cycle(cycle).await;
            let pct_complete =
                (100.0 * available_hours.len() as f64 / self.max_fxx as f64).round() as u8;
            cycles.push(CycleAvailability {
                cycle,
                cycle_utc: cycle_iso(cycle),
                available_hours,
                total_hours: self.max_fxx,
                pct_complete,
            });
        }
        AvailabilityStatus {
            cycles,
            checked_utc: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    async fn probe_cycle(&self, cycle: DateTime<Utc>) -> Vec<u8> {
        let source = self.source.clone();
        let mut hours: Vec<u8> = stream::iter(1..=self.max_fxx)
            .map(|fxx| {
                let source = source.clone();
                async move {
                    (
                        fxx,
                        source.inventory(cycle, ModelProduct::Prs, fxx).await,
                    )
                }
            })
            .buffer_unordered(self.probe_concurrency)
            .filter_map(|(fxx, result)| async move {
                match result {
                    Ok(()) => Some(fxx),
                    Err(SourceError::NotPublished { .. }) => {
                        debug!(cycle = %cycle_iso(cycle), fxx, "hour not published");
                        None
                    }
                    Err(e) => {
                        // Transient probe failures count as unavailable for
                        // this sweep; the next sweep retries.
                        warn!(cycle = %cycle_iso(cycle), fxx, error = %e, "probe failed");
                        None
                    }
                }
            })
            .collect()
            .await;
        hours.sort_unstable();
        hours
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{colorado_latlon, MockFailure, MockGridSource};

    fn tracker(source: MockGridSource) -> AvailabilityTracker {
        AvailabilityTracker::new(
            Arc::new(source),
            12,
            4,
            6,
            Duration::from_secs(300),
        )
    }

    #[tokio::test]
    async fn test_partial_cycle_reports_hours_and_pct() {
        let source = MockGridSource::new(colorado_latlon(2, 2))
            .with_available(ModelProduct::Prs, 0)
            .with_available(ModelProduct::Prs, 1)
            .with_available(ModelProduct::Prs, 2)
            .with_available(ModelProduct::Prs, 3);
        let status = tracker(source).status().await;
        assert_eq!(status.cycles.len(), 2);
        let top = &status.cycles[0];
        assert_eq!(top.available_hours, vec![1, 2, 3]);
        assert_eq!(top.total_hours, 12);
        assert_eq!(top.pct_complete, 25);
    }

    #[tokio::test]
    async fn test_transient_probe_failures_count_as_unavailable() {
        let source = MockGridSource::new(colorado_latlon(2, 2))
            .with_available(ModelProduct::Prs, 0)
            .with_available(ModelProduct::Prs, 1)
            .with_available(ModelProduct::Prs, 2)
            .with_failure(ModelProduct::Prs, 2, MockFailure::Download);
        let status = tracker(source).status().await;
        assert_eq!(status.cycles[0].available_hours, vec![1]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_is_cached_within_ttl() {
        let source = MockGridSource::new(colorado_latlon(2, 2))
            .with_available(ModelProduct::Prs, 0)
            .with_available(ModelProduct::Prs, 1);
        let tracker = tracker(source);
        let first = tracker.status().await;
        tokio::time::advance(Duration::from_secs(60)).await;
        let second = tracker.status().await;
        assert_eq!(first.checked_utc, second.checked_utc);
    }

    #[tokio::test]
    async fn test_serialized_surface_shape() {
        let source = MockGridSource::new(colorado_latlon(2, 2))
            .with_available(ModelProduct::Prs, 0)
            .with_available(ModelProduct::Prs, 1);
        let status = tracker(source).status().await;
        let v = serde_json::to_value(&status).unwrap();
        let cycle = &v["cycles"][0];
        assert!(cycle.get("cycle_utc").is_some());
        assert!(cycle.get("available_hours").is_some());
        assert!(cycle.get("cycle").is_none(), "internal field leaked");
        assert!(v.get("checked_utc").is_some());
    }
}
