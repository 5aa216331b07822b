//! Latest-cycle discovery.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use hazard_common::{cycle_iso, truncate_to_hour};

use crate::{GridSource, ModelProduct};

/// Walk backward from the current hour looking for the most recent cycle
/// with published data, probing the pressure-level inventory for each
/// candidate.
///
/// Probe failures of any kind mean "try older"; this function never errors.
/// When nothing within the lookback window probes available it returns the
/// current hour minus two as a best guess; callers must expect that
/// fallback to 404 downstream.
pub async fn resolve_latest_cycle(source: &dyn GridSource, max_lookback_hours: u32) -> DateTime<Utc> {
    resolve_latest_cycle_at(source, truncate_to_hour(Utc::now()), max_lookback_hours).await
}

/// As [`resolve_latest_cycle`], walking back from an explicit base hour.
pub async fn resolve_latest_cycle_at(
    source: &dyn GridSource,
    base: DateTime<Utc>,
    max_lookback_hours: u32,
) -> DateTime<Utc> {
    for h in 0..=max_lookback_hours {
        let candidate = base - Duration::hours(h as i64);
        match source.inventory(candidate, ModelProduct::Prs, 0).await {
            Ok(()) => {
                info!(cycle = %cycle_iso(candidate), lookback = h, "resolved latest cycle");
                return candidate;
            }
            Err(e) => {
                debug!(cycle = %cycle_iso(candidate), error = %e, "cycle probe failed, trying older");
            }
        }
    }
    let fallback = base - Duration::hours(2);
    info!(cycle = %cycle_iso(fallback), "no cycle probed available, using fallback");
    fallback
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SourceError;
    use crate::selector::FieldSelector;
    use crate::GridField;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;

    /// Probe-only source: a scripted set of available cycles.
    struct ProbeSource {
        available: HashSet<DateTime<Utc>>,
        probes: Mutex<Vec<DateTime<Utc>>>,
    }

    #[async_trait]
    impl GridSource for ProbeSource {
        async fn inventory(
            &self,
            cycle: DateTime<Utc>,
            _product: ModelProduct,
            _fxx: u8,
        ) -> Result<(), SourceError> {
            self.probes.lock().unwrap().push(cycle);
            if self.available.contains(&cycle) {
                Ok(())
            } else {
                Err(SourceError::NotPublished {
                    key: cycle_iso(cycle),
                })
            }
        }

        async fn materialize(
            &self,
            _cycle: DateTime<Utc>,
            _product: ModelProduct,
            _fxx: u8,
            _selector: &FieldSelector,
        ) -> Result<GridField, SourceError> {
            unimplemented!("probe-only source")
        }

        async fn materialize_batch(
            &self,
            _cycle: DateTime<Utc>,
            _product: ModelProduct,
            _fxx: u8,
            _selectors: &[FieldSelector],
        ) -> Result<Vec<Option<GridField>>, SourceError> {
            unimplemented!("probe-only source")
        }
    }

    #[tokio::test]
    async fn test_returns_first_available_walking_backward() {
        let now_hour = truncate_to_hour(Utc::now());
        let source = ProbeSource {
            // Newest two hours not yet published
            available: [now_hour - Duration::hours(2), now_hour - Duration::hours(3)]
                .into_iter()
                .collect(),
            probes: Mutex::new(Vec::new()),
        };
        let resolved = resolve_latest_cycle_at(&source, now_hour, 6).await;
        assert_eq!(resolved, now_hour - Duration::hours(2));
        // Walked newest-first
        let probes = source.probes.lock().unwrap();
        assert_eq!(probes.as_slice(), &[now_hour, now_hour - Duration::hours(1), resolved]);
    }

    #[tokio::test]
    async fn test_fallback_when_nothing_available() {
        let now_hour = truncate_to_hour(Utc::now());
        let source = ProbeSource {
            available: HashSet::new(),
            probes: Mutex::new(Vec::new()),
        };
        let resolved = resolve_latest_cycle_at(&source, now_hour, 3).await;
        assert_eq!(resolved, now_hour - Duration::hours(2));
        // All candidates probed before falling back
        assert_eq!(source.probes.lock().unwrap().len(), 4);
    }
}
