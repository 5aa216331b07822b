//! Per-(product, forecast-hour) prefetch state.
//!
//! The background prefetcher drives each product ahead of demand and records
//! where it got to. Statuses persist across passes within one cycle's
//! lifetime and reset wholesale when the cycle rolls over, so a half-warmed
//! cycle never shows a stale mix of old and new state.

use std::collections::BTreeMap;

use serde::Serialize;
use tokio::sync::RwLock;
use tracing::info;

/// Readiness of one (product, fxx) slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PrefetchStatus {
    Pending,
    Loading,
    Ready,
    /// Upstream has not published this hour yet.
    Unavailable,
    Error,
}

/// The three hazard products the prefetcher warms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductKind {
    Winds,
    Froude,
    Virga,
}

impl ProductKind {
    pub const ALL: [ProductKind; 3] = [ProductKind::Winds, ProductKind::Froude, ProductKind::Virga];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductKind::Winds => "winds",
            ProductKind::Froude => "froude",
            ProductKind::Virga => "virga",
        }
    }
}

/// Serialized view of the registry.
#[derive(Debug, Clone, Serialize)]
pub struct PrefetchStatusReport {
    pub cycle_utc: Option<String>,
    pub products: BTreeMap<String, BTreeMap<u8, PrefetchStatus>>,
}

struct Inner {
    cycle_utc: Option<String>,
    statuses: BTreeMap<ProductKind, BTreeMap<u8, PrefetchStatus>>,
}

/// Status board shared by the prefetch loop and the status endpoint.
///
/// One lock over the whole board: cycle rollover resets cycle id and every
/// status in a single write so readers never observe a torn mix.
pub struct PrefetchRegistry {
    max_fxx: u8,
    inner: RwLock<Inner>,
}

impl PrefetchRegistry {
    pub fn new(max_fxx: u8) -> Self {
        Self {
            max_fxx,
            inner: RwLock::new(Inner {
                cycle_utc: None,
                statuses: Self::pending_board(max_fxx),
            }),
        }
    }

    fn pending_board(max_fxx: u8) -> BTreeMap<ProductKind, BTreeMap<u8, PrefetchStatus>> {
        ProductKind::ALL
            .iter()
            .map(|&p| {
                (
                    p,
                    (1..=max_fxx)
                        .map(|fxx| (fxx, PrefetchStatus::Pending))
                        .collect(),
                )
            })
            .collect()
    }

    pub async fn current_cycle(&self) -> Option<String> {
        self.inner.read().await.cycle_utc.clone()
    }

    /// Switch the board to a new cycle, resetting every slot to pending.
    pub async fn rollover(&self, cycle_utc: &str) {
        let mut inner = self.inner.write().await;
        info!(
            from = inner.cycle_utc.as_deref().unwrap_or("-"),
            to = cycle_utc,
            "prefetch cycle rollover"
        );
        inner.cycle_utc = Some(cycle_utc.to_string());
        inner.statuses = Self::pending_board(self.max_fxx);
    }

    pub async fn get(&self, product: ProductKind, fxx: u8) -> PrefetchStatus {
        self.inner
            .read()
            .await
            .statuses
            .get(&product)
            .and_then(|m| m.get(&fxx))
            .copied()
            .unwrap_or(PrefetchStatus::Pending)
    }

    pub async fn set(&self, product: ProductKind, fxx: u8, status: PrefetchStatus) {
        let mut inner = self.inner.write().await;
        if let Some(m) = inner.statuses.get_mut(&product) {
            m.insert(fxx, status);
        }
    }

    pub async fn snapshot(&self) -> PrefetchStatusReport {
        let inner = self.inner.read().await;
        PrefetchStatusReport {
            cycle_utc: inner.cycle_utc.clone(),
            products: inner
                .statuses
                .iter()
                .map(|(p, m)| (p.as_str().to_string(), m.clone()))
                .collect(),
        }
    }
}
