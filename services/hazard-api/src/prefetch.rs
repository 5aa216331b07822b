//! Background prefetch loop.
//!
//! Periodically sweeps availability and drives each product calculator over
//! every published hour of the newest cycle, so user requests land on a warm
//! cache. Products run sequentially on purpose: the loop exists to fill
//! caches ahead of demand, not to race user requests for bandwidth.

use std::sync::Arc;
use std::time::Duration;

use metrics::counter;
use tokio::time::sleep;
use tracing::{info, warn};

use hazard_cache::{CacheKey, PrefetchStatus, ProductKind};
use hazard_products::ProductError;

use crate::state::AppState;

pub async fn run_prefetch_loop(state: Arc<AppState>) {
    let delay = Duration::from_secs(state.config.prefetch_startup_delay_secs);
    let interval = Duration::from_secs(state.config.prefetch_interval_secs);
    info!(delay_secs = delay.as_secs(), "prefetch loop scheduled");
    sleep(delay).await;
    loop {
        run_prefetch_pass(&state).await;
        sleep(interval).await;
    }
}

/// One sweep over the newest cycle's published hours.
pub async fn run_prefetch_pass(state: &AppState) {
    let status = state.availability.status().await;
    let Some(top) = status.cycles.first() else {
        return;
    };

    if state.prefetch.current_cycle().await.as_deref() != Some(top.cycle_utc.as_str()) {
        state.prefetch.rollover(&top.cycle_utc).await;
    }

    for &fxx in &top.available_hours {
        for product in ProductKind::ALL {
            let current = state.prefetch.get(product, fxx).await;
            if matches!(current, PrefetchStatus::Ready | PrefetchStatus::Loading) {
                continue;
            }
            state.prefetch.set(product, fxx, PrefetchStatus::Loading).await;
            let key = CacheKey {
                cycle: top.cycle,
                fxx,
            };
            let result = warm_product(state, product, key).await;
            let status = match result {
                Ok(()) => PrefetchStatus::Ready,
                Err(ref err) if err.is_not_published() => PrefetchStatus::Unavailable,
                Err(ref err) => {
                    warn!(
                        product = product.as_str(),
                        fxx,
                        error = %err,
                        "prefetch failed"
                    );
                    PrefetchStatus::Error
                }
            };
            counter!(
                "hazard_prefetch_total",
                "product" => product.as_str(),
                "outcome" => status_label(status)
            )
            .increment(1);
            state.prefetch.set(product, fxx, status).await;
        }
    }
    info!(cycle = %top.cycle_utc, hours = top.available_hours.len(), "prefetch pass complete");
}

async fn warm_product(
    state: &AppState,
    product: ProductKind,
    key: CacheKey,
) -> Result<(), ProductError> {
    let ttl = state.prefetch_ttl();
    match product {
        ProductKind::Winds => state
            .gust_cache
            .get_or_compute(key, ttl, || state.gust.compute(key.cycle, key.fxx))
            .await
            .map(|_| ()),
        ProductKind::Froude => state
            .froude_cache
            .get_or_compute(key, ttl, || state.froude.compute(key.cycle, key.fxx))
            .await
            .map(|_| ()),
        ProductKind::Virga => state
            .virga_cache
            .get_or_compute(key, ttl, || state.virga.compute(key.cycle, key.fxx))
            .await
            .map(|_| ()),
    }
}

fn status_label(status: PrefetchStatus) -> &'static str {
    match status {
        PrefetchStatus::Ready => "ready",
        PrefetchStatus::Unavailable => "unavailable",
        PrefetchStatus::Error => "error",
        PrefetchStatus::Pending | PrefetchStatus::Loading => "in-flight",
    }
}
