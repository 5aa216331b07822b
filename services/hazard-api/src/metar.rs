//! METAR passthrough proxy.
//!
//! Thin cached proxy in front of the aviationweather.gov data API, so the
//! frontend can poll current observations without hammering the upstream.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

const METAR_URL: &str = "https://aviationweather.gov/cgi-bin/data/metar.php";

pub struct MetarProxy {
    client: reqwest::Client,
    ttl: Duration,
    cache: RwLock<HashMap<String, (Instant, serde_json::Value)>>,
}

impl MetarProxy {
    pub fn new(ttl: Duration, timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            ttl,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Current observations for a comma-separated station list.
    pub async fn fetch(&self, ids: &str) -> anyhow::Result<serde_json::Value> {
        if let Some((stored, payload)) = self.cache.read().await.get(ids) {
            if stored.elapsed() <= self.ttl {
                debug!(ids, "metar cache hit");
                return Ok(payload.clone());
            }
        }
        let raw: serde_json::Value = self
            .client
            .get(METAR_URL)
            .query(&[("ids", ids), ("format", "json")])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let payload = serde_json::json!({
            "stations": ids.split(',').collect::<Vec<_>>(),
            "raw": raw,
        });
        self.cache
            .write()
            .await
            .insert(ids.to_string(), (Instant::now(), payload.clone()));
        Ok(payload)
    }
}
