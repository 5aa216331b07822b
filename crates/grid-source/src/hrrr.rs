//! HRRR grid source backed by the NOAA open-data S3 bucket.
//!
//! Object layout on `noaa-hrrr-bdp-pds`:
//!
//! ```text
//! hrrr.{YYYYMMDD}/conus/hrrr.t{HH}z.wrf{prs|sfc}f{FF}.grib2
//! hrrr.{YYYYMMDD}/conus/hrrr.t{HH}z.wrf{prs|sfc}f{FF}.grib2.idx
//! ```
//!
//! `inventory` is a HEAD on the `.idx` sidecar; `materialize` parses the
//! sidecar, selects a message, and fetches just its bytes with a ranged GET.
//! The bucket answers 403 (not 404) for missing keys, so both map to
//! `NotPublished`.

use std::collections::HashMap;
use std::io::Cursor;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Timelike, Utc};
use lru::LruCache;
use reqwest::{Client, StatusCode};
use tokio::sync::Mutex;
use tracing::{debug, instrument};

use hazard_common::Grid2;

use crate::error::SourceError;
use crate::idx::{coalesce_ranges, matching_entries, parse_idx, ByteRange, IdxEntry};
use crate::latlon::{LambertGrid, LatLonGrid};
use crate::selector::FieldSelector;
use crate::{GridField, GridSource, ModelProduct};

/// Configuration for the HRRR source.
#[derive(Debug, Clone)]
pub struct HrrrSourceConfig {
    pub base_url: String,
    /// Total timeout for materialize GETs.
    pub request_timeout: Duration,
    /// Timeout for inventory HEAD probes.
    pub probe_timeout: Duration,
    /// Number of parsed `.idx` sidecars to keep.
    pub idx_cache_size: usize,
}

impl Default for HrrrSourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://noaa-hrrr-bdp-pds.s3.amazonaws.com".to_string(),
            request_timeout: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(10),
            idx_cache_size: 32,
        }
    }
}

/// Grid source for HRRR CONUS files on the open-data bucket.
pub struct HrrrSource {
    client: Client,
    probe_client: Client,
    base_url: String,
    grid: LambertGrid,
    /// Shared coordinate arrays; every field from this source points here.
    coords: Arc<LatLonGrid>,
    idx_cache: Mutex<LruCache<String, Arc<Vec<IdxEntry>>>>,
}

impl HrrrSource {
    pub fn new(config: HrrrSourceConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        let probe_client = Client::builder().timeout(config.probe_timeout).build()?;

        let grid = LambertGrid::hrrr_conus();
        let coords = Arc::new(grid.latlon_arrays());

        let cache_size =
            NonZeroUsize::new(config.idx_cache_size.max(1)).expect("idx cache size > 0");

        Ok(Self {
            client,
            probe_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            grid,
            coords,
            idx_cache: Mutex::new(LruCache::new(cache_size)),
        })
    }

    fn object_key(&self, cycle: DateTime<Utc>, product: ModelProduct, fxx: u8) -> String {
        format!(
            "hrrr.{}/conus/hrrr.t{:02}z.wrf{}f{:02}.grib2",
            cycle.format("%Y%m%d"),
            cycle.hour(),
            product.as_str(),
            fxx
        )
    }

    /// Fetch and parse the `.idx` sidecar, consulting the LRU cache first.
    async fn fetch_idx(
        &self,
        cycle: DateTime<Utc>,
        product: ModelProduct,
        fxx: u8,
    ) -> Result<(String, Arc<Vec<IdxEntry>>), SourceError> {
        let key = self.object_key(cycle, product, fxx);
        let idx_key = format!("{}.idx", key);

        {
            let mut cache = self.idx_cache.lock().await;
            if let Some(hit) = cache.get(&idx_key) {
                return Ok((key, hit.clone()));
            }
        }

        let url = format!("{}/{}", self.base_url, idx_key);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(&idx_key, e))?;

        match resp.status() {
            s if s.is_success() => {}
            StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                return Err(SourceError::NotPublished { key: idx_key })
            }
            s => {
                return Err(SourceError::Download {
                    key: idx_key,
                    detail: format!("unexpected status {s}"),
                })
            }
        }

        let text = resp
            .text()
            .await
            .map_err(|e| SourceError::from_reqwest(&idx_key, e))?;
        let entries = Arc::new(parse_idx(&text));
        if entries.is_empty() {
            return Err(SourceError::decode(&idx_key, "sidecar parsed to zero entries"));
        }

        debug!(key = %idx_key, messages = entries.len(), "parsed idx sidecar");
        self.idx_cache.lock().await.put(idx_key, entries.clone());
        Ok((key, entries))
    }

    async fn fetch_range(&self, key: &str, range: &ByteRange) -> Result<Bytes, SourceError> {
        let url = format!("{}/{}", self.base_url, key);
        let resp = self
            .client
            .get(&url)
            .header(reqwest::header::RANGE, range.header_value())
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(key, e))?;

        match resp.status() {
            s if s.is_success() => {}
            StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                return Err(SourceError::NotPublished {
                    key: key.to_string(),
                })
            }
            s => {
                return Err(SourceError::Download {
                    key: key.to_string(),
                    detail: format!("unexpected status {s} for {}", range.header_value()),
                })
            }
        }

        resp.bytes()
            .await
            .map_err(|e| SourceError::from_reqwest(key, e))
    }

    /// Decode a single GRIB2 message into a grid of this source's shape.
    fn decode_message(&self, key: &str, bytes: &[u8]) -> Result<Grid2, SourceError> {
        let reader = Cursor::new(bytes);
        let file = grib::from_reader(reader)
            .map_err(|e| SourceError::decode(key, format!("{:?}", e)))?;

        let (_, submessage) = file
            .iter()
            .next()
            .ok_or_else(|| SourceError::decode(key, "no messages in ranged response"))?;

        let decoder = grib::Grib2SubmessageDecoder::from(submessage)
            .map_err(|e| SourceError::decode(key, format!("{:?}", e)))?;
        let values: Vec<f32> = decoder
            .dispatch()
            .map_err(|e| SourceError::decode(key, format!("{:?}", e)))?
            .collect();

        let (ny, nx) = (self.grid.ny, self.grid.nx);
        if values.len() != ny * nx {
            return Err(SourceError::decode(
                key,
                format!("decoded {} values, expected {}x{}", values.len(), ny, nx),
            ));
        }
        Ok(Grid2::new(values, ny, nx))
    }
}

#[async_trait]
impl GridSource for HrrrSource {
    #[instrument(skip(self), fields(product = %product))]
    async fn inventory(
        &self,
        cycle: DateTime<Utc>,
        product: ModelProduct,
        fxx: u8,
    ) -> Result<(), SourceError> {
        let idx_key = format!("{}.idx", self.object_key(cycle, product, fxx));
        let url = format!("{}/{}", self.base_url, idx_key);

        let resp = self
            .probe_client
            .head(&url)
            .send()
            .await
            .map_err(|e| SourceError::from_reqwest(&idx_key, e))?;

        match resp.status() {
            s if s.is_success() => Ok(()),
            StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                Err(SourceError::NotPublished { key: idx_key })
            }
            s => Err(SourceError::Download {
                key: idx_key,
                detail: format!("unexpected status {s}"),
            }),
        }
    }

    #[instrument(skip(self), fields(product = %product, selector = %selector))]
    async fn materialize(
        &self,
        cycle: DateTime<Utc>,
        product: ModelProduct,
        fxx: u8,
        selector: &FieldSelector,
    ) -> Result<GridField, SourceError> {
        let (key, entries) = self.fetch_idx(cycle, product, fxx).await?;

        let matched = matching_entries(&entries, selector);
        let entry_idx = match matched.len() {
            0 => {
                return Err(SourceError::FieldNotFound {
                    selector: selector.to_string(),
                })
            }
            1 => matched[0],
            n => {
                return Err(SourceError::AmbiguousField {
                    selector: selector.to_string(),
                    count: n,
                })
            }
        };

        let ranges = coalesce_ranges(&entries, vec![entry_idx]);
        let bytes = self.fetch_range(&key, &ranges[0]).await?;
        let values = self.decode_message(&key, &bytes)?;

        Ok(GridField {
            values,
            coords: self.coords.clone(),
        })
    }

    #[instrument(skip(self, selectors), fields(product = %product, count = selectors.len()))]
    async fn materialize_batch(
        &self,
        cycle: DateTime<Utc>,
        product: ModelProduct,
        fxx: u8,
        selectors: &[FieldSelector],
    ) -> Result<Vec<Option<GridField>>, SourceError> {
        let (key, entries) = self.fetch_idx(cycle, product, fxx).await?;

        // One pass of selector matching over the index.
        let mut slots: Vec<Option<usize>> = Vec::with_capacity(selectors.len());
        for selector in selectors {
            let matched = matching_entries(&entries, selector);
            match matched.len() {
                0 => slots.push(None),
                1 => slots.push(Some(matched[0])),
                n => {
                    return Err(SourceError::AmbiguousField {
                        selector: selector.to_string(),
                        count: n,
                    })
                }
            }
        }

        let wanted: Vec<usize> = slots.iter().flatten().copied().collect();
        let ranges = coalesce_ranges(&entries, wanted);
        debug!(key = %key, fields = slots.iter().flatten().count(), requests = ranges.len(),
            "coalesced batch byte ranges");

        let mut decoded: HashMap<usize, Grid2> = HashMap::new();
        for range in &ranges {
            let bytes = self.fetch_range(&key, range).await?;
            for &entry_idx in &range.entries {
                let entry = &entries[entry_idx];
                let start = (entry.offset - range.start) as usize;
                let end = entry
                    .end
                    .map(|e| ((e - range.start) as usize).min(bytes.len()))
                    .unwrap_or(bytes.len());
                if start >= end {
                    return Err(SourceError::decode(
                        &key,
                        format!("empty byte range for message {}", entry.message),
                    ));
                }
                decoded.insert(entry_idx, self.decode_message(&key, &bytes[start..end])?);
            }
        }

        let mut fields = Vec::with_capacity(slots.len());
        for slot in slots {
            fields.push(match slot {
                Some(entry_idx) => {
                    let values = decoded.remove(&entry_idx).ok_or_else(|| {
                        SourceError::decode(&key, "two selectors resolved to one message")
                    })?;
                    Some(GridField {
                        values,
                        coords: self.coords.clone(),
                    })
                }
                None => None,
            });
        }
        Ok(fields)
    }
}
