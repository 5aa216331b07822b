//! Scriptable in-memory grid source.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use grid_source::{
    FieldSelector, GridField, GridSource, LatLonGrid, ModelProduct, SourceError,
};
use hazard_common::Grid2;

/// Failure mode scripted for a (product, fxx) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    NotPublished,
    Download,
}

/// A [`GridSource`] backed by scripted in-memory fields.
///
/// Cycles are ignored on lookup: fields and availability are keyed by
/// (product, fxx, variable, level) so tests don't have to thread real
/// timestamps through. The `materialize_calls` counter supports cache
/// coalescing assertions.
pub struct MockGridSource {
    coords: Arc<LatLonGrid>,
    fields: HashMap<(ModelProduct, u8, String), Grid2>,
    available: HashSet<(ModelProduct, u8)>,
    failures: HashMap<(ModelProduct, u8), MockFailure>,
    pub materialize_calls: AtomicUsize,
}

impl MockGridSource {
    pub fn new(coords: LatLonGrid) -> Self {
        Self {
            coords: Arc::new(coords),
            fields: HashMap::new(),
            available: HashSet::new(),
            failures: HashMap::new(),
            materialize_calls: AtomicUsize::new(0),
        }
    }

    fn field_key(product: ModelProduct, fxx: u8, variable: &str, level: &str) -> (ModelProduct, u8, String) {
        (product, fxx, format!("{}:{}", variable, level))
    }

    /// Script a field; also marks the (product, fxx) pair available.
    pub fn with_field(
        mut self,
        product: ModelProduct,
        fxx: u8,
        variable: &str,
        level: &str,
        values: Grid2,
    ) -> Self {
        assert_eq!(
            values.shape(),
            self.coords.shape(),
            "scripted field shape must match coords"
        );
        self.fields
            .insert(Self::field_key(product, fxx, variable, level), values);
        self.available.insert((product, fxx));
        self
    }

    /// Mark a (product, fxx) pair as probing available without any fields.
    pub fn with_available(mut self, product: ModelProduct, fxx: u8) -> Self {
        self.available.insert((product, fxx));
        self
    }

    /// Script a failure for materialize calls on a (product, fxx) pair.
    pub fn with_failure(mut self, product: ModelProduct, fxx: u8, failure: MockFailure) -> Self {
        self.failures.insert((product, fxx), failure);
        self
    }

    pub fn coords(&self) -> Arc<LatLonGrid> {
        self.coords.clone()
    }

    fn check_failure(&self, product: ModelProduct, fxx: u8) -> Result<(), SourceError> {
        match self.failures.get(&(product, fxx)) {
            Some(MockFailure::NotPublished) => Err(SourceError::NotPublished {
                key: format!("mock {product} f{fxx:02}"),
            }),
            Some(MockFailure::Download) => Err(SourceError::Download {
                key: format!("mock {product} f{fxx:02}"),
                detail: "scripted failure".to_string(),
            }),
            None => Ok(()),
        }
    }

    fn lookup(
        &self,
        product: ModelProduct,
        fxx: u8,
        selector: &FieldSelector,
    ) -> Option<GridField> {
        self.fields
            .get(&Self::field_key(product, fxx, &selector.variable, &selector.level))
            .map(|values| GridField {
                values: values.clone(),
                coords: self.coords.clone(),
            })
    }
}

#[async_trait]
impl GridSource for MockGridSource {
    async fn inventory(
        &self,
        _cycle: DateTime<Utc>,
        product: ModelProduct,
        fxx: u8,
    ) -> Result<(), SourceError> {
        self.check_failure(product, fxx)?;
        if self.available.contains(&(product, fxx)) {
            Ok(())
        } else {
            Err(SourceError::NotPublished {
                key: format!("mock {product} f{fxx:02}"),
            })
        }
    }

    async fn materialize(
        &self,
        _cycle: DateTime<Utc>,
        product: ModelProduct,
        fxx: u8,
        selector: &FieldSelector,
    ) -> Result<GridField, SourceError> {
        self.materialize_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure(product, fxx)?;
        self.lookup(product, fxx, selector)
            .ok_or_else(|| SourceError::FieldNotFound {
                selector: selector.to_string(),
            })
    }

    async fn materialize_batch(
        &self,
        _cycle: DateTime<Utc>,
        product: ModelProduct,
        fxx: u8,
        selectors: &[FieldSelector],
    ) -> Result<Vec<Option<GridField>>, SourceError> {
        self.materialize_calls.fetch_add(1, Ordering::SeqCst);
        self.check_failure(product, fxx)?;
        Ok(selectors
            .iter()
            .map(|s| self.lookup(product, fxx, s))
            .collect())
    }
}
