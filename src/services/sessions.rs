use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::sync::Cache;
use polars::prelude::DataFrame;
use tracing::{debug, info};
use uuid::Uuid;

/// One uploaded table and what is known about how it was read.
#[derive(Debug)]
pub struct Dataset {
    pub id: Uuid,
    pub file_name: Option<String>,
    pub loaded_at: DateTime<Utc>,
    pub delimiter: u8,
    pub skipped_rows: usize,
    pub frame: DataFrame,
}

/// Per-upload tables, evicted when idle or over capacity.
#[derive(Clone)]
pub struct SessionStore {
    cache: Cache<Uuid, Arc<Dataset>>,
}

impl SessionStore {
    pub fn new(max_sessions: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_sessions)
            .time_to_idle(ttl)
            .eviction_listener(|id, _, cause| {
                debug!("Dataset {} evicted: {:?}", id, cause);
            })
            .build();
        Self { cache }
    }

    pub fn insert(&self, dataset: Dataset) -> Arc<Dataset> {
        let dataset = Arc::new(dataset);
        info!(
            "Storing dataset {} ({} rows x {} columns)",
            dataset.id,
            dataset.frame.height(),
            dataset.frame.width()
        );
        self.cache.insert(dataset.id, Arc::clone(&dataset));
        dataset
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<Dataset>> {
        self.cache.get(id)
    }

    pub fn remove(&self, id: &Uuid) -> Option<Arc<Dataset>> {
        self.cache.remove(id)
    }
}
