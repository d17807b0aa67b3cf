//! Full-collection retrieval under a per-request page-size cap.
//!
//! Windows are requested in batches of `concurrency` consecutive offsets.
//! The loop only ends after a batch containing a short page; the reported
//! total, when present, is used to check completeness, never to stop early.

use crate::config::PagingConfig;
use crate::error::FetchError;
use crate::services::record_store::{Collection, Page, RecordStore};
use futures::future::join_all;
use serde::de::DeserializeOwned;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// A decoded row with a unique identifier.
pub trait Record: DeserializeOwned {
    fn record_id(&self) -> &str;
}

pub struct PageFetcher<'a, S> {
    store: &'a S,
    config: PagingConfig,
}

impl<'a, S: RecordStore> PageFetcher<'a, S> {
    pub fn new(store: &'a S, config: PagingConfig) -> Self {
        Self {
            store,
            config: config.sanitized(),
        }
    }

    /// Returns every record of `collection`, in offset order, without
    /// duplicate ids.
    #[tracing::instrument(skip(self, collection), fields(collection = %collection.name))]
    pub async fn fetch_all<T: Record>(&self, collection: &Collection) -> Result<Vec<T>, FetchError> {
        let page_size = self.config.page_size;
        let batch = self.config.concurrency;

        let mut raw = Vec::new();
        let mut reported_total: Option<usize> = None;
        let mut offset = 0usize;
        let mut requests = 0usize;

        loop {
            let windows: Vec<usize> = (0..batch)
                .map(|i| offset.saturating_add(i.saturating_mul(page_size)))
                .collect();
            let results = join_all(windows.iter().map(|&o| self.fetch_window(collection, o))).await;
            requests += windows.len();

            let mut exhausted = false;
            for result in results {
                let page = result?;
                if reported_total.is_none() {
                    reported_total = page.total;
                }
                if page.rows.len() < page_size {
                    exhausted = true;
                }
                raw.extend(page.rows);
            }

            if exhausted {
                break;
            }
            offset = offset.saturating_add(batch.saturating_mul(page_size));
            debug!(offset, rows = raw.len(), "Requesting next batch");
        }

        let mut seen = HashSet::with_capacity(raw.len());
        let mut records = Vec::with_capacity(raw.len());
        let mut duplicates = 0usize;

        for (index, value) in raw.into_iter().enumerate() {
            let record: T =
                serde_json::from_value(value).map_err(|source| FetchError::MalformedRow {
                    collection: collection.name.clone(),
                    index,
                    source,
                })?;
            if seen.insert(record.record_id().to_string()) {
                records.push(record);
            } else {
                duplicates += 1;
            }
        }

        if duplicates > 0 {
            warn!(duplicates, "Dropped rows repeated across pages");
        }

        if let Some(expected) = reported_total {
            if expected != records.len() {
                return Err(FetchError::IncompletePagination {
                    collection: collection.name.clone(),
                    expected,
                    retrieved: records.len(),
                });
            }
        }

        info!(
            records = records.len(),
            requests,
            reported_total,
            "Collection fetched"
        );
        Ok(records)
    }

    /// Requests one window, retrying transient failures with a doubling delay.
    async fn fetch_window(&self, collection: &Collection, offset: usize) -> Result<Page, FetchError> {
        let mut attempt = 0u32;
        let mut delay = self.config.retry_delay;

        loop {
            attempt += 1;
            match self
                .store
                .fetch_page(collection, offset, self.config.page_size)
                .await
            {
                Ok(page) => return Ok(page),
                Err(e) if e.is_transient() && attempt < self.config.max_attempts => {
                    warn!(
                        offset,
                        attempt,
                        max_attempts = self.config.max_attempts,
                        error = %e,
                        "Page request failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    delay = delay.saturating_mul(2);
                }
                Err(source) => {
                    return Err(FetchError::Page {
                        collection: collection.name.clone(),
                        offset,
                        attempts: attempt,
                        source,
                    });
                }
            }
        }
    }
}
