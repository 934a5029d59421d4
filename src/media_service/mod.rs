//! The media service: name lookup combining the external catalog with the
//! local store, plus the plain CRUD operations the HTTP layer exposes.

mod change;
mod merge;
mod reconcile;

pub use change::needs_update;
pub use merge::merge_results;
pub use reconcile::{
    reconcile_channel, spawn_reconciler, ReconcileAction, ReconcileLog, ReconcileOutcome,
    ReconcileTask, ReconcileWorker, Reconciler,
};

use crate::catalog_client::{CatalogClient, CatalogError};
use crate::media_store::{MediaRecord, MediaStore, StoreError};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum LookupError {
    /// The inbound request was cancelled before a result was assembled.
    /// Distinct from real failures so the transport does not log it as one.
    #[error("lookup cancelled")]
    Cancelled,

    #[error(transparent)]
    Store(#[from] StoreError),

    /// Only surfaced by the direct catalog search; `lookup_by_name` degrades
    /// to store-only results instead.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

pub struct MediaService {
    store: Arc<dyn MediaStore>,
    catalog: Arc<dyn CatalogClient>,
    reconciler: Reconciler,
}

impl MediaService {
    pub fn new(
        store: Arc<dyn MediaStore>,
        catalog: Arc<dyn CatalogClient>,
        reconciler: Reconciler,
    ) -> Self {
        Self {
            store,
            catalog,
            reconciler,
        }
    }

    pub fn reconcile_log(&self) -> Arc<ReconcileLog> {
        self.reconciler.log()
    }

    /// Resolve a free-text name into a merged, deduplicated list of records.
    ///
    /// The catalog and the store are both queried; a catalog failure only
    /// costs freshness (the local results are served as-is), while a store
    /// failure is fatal since the store is the authoritative source. The
    /// merged list is returned before any persistence happens; the snapshot
    /// is handed to the reconcile worker, whose failures never reach this
    /// caller.
    pub async fn lookup_by_name(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<MediaRecord>, LookupError> {
        info!("Looking up media by name {:?}", name);

        let catalog_results = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LookupError::Cancelled),
            result = self.catalog.search(name) => match result {
                Ok(records) => records,
                Err(err) => {
                    warn!(
                        "Catalog search for {:?} failed, serving local results only: {}",
                        name, err
                    );
                    crate::server::metrics::record_catalog_search_failure();
                    Vec::new()
                }
            },
        };

        if cancel.is_cancelled() {
            return Err(LookupError::Cancelled);
        }
        let local_results = self.store.search_by_name(name)?;

        let merged = merge_results(&local_results, &catalog_results);
        debug!(
            "Merged {} local and {} catalog results into {} for {:?}",
            local_results.len(),
            catalog_results.len(),
            merged.len(),
            name
        );

        if !catalog_results.is_empty() {
            self.reconciler.submit(ReconcileTask {
                keyword: name.to_string(),
                local: local_results,
                catalog: catalog_results,
            });
        }

        Ok(merged)
    }

    /// Query the external catalog directly, surfacing its errors.
    pub async fn search_catalog(
        &self,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<MediaRecord>, LookupError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(LookupError::Cancelled),
            result = self.catalog.search(name) => Ok(result?),
        }
    }

    pub fn get_by_id(&self, id: i64) -> Result<MediaRecord, StoreError> {
        self.store.get_by_id(id)
    }

    pub fn get_by_kinopoisk_id(&self, kinopoisk_id: i64) -> Result<MediaRecord, StoreError> {
        self.store.get_by_kinopoisk_id(kinopoisk_id)
    }

    pub fn save_media(&self, record: &MediaRecord) -> Result<MediaRecord, StoreError> {
        self.store.create(record)
    }

    /// Update an existing record. When the change detector reports no
    /// difference the stored row is returned untouched, so `updated_at`
    /// only moves when something actually changed.
    pub fn update_media(&self, record: &MediaRecord) -> Result<MediaRecord, StoreError> {
        let id = record.id.ok_or(StoreError::NotFound)?;
        let existing = self.store.get_by_id(id)?;

        // The external id is immutable; check before the no-op shortcut so a
        // mismatched request is rejected even when no display field changed.
        if existing.kinopoisk_id != record.kinopoisk_id {
            return Err(StoreError::KinopoiskIdMismatch {
                id,
                stored: existing.kinopoisk_id,
                got: record.kinopoisk_id,
            });
        }

        if !needs_update(Some(&existing), Some(record)) {
            debug!("No fields to update for media {}", id);
            return Ok(existing);
        }

        self.store.update(record)
    }

    pub fn delete_media(&self, id: i64) -> Result<bool, StoreError> {
        self.store.delete(id)
    }
}
