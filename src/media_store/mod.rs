mod models;
mod schema;
mod sqlite_media_store;

pub use models::{join_tags, split_tags, MediaKind, MediaRecord};
pub use schema::MEDIA_SCHEMA;
pub use sqlite_media_store::SqliteMediaStore;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// No row matched the lookup key. Callers routinely branch on this,
    /// so it is a distinct variant rather than a wrapped sqlite error.
    #[error("media not found")]
    NotFound,

    /// A row with this `kinopoisk_id` already exists (unique constraint).
    #[error("media with kinopoisk_id {0} already exists")]
    DuplicateKinopoiskId(i64),

    /// An update supplied a different `kinopoisk_id` than the stored one.
    /// The external id is immutable once a row is created.
    #[error("kinopoisk_id mismatch for media {id}: stored {stored}, got {got}")]
    KinopoiskIdMismatch { id: i64, stored: i64, got: i64 },

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Persistent storage for media records.
pub trait MediaStore: Send + Sync {
    /// Get a record by its internal id.
    fn get_by_id(&self, id: i64) -> Result<MediaRecord, StoreError>;

    /// Get a record by the external catalog id.
    fn get_by_kinopoisk_id(&self, kinopoisk_id: i64) -> Result<MediaRecord, StoreError>;

    /// Case-insensitive substring match against both the English and the
    /// Russian title. Returns rows in id order.
    fn search_by_name(&self, name: &str) -> Result<Vec<MediaRecord>, StoreError>;

    /// Insert a new record. Assigns `id`, `created_at` and `updated_at`;
    /// the `id`/timestamps on the argument are ignored. Fails with
    /// `DuplicateKinopoiskId` if the external id is already present.
    fn create(&self, record: &MediaRecord) -> Result<MediaRecord, StoreError>;

    /// Update an existing record in place, keyed by `record.id`.
    /// Fails with `NotFound` when `id` is absent or unknown and with
    /// `KinopoiskIdMismatch` when the external id differs from the stored
    /// one. Bumps `updated_at`.
    fn update(&self, record: &MediaRecord) -> Result<MediaRecord, StoreError>;

    /// Delete by internal id. Returns whether a row was actually removed;
    /// deleting a missing row is not an error.
    fn delete(&self, id: i64) -> Result<bool, StoreError>;
}
