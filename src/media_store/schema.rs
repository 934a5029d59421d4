//! SQLite schema for the media database.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

/// Media table. `kinopoisk_id` carries a UNIQUE constraint; it is the only
/// guard against two requests racing to create the same title.
const MEDIA_TABLE_V1: Table = Table {
    name: "media",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true), // AUTOINCREMENT
        sqlite_column!("kinopoisk_id", &SqlType::Integer, non_null = true, is_unique = true),
        sqlite_column!("kind", &SqlType::Text, non_null = true),
        sqlite_column!("name_en", &SqlType::Text, non_null = true),
        sqlite_column!("name_ru", &SqlType::Text, non_null = true),
        sqlite_column!("description", &SqlType::Text, non_null = true),
        sqlite_column!("description_ru", &SqlType::Text, non_null = true),
        sqlite_column!("year", &SqlType::Text, non_null = true),
        sqlite_column!("poster_url", &SqlType::Text, non_null = true),
        sqlite_column!("countries", &SqlType::Text, non_null = true),
        sqlite_column!("genres", &SqlType::Text, non_null = true),
        sqlite_column!("created_at", &SqlType::Text, non_null = true),
        sqlite_column!("updated_at", &SqlType::Text, non_null = true),
    ],
    indices: &[
        ("idx_media_name_en", "name_en"),
        ("idx_media_name_ru", "name_ru"),
    ],
};

pub const MEDIA_SCHEMA: VersionedSchema = VersionedSchema {
    version: 1,
    tables: &[MEDIA_TABLE_V1],
};
