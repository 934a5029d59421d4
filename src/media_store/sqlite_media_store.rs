use super::models::{join_tags, split_tags, MediaKind, MediaRecord};
use super::schema::MEDIA_SCHEMA;
use super::{MediaStore, StoreError};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

pub struct SqliteMediaStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteMediaStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let path = db_path.as_ref();
        let is_new_db = !path.exists();

        let conn = Connection::open(path).context("Failed to open media database")?;

        if is_new_db {
            info!("Creating new media database at {:?}", path);
            MEDIA_SCHEMA.create(&conn)?;
        } else {
            MEDIA_SCHEMA
                .validate(&conn)
                .with_context(|| format!("Media database schema validation failed: {:?}", path))?;
        }

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<MediaRecord> {
        let kind: String = row.get("kind")?;
        let countries: String = row.get("countries")?;
        let genres: String = row.get("genres")?;
        let created_at: String = row.get("created_at")?;
        let updated_at: String = row.get("updated_at")?;

        Ok(MediaRecord {
            id: Some(row.get("id")?),
            kinopoisk_id: row.get("kinopoisk_id")?,
            kind: MediaKind::parse(&kind),
            name_en: row.get("name_en")?,
            name_ru: row.get("name_ru")?,
            description: row.get("description")?,
            description_ru: row.get("description_ru")?,
            year: row.get("year")?,
            poster_url: row.get("poster_url")?,
            countries: split_tags(&countries),
            genres: split_tags(&genres),
            created_at: parse_timestamp(&created_at),
            updated_at: parse_timestamp(&updated_at),
        })
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::ConstraintViolation
    )
}

const SELECT_COLUMNS: &str = "id, kinopoisk_id, kind, name_en, name_ru, description, \
     description_ru, year, poster_url, countries, genres, created_at, updated_at";

impl MediaStore for SqliteMediaStore {
    fn get_by_id(&self, id: i64) -> Result<MediaRecord, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!("SELECT {} FROM media WHERE id = ?1", SELECT_COLUMNS),
            params![id],
            Self::row_to_record,
        )
        .optional()?
        .ok_or(StoreError::NotFound)
    }

    fn get_by_kinopoisk_id(&self, kinopoisk_id: i64) -> Result<MediaRecord, StoreError> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            &format!(
                "SELECT {} FROM media WHERE kinopoisk_id = ?1",
                SELECT_COLUMNS
            ),
            params![kinopoisk_id],
            Self::row_to_record,
        )
        .optional()?
        .ok_or(StoreError::NotFound)
    }

    fn search_by_name(&self, name: &str) -> Result<Vec<MediaRecord>, StoreError> {
        let pattern = format!("%{}%", name.to_lowercase());
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM media \
             WHERE lower(name_en) LIKE ?1 OR lower(name_ru) LIKE ?1 \
             ORDER BY id",
            SELECT_COLUMNS
        ))?;
        let records = stmt
            .query_map(params![pattern], Self::row_to_record)?
            .collect::<Result<Vec<_>, rusqlite::Error>>()?;
        Ok(records)
    }

    fn create(&self, record: &MediaRecord) -> Result<MediaRecord, StoreError> {
        let now = Utc::now().to_rfc3339();
        let conn = self.conn.lock().unwrap();
        let result = conn.execute(
            "INSERT INTO media (kinopoisk_id, kind, name_en, name_ru, description, \
             description_ru, year, poster_url, countries, genres, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)",
            params![
                record.kinopoisk_id,
                record.kind.as_str(),
                record.name_en,
                record.name_ru,
                record.description,
                record.description_ru,
                record.year,
                record.poster_url,
                join_tags(&record.countries),
                join_tags(&record.genres),
                now,
            ],
        );

        match result {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => {
                return Err(StoreError::DuplicateKinopoiskId(record.kinopoisk_id));
            }
            Err(err) => return Err(err.into()),
        }

        let id = conn.last_insert_rowid();
        conn.query_row(
            &format!("SELECT {} FROM media WHERE id = ?1", SELECT_COLUMNS),
            params![id],
            Self::row_to_record,
        )
        .map_err(StoreError::from)
    }

    fn update(&self, record: &MediaRecord) -> Result<MediaRecord, StoreError> {
        let id = record.id.ok_or(StoreError::NotFound)?;
        let conn = self.conn.lock().unwrap();

        let stored_kinopoisk_id: i64 = conn
            .query_row(
                "SELECT kinopoisk_id FROM media WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?
            .ok_or(StoreError::NotFound)?;

        if stored_kinopoisk_id != record.kinopoisk_id {
            return Err(StoreError::KinopoiskIdMismatch {
                id,
                stored: stored_kinopoisk_id,
                got: record.kinopoisk_id,
            });
        }

        let now = Utc::now().to_rfc3339();
        conn.execute(
            "UPDATE media SET kind = ?1, name_en = ?2, name_ru = ?3, description = ?4, \
             description_ru = ?5, year = ?6, poster_url = ?7, countries = ?8, genres = ?9, \
             updated_at = ?10 WHERE id = ?11",
            params![
                record.kind.as_str(),
                record.name_en,
                record.name_ru,
                record.description,
                record.description_ru,
                record.year,
                record.poster_url,
                join_tags(&record.countries),
                join_tags(&record.genres),
                now,
                id,
            ],
        )?;

        conn.query_row(
            &format!("SELECT {} FROM media WHERE id = ?1", SELECT_COLUMNS),
            params![id],
            Self::row_to_record,
        )
        .map_err(StoreError::from)
    }

    fn delete(&self, id: i64) -> Result<bool, StoreError> {
        let conn = self.conn.lock().unwrap();
        let affected = conn.execute("DELETE FROM media WHERE id = ?1", params![id])?;
        Ok(affected > 0)
    }
}
