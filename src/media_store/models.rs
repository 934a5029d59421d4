use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of a media title, derived from the catalog's type string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Movie,
    Show,
    #[default]
    Other,
}

impl MediaKind {
    /// Parse the catalog's type string (`FILM`, `TV_SHOW`, `TV_SERIES`, ...).
    /// Unrecognized values map to `Other` rather than failing, since the
    /// catalog adds types without notice.
    pub fn parse(s: &str) -> Self {
        match s.to_ascii_uppercase().as_str() {
            "FILM" | "MOVIE" | "VIDEO" => MediaKind::Movie,
            "TV_SHOW" | "TV_SERIES" | "MINI_SERIES" | "SHOW" => MediaKind::Show,
            _ => MediaKind::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Show => "show",
            MediaKind::Other => "other",
        }
    }
}

/// A media title, either persisted (with `id` set) or as returned by the
/// external catalog (`id` is `None` until the record is stored).
///
/// `kinopoisk_id` is the external catalog's stable identifier and the join
/// key between catalog results and stored rows; no two stored rows share one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaRecord {
    pub id: Option<i64>,
    pub kinopoisk_id: i64,
    pub kind: MediaKind,
    pub name_en: String,
    pub name_ru: String,
    pub description: String,
    pub description_ru: String,
    /// Release date or year; the format depends on the source.
    pub year: String,
    pub poster_url: String,
    pub countries: Vec<String>,
    pub genres: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl MediaRecord {
    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }
}

/// Join tags for storage. The columns hold a single comma-separated string,
/// the encoding the media table has always used.
pub fn join_tags(tags: &[String]) -> String {
    tags.join(", ")
}

/// Split a stored tag column back into values, dropping empty fragments so
/// `""`, `"a"` and `"a, b"` all round-trip.
pub fn split_tags(s: &str) -> Vec<String> {
    s.split(',')
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}
