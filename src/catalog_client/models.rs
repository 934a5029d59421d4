//! Wire types for the Kinopoisk search API.

use crate::media_store::{MediaKind, MediaRecord};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(super) struct SearchByKeywordResponse {
    #[serde(default)]
    pub films: Vec<Film>,
}

/// A single film entry. The API omits fields freely, so everything defaults
/// to its zero value.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub(super) struct Film {
    #[serde(rename = "filmId")]
    pub film_id: i64,
    #[serde(rename = "nameRu")]
    pub name_ru: String,
    #[serde(rename = "nameEn")]
    pub name_en: String,
    #[serde(rename = "type")]
    pub film_type: String,
    pub year: String,
    pub description: String,
    #[serde(rename = "posterUrl")]
    pub poster_url: String,
    pub countries: Vec<Country>,
    pub genres: Vec<Genre>,
}

#[derive(Debug, Deserialize, Default)]
pub(super) struct Country {
    #[serde(default)]
    pub country: String,
}

#[derive(Debug, Deserialize, Default)]
pub(super) struct Genre {
    #[serde(default)]
    pub genre: String,
}

impl Film {
    pub fn into_record(self) -> MediaRecord {
        MediaRecord {
            id: None,
            kinopoisk_id: self.film_id,
            kind: MediaKind::parse(&self.film_type),
            name_en: self.name_en,
            name_ru: self.name_ru,
            description: self.description,
            description_ru: String::new(),
            year: self.year,
            poster_url: self.poster_url,
            countries: self
                .countries
                .into_iter()
                .map(|c| c.country)
                .filter(|c| !c.is_empty())
                .collect(),
            genres: self
                .genres
                .into_iter()
                .map(|g| g.genre)
                .filter(|g| !g.is_empty())
                .collect(),
            created_at: None,
            updated_at: None,
        }
    }
}
