//! Display-field comparison between a stored record and a catalog candidate.

use crate::media_store::MediaRecord;

/// Whether `candidate` carries different display data than `existing`.
///
/// Compares kind, both titles, both descriptions, release info, poster and
/// the tag collections (by normalized value, not by representation). Internal
/// id and timestamps are ignored. An absent operand on either side reports
/// `true`: when the comparison is impossible, reconcile.
pub fn needs_update(existing: Option<&MediaRecord>, candidate: Option<&MediaRecord>) -> bool {
    let (existing, candidate) = match (existing, candidate) {
        (Some(e), Some(c)) => (e, c),
        _ => return true,
    };

    existing.kind != candidate.kind
        || existing.name_en != candidate.name_en
        || existing.name_ru != candidate.name_ru
        || existing.description != candidate.description
        || existing.description_ru != candidate.description_ru
        || existing.year != candidate.year
        || existing.poster_url != candidate.poster_url
        || normalized(&existing.countries) != normalized(&candidate.countries)
        || normalized(&existing.genres) != normalized(&candidate.genres)
}

fn normalized(tags: &[String]) -> Vec<&str> {
    tags.iter()
        .map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .collect()
}
