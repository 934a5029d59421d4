//! Combines store results and catalog results into one deduplicated list.

use super::change::needs_update;
use crate::media_store::MediaRecord;
use std::collections::HashMap;

/// Merge `local` and `catalog` results into a single list with at most one
/// entry per `kinopoisk_id`.
///
/// Precedence rule: local results seed the list in order, so every id keeps
/// the position of its first appearance across `local` followed by `catalog`.
/// When a catalog entry shares an id with an already-placed entry and its
/// display fields differ, the catalog entry replaces the placed one in its
/// original slot; fresher catalog data wins without reshuffling the list.
pub fn merge_results(local: &[MediaRecord], catalog: &[MediaRecord]) -> Vec<MediaRecord> {
    let mut merged: Vec<MediaRecord> = Vec::with_capacity(local.len() + catalog.len());
    let mut position_by_id: HashMap<i64, usize> = HashMap::new();

    for record in local {
        if !position_by_id.contains_key(&record.kinopoisk_id) {
            position_by_id.insert(record.kinopoisk_id, merged.len());
            merged.push(record.clone());
        }
    }

    for record in catalog {
        match position_by_id.get(&record.kinopoisk_id) {
            None => {
                position_by_id.insert(record.kinopoisk_id, merged.len());
                merged.push(record.clone());
            }
            Some(&position) => {
                if needs_update(Some(&merged[position]), Some(record)) {
                    merged[position] = record.clone();
                }
            }
        }
    }

    merged
}
