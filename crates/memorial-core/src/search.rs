/// Filter and search over the tagged, in-memory record set.
///
/// Scoring is rule based: the first matching rule wins, nothing is summed.
/// Results are ordered by score (descending), then by name.
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::model::{Filter, Record};
use crate::text::normalize;

pub const SCORE_EXACT_NAME: u8 = 100;
pub const SCORE_NAME_PREFIX: u8 = 90;
pub const SCORE_NAME_SUBSTRING: u8 = 70;
pub const SCORE_TEXT_SUBSTRING: u8 = 30;

/// A scored candidate. `index` points into the slice that was searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    pub index: usize,
    pub score: u8,
}

/// Keep records matching the filter, preserving order.
pub fn filter_by_tag(records: &[Record], filter: Filter) -> Vec<&Record> {
    records.iter().filter(|r| filter.matches(r)).collect()
}

/// Indices of the records matching the filter.
pub fn filtered_indices(records: &[Record], filter: Filter) -> Vec<usize> {
    records
        .iter()
        .enumerate()
        .filter(|(_, r)| filter.matches(r))
        .map(|(i, _)| i)
        .collect()
}

/// Score a record against an already normalized query.
pub fn score_record(record: &Record, normalized_query: &str) -> u8 {
    if normalized_query.is_empty() {
        return 0;
    }
    let name = normalize(&record.name);
    if name == normalized_query {
        SCORE_EXACT_NAME
    } else if name.starts_with(normalized_query) {
        SCORE_NAME_PREFIX
    } else if name.contains(normalized_query) {
        SCORE_NAME_SUBSTRING
    } else if normalize(&record.bio).contains(normalized_query)
        || normalize(&record.story).contains(normalized_query)
    {
        SCORE_TEXT_SUBSTRING
    } else {
        0
    }
}

/// Search `records` (already restricted to the active filter) for `query`.
pub fn search(records: &[&Record], query: &str, limit: usize) -> Vec<SearchHit> {
    let needle = normalize(query);
    if needle.is_empty() || limit == 0 {
        return Vec::new();
    }

    let mut ranked: Vec<(SearchHit, String)> = records
        .iter()
        .enumerate()
        .filter_map(|(index, record)| {
            let score = score_record(record, &needle);
            (score > 0).then(|| (SearchHit { index, score }, normalize(&record.name)))
        })
        .collect();

    // Ties order the way names match: normalized first, raw name second.
    ranked.sort_by(|(a, a_key), (b, b_key)| {
        b.score
            .cmp(&a.score)
            .then_with(|| a_key.cmp(b_key))
            .then_with(|| records[a.index].name.cmp(&records[b.index].name))
            .then_with(|| a.index.cmp(&b.index))
    });
    let mut hits: Vec<SearchHit> = ranked.into_iter().map(|(hit, _)| hit).collect();
    hits.truncate(limit);
    hits
}

/// Uniform random pick among `candidates`.
pub fn pick_random<T: Copy, R: Rng + ?Sized>(candidates: &[T], rng: &mut R) -> Option<T> {
    candidates.choose(rng).copied()
}
