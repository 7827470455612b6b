use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::model::Record;
use crate::search::SearchHit;
use crate::text::{highlight, normalize, Segment};

/// One entry in the autocomplete list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    /// Index of the record in the full dataset.
    pub record: usize,
    pub name: String,
    pub segments: Vec<Segment>,
    /// Secondary text telling apart people who share a name.
    pub detail: Option<String>,
    pub score: u8,
}

fn location_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\b(?:from|of|in)\s+((?:Kibbutz|Moshav|Kfar|Kiryat|Nahal|Ein|Tel|Be'er|Ramat|Rosh)\s+[A-Z][\w'’-]*|[A-Z][\w'’-]*(?:\s+[A-Z][\w'’-]*)?)",
        )
        .expect("valid regex")
    })
}

/// First place name mentioned after "from", "of" or "in" in a bio.
pub fn extract_location(bio: &str) -> Option<String> {
    location_re()
        .captures(bio)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim_end_matches(&['\'', '’'][..]).to_string())
}

/// Turn search hits into labelled suggestions.
///
/// `dataset_index` maps a hit's position in the searched slice back to the
/// record's index in the full dataset.
pub fn build_suggestions(
    records: &[Record],
    hits: &[SearchHit],
    dataset_index: impl Fn(usize) -> usize,
    query: &str,
) -> Vec<Suggestion> {
    let picked: Vec<usize> = hits.iter().map(|h| dataset_index(h.index)).collect();

    let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
    for &idx in &picked {
        by_name.entry(normalize(&records[idx].name)).or_default().push(idx);
    }

    hits.iter()
        .zip(&picked)
        .map(|(hit, &idx)| {
            let record = &records[idx];
            let namesakes = &by_name[&normalize(&record.name)];
            Suggestion {
                record: idx,
                name: record.name.clone(),
                segments: highlight(&record.name, query),
                detail: disambiguator(records, idx, namesakes),
                score: hit.score,
            }
        })
        .collect()
}

fn disambiguator(records: &[Record], idx: usize, namesakes: &[usize]) -> Option<String> {
    let record = &records[idx];
    let age = record.age.map(|a| a.to_string());

    let age_collides = namesakes
        .iter()
        .any(|&other| other != idx && records[other].age == record.age);
    if !age_collides {
        return age;
    }

    match (age, extract_location(&record.bio)) {
        (Some(age), Some(place)) => Some(format!("{age}, {place}")),
        (None, Some(place)) => Some(place),
        (age, None) => age,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RawRecord;
    use crate::tagger::tag_records;

    fn record(name: &str, age: Option<u32>, bio: &str) -> RawRecord {
        RawRecord {
            name: name.to_string(),
            age,
            bio: bio.to_string(),
            ..Default::default()
        }
    }

    fn hits(indices: &[usize]) -> Vec<SearchHit> {
        indices.iter().map(|&index| SearchHit { index, score: 90 }).collect()
    }

    #[test]
    fn location_extraction() {
        assert_eq!(
            extract_location("soldier from Tel Aviv").as_deref(),
            Some("Tel Aviv")
        );
        assert_eq!(
            extract_location("a nurse of Kibbutz Be'eri, mother of three").as_deref(),
            Some("Kibbutz Be'eri")
        );
        assert_eq!(
            extract_location("lived in Sderot with her family").as_deref(),
            Some("Sderot")
        );
        assert_eq!(extract_location("loved the sea"), None);
    }

    #[test]
    fn unique_names_show_age() {
        let records = tag_records(vec![record("Noa Levi", Some(21), "")]);
        let suggestions = build_suggestions(&records, &hits(&[0]), |i| i, "noa");
        assert_eq!(suggestions[0].detail.as_deref(), Some("21"));
        assert!(suggestions[0].segments[0].matched);
    }

    #[test]
    fn namesakes_split_by_age_then_location() {
        let records = tag_records(vec![
            record("Noa Levi", Some(21), "soldier from Tel Aviv"),
            record("Noa Levi", Some(45), "teacher from Haifa"),
            record("Noa Levi", Some(21), "student from Ashkelon"),
            record("Noa Levi", None, "from Sderot"),
        ]);
        let suggestions = build_suggestions(&records, &hits(&[0, 1, 2, 3]), |i| i, "noa");
        let details: Vec<Option<&str>> =
            suggestions.iter().map(|s| s.detail.as_deref()).collect();
        assert_eq!(
            details,
            vec![
                Some("21, Tel Aviv"),
                Some("45"),
                Some("21, Ashkelon"),
                None,
            ]
        );
    }

    #[test]
    fn dataset_index_mapping_is_applied() {
        let records = tag_records(vec![
            record("Avi", Some(30), ""),
            record("Noa", Some(22), ""),
        ]);
        let suggestions = build_suggestions(&records, &hits(&[0]), |_| 1, "noa");
        assert_eq!(suggestions[0].record, 1);
        assert_eq!(suggestions[0].name, "Noa");
    }
}
