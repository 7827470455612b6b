use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::CoreError;

/// A record as it appears in the external data module, before tagging.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecord {
    pub name: String,
    /// Age at death. The data module mixes numbers, numeric strings and nulls.
    #[serde(default, deserialize_with = "lenient_age")]
    pub age: Option<u32>,
    #[serde(default)]
    pub bio: String,
    /// Multi-paragraph story text, possibly with literal `\n` escapes.
    #[serde(default)]
    pub story: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub url: String,
}

/// A memorialized individual with derived category tags.
///
/// Built once by the tagger and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Record {
    pub name: String,
    pub age: Option<u32>,
    pub bio: String,
    pub story: String,
    pub image: String,
    pub url: String,
    pub tags: BTreeSet<Tag>,
}

impl Record {
    pub fn has_tag(&self, tag: Tag) -> bool {
        self.tags.contains(&tag)
    }

    /// Name line as shown in the name slot: `"Name, 32"` or just `"Name"`.
    pub fn display_name(&self) -> String {
        match self.age {
            Some(age) => format!("{}, {age}", self.name),
            None => self.name.clone(),
        }
    }
}

/// Derived category label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tag {
    Nova,
    Hostages,
    Soldiers,
    ForeignWorkers,
    Civilians,
}

impl Tag {
    pub const ALL: [Tag; 5] = [
        Tag::Nova,
        Tag::Hostages,
        Tag::Soldiers,
        Tag::ForeignWorkers,
        Tag::Civilians,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Tag::Nova => "nova",
            Tag::Hostages => "hostages",
            Tag::Soldiers => "soldiers",
            Tag::ForeignWorkers => "foreign-workers",
            Tag::Civilians => "civilians",
        }
    }

    /// Human readable label for filter buttons and empty-state messages.
    pub fn label(self) -> &'static str {
        match self {
            Tag::Nova => "Nova festival",
            Tag::Hostages => "Hostages",
            Tag::Soldiers => "Soldiers",
            Tag::ForeignWorkers => "Foreign workers",
            Tag::Civilians => "Civilians",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Active category filter: a single tag or everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Filter {
    #[default]
    All,
    Tag(Tag),
}

impl Filter {
    pub fn matches(self, record: &Record) -> bool {
        match self {
            Filter::All => true,
            Filter::Tag(tag) => record.has_tag(tag),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Filter::All => "all",
            Filter::Tag(tag) => tag.as_str(),
        }
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Filter {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        if key.is_empty() || key.eq_ignore_ascii_case("all") {
            return Ok(Filter::All);
        }
        Tag::ALL
            .into_iter()
            .find(|tag| tag.as_str().eq_ignore_ascii_case(key))
            .map(Filter::Tag)
            .ok_or_else(|| CoreError::UnknownFilter(key.to_string()))
    }
}

impl TryFrom<String> for Filter {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Filter> for String {
    fn from(filter: Filter) -> Self {
        filter.as_str().to_string()
    }
}

fn lenient_age<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum AgeValue {
        Number(f64),
        Text(String),
    }

    let value = Option::<AgeValue>::deserialize(deserializer)?;
    Ok(match value {
        Some(AgeValue::Number(n)) if n.is_finite() && n >= 0.0 => Some(n as u32),
        Some(AgeValue::Text(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_parses_case_insensitively() {
        assert_eq!("ALL".parse::<Filter>().unwrap(), Filter::All);
        assert_eq!("".parse::<Filter>().unwrap(), Filter::All);
        assert_eq!(
            "Foreign-Workers".parse::<Filter>().unwrap(),
            Filter::Tag(Tag::ForeignWorkers)
        );
        assert!(matches!(
            "pilots".parse::<Filter>(),
            Err(CoreError::UnknownFilter(ref k)) if k == "pilots"
        ));
    }

    #[test]
    fn raw_record_accepts_mixed_age_shapes() {
        let json = r#"[
            {"name": "A", "age": 21},
            {"name": "B", "age": "34"},
            {"name": "C", "age": null},
            {"name": "D"}
        ]"#;
        let records: Vec<RawRecord> = serde_json::from_str(json).unwrap();
        let ages: Vec<Option<u32>> = records.iter().map(|r| r.age).collect();
        assert_eq!(ages, vec![Some(21), Some(34), None, None]);
        assert_eq!(records[3].bio, "");
    }

    #[test]
    fn tags_serialize_kebab_case() {
        let json = serde_json::to_string(&Tag::ForeignWorkers).unwrap();
        assert_eq!(json, "\"foreign-workers\"");
        let filter: Filter = serde_json::from_str("\"nova\"").unwrap();
        assert_eq!(filter, Filter::Tag(Tag::Nova));
    }
}
