use std::collections::BTreeSet;
use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

use crate::model::{RawRecord, Record, Tag};

fn rank_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(?:sgt|ssgt|s/sgt|cpt|capt|cpl|lt|maj|col|lt\.?\s?col|brig\.?\s?gen)\b")
            .expect("valid regex")
    })
}

fn foreign_worker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"\b(?:foreign workers?|migrant workers?|agricultural workers?|caregiver from|thai|thailand|nepal|nepalese|nepali|filipino|filipina|philippines|sri lankan?|cambodian?|tanzanian?|moldovan?|kenyan?)\b",
        )
        .expect("valid regex")
    })
}

/// Derive category tags for every record. Pure; order is preserved.
pub fn tag_records(records: Vec<RawRecord>) -> Vec<Record> {
    let tagged: Vec<Record> = records.into_iter().map(tag_record).collect();

    if tracing::enabled!(tracing::Level::DEBUG) {
        for tag in Tag::ALL {
            let count = tagged.iter().filter(|r| r.has_tag(tag)).count();
            debug!(tag = %tag, count, "tag distribution");
        }
    }
    tagged
}

pub fn tag_record(raw: RawRecord) -> Record {
    let tags = derive_tags(&raw);
    Record {
        name: raw.name,
        age: raw.age,
        bio: raw.bio,
        story: raw.story,
        image: raw.image,
        url: raw.url,
        tags,
    }
}

fn derive_tags(raw: &RawRecord) -> BTreeSet<Tag> {
    let name = raw.name.to_lowercase();
    let bio = raw.bio.to_lowercase();
    let story = raw.story.to_lowercase();

    let mut tags = BTreeSet::new();

    if bio.contains("nova") || story.contains("nova") {
        tags.insert(Tag::Nova);
    }
    if bio.contains("kidnapped") || bio.contains("captivity") || story.contains("kidnapped") {
        tags.insert(Tag::Hostages);
    }

    let soldier = bio.contains("soldier") || rank_re().is_match(&bio) || rank_re().is_match(&name);
    if soldier {
        tags.insert(Tag::Soldiers);
    } else if foreign_worker_re().is_match(&bio) || foreign_worker_re().is_match(&story) {
        tags.insert(Tag::ForeignWorkers);
    } else {
        tags.insert(Tag::Civilians);
    }

    tags
}
