use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use tracing::info;

use crate::error::CoreError;
use crate::model::RawRecord;

/// Load raw records from a data file on disk.
///
/// Accepts a bare JSON array or a JS data module (`window.victims_data = [...];`).
pub fn load_dataset(path: &Path) -> Result<Vec<RawRecord>, CoreError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CoreError::DataUnavailable(format!("failed to read {}: {e}", path.display()))
    })?;
    let records = parse_dataset(&content)?;
    info!(path = %path.display(), records = records.len(), "dataset loaded");
    Ok(records)
}

pub fn parse_dataset(content: &str) -> Result<Vec<RawRecord>, CoreError> {
    let body = strip_module_wrapper(content);
    if body.is_empty() {
        return Err(CoreError::DataUnavailable("dataset is empty".to_string()));
    }
    Ok(serde_json::from_str(body)?)
}

/// Returns the array literal from a `victims_data = [...]` assignment, or the
/// trimmed input when there is no wrapper.
fn strip_module_wrapper(content: &str) -> &str {
    static ASSIGNMENT: OnceLock<Regex> = OnceLock::new();
    let assignment = ASSIGNMENT.get_or_init(|| {
        Regex::new(r"^\s*(?:(?:var|let|const)\s+|window\.)?victims_data\s*=\s*")
            .expect("valid regex")
    });

    let trimmed = content.trim();
    let Some(m) = assignment.find(trimmed) else {
        return trimmed;
    };
    trimmed[m.end()..].trim().trim_end_matches(';').trim_end()
}
