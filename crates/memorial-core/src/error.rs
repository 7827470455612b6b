/// Error types shared by the victim browser crates.
///
/// `DataUnavailable` is the only variant the presenter treats as fatal for a
/// session (it maps to the global-error state). Everything else is recovered
/// at the handler boundary. Binary crates wrap `CoreError` via `#[from]`.

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("victim data unavailable: {0}")]
    DataUnavailable(String),

    #[error("dataset parse error: {0}")]
    Dataset(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown filter: {0}")]
    UnknownFilter(String),

    #[error("suggestion index {index} out of range ({len} suggestions)")]
    SuggestionOutOfRange { index: usize, len: usize },

    #[error("render error: {0}")]
    Render(String),
}
