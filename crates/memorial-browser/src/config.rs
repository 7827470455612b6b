use std::path::{Path, PathBuf};
use std::time::Duration;

use memorial_core::debounce::DEFAULT_SEARCH_DEBOUNCE;
use memorial_core::presenter::DEFAULT_SUGGESTION_LIMIT;
use memorial_core::story::DEFAULT_CUTOFF_PHRASES;

use crate::error::AppError;

const MAX_SUGGESTION_LIMIT: usize = 50;

#[derive(Debug, Clone)]
pub struct Config {
    /// Dataset file: a JSON array or a `victims_data.js` module.
    pub data_path: String,
    /// When set, serve one session per TCP connection instead of stdio.
    pub tcp_addr: Option<String>,
    /// When set, also serve the HTML page and suggestion API.
    pub http_addr: Option<String>,
    pub suggestion_limit: usize,
    pub search_debounce: Duration,
    pub cutoff_phrases: Vec<String>,
}

impl Config {
    /// Required:
    /// - `VICTIMS_DATA_PATH`
    ///
    /// Optional:
    /// - `VICTIM_BROWSER_TCP_ADDR`
    /// - `VICTIM_BROWSER_HTTP_ADDR`
    /// - `SUGGESTION_LIMIT` (default: 8, max 50)
    /// - `SEARCH_DEBOUNCE_MS` (default: 200)
    /// - `STORY_CUTOFF_PHRASES` (`|`-separated, replaces the built-in list)
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let data_path = lookup("VICTIMS_DATA_PATH").ok_or_else(|| {
            AppError::Config("VICTIMS_DATA_PATH environment variable is required".to_string())
        })?;

        let suggestion_limit = match lookup("SUGGESTION_LIMIT") {
            Some(raw) => parse_number::<usize>("SUGGESTION_LIMIT", &raw)?.clamp(1, MAX_SUGGESTION_LIMIT),
            None => DEFAULT_SUGGESTION_LIMIT,
        };

        let search_debounce = match lookup("SEARCH_DEBOUNCE_MS") {
            Some(raw) => Duration::from_millis(parse_number("SEARCH_DEBOUNCE_MS", &raw)?),
            None => DEFAULT_SEARCH_DEBOUNCE,
        };

        let cutoff_phrases = match lookup("STORY_CUTOFF_PHRASES") {
            Some(raw) => raw
                .split('|')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect(),
            None => DEFAULT_CUTOFF_PHRASES.iter().map(|p| p.to_string()).collect(),
        };

        Ok(Self {
            data_path,
            tcp_addr: lookup("VICTIM_BROWSER_TCP_ADDR").filter(|s| !s.trim().is_empty()),
            http_addr: lookup("VICTIM_BROWSER_HTTP_ADDR").filter(|s| !s.trim().is_empty()),
            suggestion_limit,
            search_debounce,
            cutoff_phrases,
        })
    }

    pub fn data_path(&self) -> PathBuf {
        Path::new(&self.data_path).to_path_buf()
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, AppError> {
    raw.trim()
        .parse()
        .map_err(|_| AppError::Config(format!("{key} must be a non-negative integer, got {raw:?}")))
}
