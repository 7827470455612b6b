/// Presenter: turns interaction events into session state changes and slot
/// updates on a `Renderer`.
///
/// Every handler takes the current `SessionState` and returns the next one.
/// Failures never escape a handler: missing data becomes the global-error
/// state, anything else becomes the local empty-state panel.
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::CoreError;
use crate::model::{Filter, Record, Tag};
use crate::search::{filtered_indices, pick_random, search};
use crate::story::{Story, StoryFormatter};
use crate::suggest::{build_suggestions, Suggestion};
use crate::text::normalize;

pub const DEFAULT_SUGGESTION_LIMIT: usize = 8;

const GLOBAL_ERROR_MESSAGE: &str = "Victim data could not be loaded. Please try again later.";

/// Display slots of the page. Implementations decide how a slot is drawn.
pub trait Renderer {
    fn show_record(&mut self, view: &RecordView) -> Result<(), CoreError>;
    fn show_suggestions(
        &mut self,
        suggestions: &[Suggestion],
        selected: Option<usize>,
    ) -> Result<(), CoreError>;
    fn hide_suggestions(&mut self) -> Result<(), CoreError>;
    fn show_empty_state(&mut self, panel: &EmptyState) -> Result<(), CoreError>;
    fn show_global_error(&mut self, message: &str) -> Result<(), CoreError>;
    fn set_active_filter(&mut self, filter: Filter) -> Result<(), CoreError>;
    fn set_search_text(&mut self, text: &str) -> Result<(), CoreError>;
    fn blur_search(&mut self) -> Result<(), CoreError>;
}

/// Everything the record slots need, already formatted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordView {
    pub index: usize,
    pub name: String,
    /// `"Name, age"` for the name slot.
    pub name_line: String,
    pub image: String,
    pub image_alt: String,
    pub bio: String,
    pub story: Story,
    pub url: String,
    pub tags: Vec<Tag>,
}

impl RecordView {
    pub fn new(index: usize, record: &Record, formatter: &StoryFormatter) -> Self {
        Self {
            index,
            name: record.name.clone(),
            name_line: record.display_name(),
            image: record.image.clone(),
            image_alt: record.name.clone(),
            bio: record.bio.clone(),
            story: formatter.format(&record.story),
            url: record.url.clone(),
            tags: record.tags.iter().copied().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyAction {
    ClearSearch,
    ShowAnother,
    ShowAll,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EmptyReason {
    NoSearchMatches { query: String, filter: Filter },
    EmptyFilter { filter: Filter },
    RenderFailure,
}

/// The local "nothing to show" panel with its recovery actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyState {
    pub reason: EmptyReason,
    pub message: String,
    pub actions: Vec<EmptyAction>,
}

impl EmptyState {
    pub fn new(reason: EmptyReason) -> Self {
        let (message, actions) = match &reason {
            EmptyReason::NoSearchMatches { query, filter } => {
                let message = match filter {
                    Filter::All => format!("No results for \"{}\"", query.trim()),
                    Filter::Tag(tag) => {
                        format!("No results for \"{}\" in {}", query.trim(), tag.label())
                    }
                };
                (message, vec![EmptyAction::ClearSearch, EmptyAction::ShowAnother])
            }
            EmptyReason::EmptyFilter { filter } => {
                let message = match filter {
                    Filter::All => "No victims found".to_string(),
                    Filter::Tag(tag) => format!("No victims found for {}", tag.label()),
                };
                (message, vec![EmptyAction::ShowAll])
            }
            EmptyReason::RenderFailure => (
                "This record could not be displayed".to_string(),
                vec![EmptyAction::ShowAnother],
            ),
        };
        Self {
            reason,
            message,
            actions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Display {
    #[default]
    Nothing,
    Record { index: usize },
    Empty { reason: EmptyReason },
    GlobalError,
}

/// Per-session UI state, owned by the caller and threaded through handlers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub filter: Filter,
    pub search_term: String,
    /// Whether the suggestion list is open.
    pub search_mode: bool,
    pub selected_suggestion: Option<usize>,
    pub suggestions: Vec<Suggestion>,
    pub display: Display,
}

impl SessionState {
    fn close_suggestions(&mut self) {
        self.search_mode = false;
        self.selected_suggestion = None;
        self.suggestions.clear();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    Down,
    Up,
    Enter,
    Escape,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Load,
    SelectFilter(Filter),
    /// Raw keystroke-level change of the search box.
    SearchInput(String),
    /// The debounced search for this text is due.
    SearchSettled(String),
    Key(Key),
    PickSuggestion(usize),
    ClearSearch,
    ShowAnother,
}

pub struct Presenter<G = StdRng> {
    records: Arc<[Record]>,
    formatter: StoryFormatter,
    suggestion_limit: usize,
    rng: G,
}

impl Presenter<StdRng> {
    pub fn new(records: Arc<[Record]>, formatter: StoryFormatter, suggestion_limit: usize) -> Self {
        Self::with_rng(records, formatter, suggestion_limit, StdRng::from_entropy())
    }
}

impl<G: Rng> Presenter<G> {
    pub fn with_rng(
        records: Arc<[Record]>,
        formatter: StoryFormatter,
        suggestion_limit: usize,
        rng: G,
    ) -> Self {
        Self {
            records,
            formatter,
            suggestion_limit,
            rng,
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Ranked suggestions for `query` within `filter`. No rendering.
    pub fn suggest(&self, filter: Filter, query: &str) -> Vec<Suggestion> {
        self.suggest_limited(filter, query, self.suggestion_limit)
    }

    pub fn suggest_limited(&self, filter: Filter, query: &str, limit: usize) -> Vec<Suggestion> {
        let indices = filtered_indices(&self.records, filter);
        let subset: Vec<&Record> = indices.iter().map(|&i| &self.records[i]).collect();
        let hits = search(&subset, query, limit);
        build_suggestions(&self.records, &hits, |i| indices[i], query)
    }

    /// Apply one event. Never fails; see module docs for the downgrade rules.
    pub fn dispatch(
        &mut self,
        mut state: SessionState,
        event: Event,
        renderer: &mut dyn Renderer,
    ) -> SessionState {
        debug!(?event, filter = %state.filter, "dispatch");
        match self.apply(&mut state, event, renderer) {
            Ok(()) => state,
            Err(CoreError::DataUnavailable(reason)) => {
                warn!(%reason, "no victim data, showing global error");
                state.close_suggestions();
                state.display = Display::GlobalError;
                if let Err(e) = renderer.show_global_error(GLOBAL_ERROR_MESSAGE) {
                    warn!(error = %e, "failed to render global error");
                }
                state
            }
            Err(err @ CoreError::SuggestionOutOfRange { .. }) => {
                warn!(error = %err, "ignoring suggestion pick");
                state
            }
            Err(err) => {
                warn!(error = %err, "handler failed, showing empty state");
                state.close_suggestions();
                let panel = EmptyState::new(EmptyReason::RenderFailure);
                state.display = Display::Empty {
                    reason: panel.reason.clone(),
                };
                if let Err(e) = renderer.hide_suggestions() {
                    warn!(error = %e, "failed to hide suggestions");
                }
                if let Err(e) = renderer.show_empty_state(&panel) {
                    warn!(error = %e, "failed to render empty state");
                }
                state
            }
        }
    }

    fn apply(
        &mut self,
        state: &mut SessionState,
        event: Event,
        renderer: &mut dyn Renderer,
    ) -> Result<(), CoreError> {
        if self.records.is_empty() {
            return Err(CoreError::DataUnavailable(
                "no victim records loaded".to_string(),
            ));
        }

        match event {
            Event::Load => {
                info!(records = self.records.len(), "loading first record");
                renderer.set_active_filter(state.filter)?;
                self.show_random(state, renderer)
            }
            Event::SelectFilter(filter) => self.select_filter(state, filter, renderer),
            Event::SearchInput(text) => self.search_input(state, text, renderer),
            Event::SearchSettled(text) => self.search_settled(state, &text, renderer),
            Event::Key(key) => self.key(state, key, renderer),
            Event::PickSuggestion(position) => self.commit_suggestion(state, position, renderer),
            Event::ClearSearch => {
                state.search_term.clear();
                state.close_suggestions();
                renderer.set_search_text("")?;
                renderer.hide_suggestions()?;
                self.show_random(state, renderer)
            }
            Event::ShowAnother => {
                if state.search_mode {
                    state.close_suggestions();
                    renderer.hide_suggestions()?;
                }
                self.show_random(state, renderer)
            }
        }
    }

    fn select_filter(
        &mut self,
        state: &mut SessionState,
        filter: Filter,
        renderer: &mut dyn Renderer,
    ) -> Result<(), CoreError> {
        info!(%filter, "filter selected");
        state.filter = filter;
        state.search_term.clear();
        state.close_suggestions();
        renderer.set_active_filter(filter)?;
        renderer.set_search_text("")?;
        renderer.hide_suggestions()?;
        self.show_random(state, renderer)
    }

    fn search_input(
        &mut self,
        state: &mut SessionState,
        text: String,
        renderer: &mut dyn Renderer,
    ) -> Result<(), CoreError> {
        state.search_term = text;
        if !normalize(&state.search_term).is_empty() {
            return Ok(());
        }

        if state.search_mode {
            state.close_suggestions();
            renderer.hide_suggestions()?;
        }
        if matches!(
            state.display,
            Display::Empty {
                reason: EmptyReason::NoSearchMatches { .. }
            }
        ) {
            self.show_random(state, renderer)?;
        }
        Ok(())
    }

    fn search_settled(
        &mut self,
        state: &mut SessionState,
        text: &str,
        renderer: &mut dyn Renderer,
    ) -> Result<(), CoreError> {
        if text != state.search_term {
            debug!(stale = text, current = %state.search_term, "dropping superseded search");
            return Ok(());
        }
        if normalize(text).is_empty() {
            return Ok(());
        }

        let suggestions = self.suggest(state.filter, text);
        debug!(query = text, matches = suggestions.len(), "search complete");

        if suggestions.is_empty() {
            state.close_suggestions();
            renderer.hide_suggestions()?;
            let panel = EmptyState::new(EmptyReason::NoSearchMatches {
                query: text.to_string(),
                filter: state.filter,
            });
            renderer.show_empty_state(&panel)?;
            state.display = Display::Empty {
                reason: panel.reason,
            };
            return Ok(());
        }

        let top = suggestions[0].record;
        state.suggestions = suggestions;
        state.search_mode = true;
        state.selected_suggestion = None;
        renderer.show_suggestions(&state.suggestions, None)?;

        if matches!(state.display, Display::Empty { .. } | Display::Nothing) {
            self.show_record(state, top, renderer)?;
        }
        Ok(())
    }

    fn key(
        &mut self,
        state: &mut SessionState,
        key: Key,
        renderer: &mut dyn Renderer,
    ) -> Result<(), CoreError> {
        if key == Key::Escape {
            state.close_suggestions();
            renderer.hide_suggestions()?;
            return renderer.blur_search();
        }

        if !state.search_mode || state.suggestions.is_empty() {
            return Ok(());
        }
        let last = state.suggestions.len() - 1;

        match key {
            Key::Down => {
                state.selected_suggestion = Some(match state.selected_suggestion {
                    Some(i) => (i + 1).min(last),
                    None => 0,
                });
            }
            Key::Up => {
                state.selected_suggestion = state.selected_suggestion.map(|i| i.saturating_sub(1));
            }
            Key::Enter => {
                let position = state.selected_suggestion.unwrap_or(0);
                return self.commit_suggestion(state, position, renderer);
            }
            Key::Escape => unreachable!("handled above"),
        }
        renderer.show_suggestions(&state.suggestions, state.selected_suggestion)
    }

    fn commit_suggestion(
        &mut self,
        state: &mut SessionState,
        position: usize,
        renderer: &mut dyn Renderer,
    ) -> Result<(), CoreError> {
        let suggestion = state
            .suggestions
            .get(position)
            .ok_or(CoreError::SuggestionOutOfRange {
                index: position,
                len: state.suggestions.len(),
            })?;
        let index = suggestion.record;
        info!(record = index, name = %suggestion.name, "suggestion committed");

        state.close_suggestions();
        renderer.hide_suggestions()?;
        self.show_record(state, index, renderer)
    }

    fn show_random(
        &mut self,
        state: &mut SessionState,
        renderer: &mut dyn Renderer,
    ) -> Result<(), CoreError> {
        let candidates = filtered_indices(&self.records, state.filter);
        match pick_random(&candidates, &mut self.rng) {
            Some(index) => self.show_record(state, index, renderer),
            None => {
                let panel = EmptyState::new(EmptyReason::EmptyFilter {
                    filter: state.filter,
                });
                renderer.show_empty_state(&panel)?;
                state.display = Display::Empty {
                    reason: panel.reason,
                };
                Ok(())
            }
        }
    }

    fn show_record(
        &mut self,
        state: &mut SessionState,
        index: usize,
        renderer: &mut dyn Renderer,
    ) -> Result<(), CoreError> {
        let view = RecordView::new(index, &self.records[index], &self.formatter);
        renderer.show_record(&view)?;
        state.display = Display::Record { index };
        Ok(())
    }
}
