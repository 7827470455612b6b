//! Newline-delimited JSON wire format between a display surface and a session.
//!
//! Inbound lines are `ClientEvent`s, outbound lines are `RenderOp`s, one per
//! slot update.
use serde::{Deserialize, Serialize};

use memorial_core::error::CoreError;
use memorial_core::model::Filter;
use memorial_core::presenter::{EmptyAction, EmptyState, Event, Key, RecordView, Renderer};
use memorial_core::suggest::Suggestion;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientEvent {
    Load,
    FilterClick { filter: Filter },
    SearchInput { text: String },
    Key { key: Key },
    SuggestionPick { index: usize },
    /// A button in the empty-state panel.
    EmptyStateAction { action: EmptyAction },
}

impl From<ClientEvent> for Event {
    fn from(event: ClientEvent) -> Self {
        match event {
            ClientEvent::Load => Event::Load,
            ClientEvent::FilterClick { filter } => Event::SelectFilter(filter),
            ClientEvent::SearchInput { text } => Event::SearchInput(text),
            ClientEvent::Key { key } => Event::Key(key),
            ClientEvent::SuggestionPick { index } => Event::PickSuggestion(index),
            ClientEvent::EmptyStateAction { action } => match action {
                EmptyAction::ClearSearch => Event::ClearSearch,
                EmptyAction::ShowAnother => Event::ShowAnother,
                EmptyAction::ShowAll => Event::SelectFilter(Filter::All),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RenderOp {
    ShowRecord { record: RecordView },
    ShowSuggestions {
        suggestions: Vec<Suggestion>,
        selected: Option<usize>,
    },
    HideSuggestions,
    ShowEmptyState { panel: EmptyState },
    ShowGlobalError { message: String },
    SetActiveFilter { filter: Filter },
    SetSearchText { text: String },
    BlurSearch,
}

/// Renderer that queues slot updates until the transport drains them.
#[derive(Debug, Default)]
pub struct JsonRenderer {
    ops: Vec<RenderOp>,
}

impl JsonRenderer {
    pub fn drain(&mut self) -> std::vec::Drain<'_, RenderOp> {
        self.ops.drain(..)
    }
}

impl Renderer for JsonRenderer {
    fn show_record(&mut self, view: &RecordView) -> Result<(), CoreError> {
        self.ops.push(RenderOp::ShowRecord {
            record: view.clone(),
        });
        Ok(())
    }

    fn show_suggestions(
        &mut self,
        suggestions: &[Suggestion],
        selected: Option<usize>,
    ) -> Result<(), CoreError> {
        self.ops.push(RenderOp::ShowSuggestions {
            suggestions: suggestions.to_vec(),
            selected,
        });
        Ok(())
    }

    fn hide_suggestions(&mut self) -> Result<(), CoreError> {
        self.ops.push(RenderOp::HideSuggestions);
        Ok(())
    }

    fn show_empty_state(&mut self, panel: &EmptyState) -> Result<(), CoreError> {
        self.ops.push(RenderOp::ShowEmptyState {
            panel: panel.clone(),
        });
        Ok(())
    }

    fn show_global_error(&mut self, message: &str) -> Result<(), CoreError> {
        self.ops.push(RenderOp::ShowGlobalError {
            message: message.to_string(),
        });
        Ok(())
    }

    fn set_active_filter(&mut self, filter: Filter) -> Result<(), CoreError> {
        self.ops.push(RenderOp::SetActiveFilter { filter });
        Ok(())
    }

    fn set_search_text(&mut self, text: &str) -> Result<(), CoreError> {
        self.ops.push(RenderOp::SetSearchText {
            text: text.to_string(),
        });
        Ok(())
    }

    fn blur_search(&mut self) -> Result<(), CoreError> {
        self.ops.push(RenderOp::BlurSearch);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use memorial_core::model::Tag;

    use super::*;

    #[test]
    fn parse_client_events() {
        let cases = [
            (r#"{"event":"load"}"#, Event::Load),
            (
                r#"{"event":"filter_click","filter":"foreign-workers"}"#,
                Event::SelectFilter(Filter::Tag(Tag::ForeignWorkers)),
            ),
            (
                r#"{"event":"search_input","text":"noa"}"#,
                Event::SearchInput("noa".into()),
            ),
            (r#"{"event":"key","key":"down"}"#, Event::Key(Key::Down)),
            (
                r#"{"event":"suggestion_pick","index":2}"#,
                Event::PickSuggestion(2),
            ),
            (
                r#"{"event":"empty_state_action","action":"show_all"}"#,
                Event::SelectFilter(Filter::All),
            ),
        ];
        for (line, expected) in cases {
            let event: ClientEvent = serde_json::from_str(line).unwrap();
            assert_eq!(Event::from(event), expected, "line {line}");
        }
    }

    #[test]
    fn unknown_filter_is_rejected() {
        let result: Result<ClientEvent, _> =
            serde_json::from_str(r#"{"event":"filter_click","filter":"pilots"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn render_ops_are_tagged() {
        let mut renderer = JsonRenderer::default();
        renderer.set_active_filter(Filter::Tag(Tag::Nova)).unwrap();
        renderer.blur_search().unwrap();
        let lines: Vec<String> = renderer
            .drain()
            .map(|op| serde_json::to_string(&op).unwrap())
            .collect();
        assert_eq!(
            lines,
            vec![
                r#"{"op":"set_active_filter","filter":"nova"}"#.to_string(),
                r#"{"op":"blur_search"}"#.to_string(),
            ]
        );
        assert!(renderer.drain().next().is_none());
    }
}
