/// HTTP surface: a server-rendered memorial page plus the suggestion API.
///
/// Each request replays the visitor's state (filter, search text, picked
/// suggestion) through a fresh presenter and renders the resulting slots.
use std::fmt::Write as _;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::info;

use memorial_core::error::CoreError;
use memorial_core::model::{Filter, Tag};
use memorial_core::presenter::{
    EmptyAction, EmptyState, Event, RecordView, Renderer, SessionState,
};
use memorial_core::suggest::Suggestion;
use memorial_core::text::Segment;

use crate::error::AppError;
use crate::transport::SessionFactory;

const MAX_API_LIMIT: usize = 50;

#[derive(Debug, Default, Deserialize)]
pub struct PageParams {
    pub filter: Option<String>,
    pub q: Option<String>,
    pub pick: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SuggestParams {
    pub q: Option<String>,
    pub filter: Option<String>,
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct SuggestResponse {
    pub query: String,
    pub filter: Filter,
    pub suggestions: Vec<Suggestion>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub records: usize,
}

pub fn router(factory: SessionFactory) -> Router {
    Router::new()
        .route("/", get(page))
        .route("/api/suggestions", get(suggestions))
        .route("/healthz", get(health))
        .with_state(factory)
}

pub async fn serve_http(factory: SessionFactory, addr: &str) -> Result<(), AppError> {
    let listener = TcpListener::bind(addr).await?;
    info!(listen_addr = %addr, "serving memorial page on HTTP");
    axum::serve(listener, router(factory)).await?;
    Ok(())
}

fn parse_filter(raw: Option<&str>) -> Result<Filter, (StatusCode, String)> {
    raw.unwrap_or("all")
        .parse()
        .map_err(|e: CoreError| (StatusCode::BAD_REQUEST, e.to_string()))
}

async fn page(
    State(factory): State<SessionFactory>,
    Query(params): Query<PageParams>,
) -> Result<Html<String>, (StatusCode, String)> {
    let filter = parse_filter(params.filter.as_deref())?;
    let query = params.q.unwrap_or_default();

    let mut presenter = factory.presenter();
    let mut renderer = HtmlRenderer::default();
    let mut state = SessionState {
        filter,
        ..Default::default()
    };

    let mut events = vec![Event::Load];
    if !query.trim().is_empty() {
        events.push(Event::SearchInput(query.clone()));
        events.push(Event::SearchSettled(query.clone()));
        if let Some(position) = params.pick {
            events.push(Event::PickSuggestion(position));
        }
    }
    for event in events {
        state = presenter.dispatch(state, event, &mut renderer);
    }

    Ok(Html(renderer.into_page(&state)))
}

async fn suggestions(
    State(factory): State<SessionFactory>,
    Query(params): Query<SuggestParams>,
) -> Result<Json<SuggestResponse>, (StatusCode, String)> {
    let filter = parse_filter(params.filter.as_deref())?;
    let query = params.q.unwrap_or_default();
    let limit = params
        .limit
        .unwrap_or_else(|| factory.suggestion_limit())
        .clamp(1, MAX_API_LIMIT);

    let suggestions = factory.presenter().suggest_limited(filter, &query, limit);
    Ok(Json(SuggestResponse {
        query,
        filter,
        suggestions,
    }))
}

async fn health(State(factory): State<SessionFactory>) -> Json<HealthResponse> {
    let records = factory.records().len();
    Json(HealthResponse {
        status: if records > 0 { "ok" } else { "degraded" },
        records,
    })
}

/// Collects slot contents, then lays them out as one HTML document.
#[derive(Debug, Default)]
pub struct HtmlRenderer {
    filter: Filter,
    search_text: String,
    record: Option<RecordView>,
    suggestions: Vec<Suggestion>,
    selected: Option<usize>,
    empty: Option<EmptyState>,
    global_error: Option<String>,
}

impl Renderer for HtmlRenderer {
    fn show_record(&mut self, view: &RecordView) -> Result<(), CoreError> {
        self.record = Some(view.clone());
        self.empty = None;
        self.global_error = None;
        Ok(())
    }

    fn show_suggestions(
        &mut self,
        suggestions: &[Suggestion],
        selected: Option<usize>,
    ) -> Result<(), CoreError> {
        self.suggestions = suggestions.to_vec();
        self.selected = selected;
        Ok(())
    }

    fn hide_suggestions(&mut self) -> Result<(), CoreError> {
        self.suggestions.clear();
        self.selected = None;
        Ok(())
    }

    fn show_empty_state(&mut self, panel: &EmptyState) -> Result<(), CoreError> {
        self.record = None;
        self.empty = Some(panel.clone());
        Ok(())
    }

    fn show_global_error(&mut self, message: &str) -> Result<(), CoreError> {
        self.record = None;
        self.empty = None;
        self.global_error = Some(message.to_string());
        Ok(())
    }

    fn set_active_filter(&mut self, filter: Filter) -> Result<(), CoreError> {
        self.filter = filter;
        Ok(())
    }

    fn set_search_text(&mut self, text: &str) -> Result<(), CoreError> {
        self.search_text = text.to_string();
        Ok(())
    }

    fn blur_search(&mut self) -> Result<(), CoreError> {
        Ok(())
    }
}

impl HtmlRenderer {
    pub fn into_page(self, state: &SessionState) -> String {
        let mut html = String::with_capacity(4096);
        let search_text = if self.search_text.is_empty() {
            state.search_term.as_str()
        } else {
            self.search_text.as_str()
        };

        html.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>In Memoriam</title></head>\n<body>\n");

        html.push_str("<nav class=\"filters\">\n");
        let all = std::iter::once(Filter::All).chain(Tag::ALL.into_iter().map(Filter::Tag));
        for filter in all {
            let label = match filter {
                Filter::All => "All",
                Filter::Tag(tag) => tag.label(),
            };
            let class = if filter == self.filter {
                "filter-tag active"
            } else {
                "filter-tag"
            };
            let _ = writeln!(
                html,
                "<a class=\"{class}\" data-filter=\"{key}\" href=\"/?filter={key}\">{label}</a>",
                key = filter.as_str(),
                label = escape(label),
            );
        }
        html.push_str("</nav>\n");

        let _ = writeln!(
            html,
            "<form action=\"/\" method=\"get\"><input type=\"hidden\" name=\"filter\" value=\"{}\"><input id=\"search-box\" name=\"q\" value=\"{}\" autocomplete=\"off\"></form>",
            self.filter.as_str(),
            escape(search_text),
        );

        if !self.suggestions.is_empty() {
            html.push_str("<ul id=\"suggestions\">\n");
            for (position, suggestion) in self.suggestions.iter().enumerate() {
                let class = if Some(position) == self.selected {
                    " class=\"selected\""
                } else {
                    ""
                };
                let _ = write!(
                    html,
                    "<li{class}><a href=\"/?filter={}&amp;q={}&amp;pick={position}\">",
                    self.filter.as_str(),
                    urlencoding::encode(search_text),
                );
                push_segments(&mut html, &suggestion.segments);
                if let Some(detail) = &suggestion.detail {
                    let _ = write!(html, " <small>{}</small>", escape(detail));
                }
                html.push_str("</a></li>\n");
            }
            html.push_str("</ul>\n");
        }

        if let Some(message) = &self.global_error {
            let _ = writeln!(
                html,
                "<section id=\"global-error\" role=\"alert\"><h2>Data unavailable</h2><p>{}</p></section>",
                escape(message)
            );
        } else if let Some(panel) = &self.empty {
            push_empty_state(&mut html, panel, self.filter);
        } else if let Some(record) = &self.record {
            push_record(&mut html, record);
        }

        html.push_str("</body>\n</html>\n");
        html
    }
}

fn push_record(html: &mut String, record: &RecordView) {
    let _ = writeln!(
        html,
        "<article id=\"victim\">\n<img id=\"victim-image\" src=\"{}\" alt=\"{}\">\n<h1 id=\"victim-name\">{}</h1>\n<p id=\"victim-bio\">{}</p>",
        escape(&record.image),
        escape(&record.image_alt),
        escape(&record.name_line),
        escape(&record.bio),
    );

    html.push_str("<div id=\"victim-story\"><div class=\"story-content\">\n");
    if let Some(lead) = record.story.lead() {
        html.push_str("<div class=\"first-paragraph\">");
        push_paragraph(html, lead);
        html.push_str("</div>\n");
    }
    let remaining = record.story.remaining();
    if !remaining.is_empty() {
        html.push_str("<div class=\"remaining-paragraphs\">");
        for paragraph in remaining {
            push_paragraph(html, paragraph);
        }
        html.push_str("</div>\n");
    }
    html.push_str("</div></div>\n");

    let _ = writeln!(
        html,
        "<a id=\"expand-button\" href=\"{}\">Read the full story</a>\n</article>",
        escape(&record.url)
    );
}

fn push_paragraph(html: &mut String, lines: &[String]) {
    html.push_str("<p>");
    let escaped: Vec<String> = lines.iter().map(|l| escape(l)).collect();
    html.push_str(&escaped.join("<br>"));
    html.push_str("</p>");
}

fn push_segments(html: &mut String, segments: &[Segment]) {
    for segment in segments {
        if segment.matched {
            let _ = write!(html, "<mark>{}</mark>", escape(&segment.text));
        } else {
            html.push_str(&escape(&segment.text));
        }
    }
}

fn push_empty_state(html: &mut String, panel: &EmptyState, filter: Filter) {
    let _ = writeln!(
        html,
        "<section id=\"empty-state\"><p>{}</p>",
        escape(&panel.message)
    );
    for action in &panel.actions {
        let (href, label) = match action {
            EmptyAction::ClearSearch => (format!("/?filter={}", filter.as_str()), "Clear search"),
            EmptyAction::ShowAnother => (format!("/?filter={}", filter.as_str()), "Show another"),
            EmptyAction::ShowAll => ("/".to_string(), "Show everyone"),
        };
        let _ = writeln!(html, "<a class=\"empty-action\" href=\"{href}\">{label}</a>");
    }
    html.push_str("</section>\n");
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use memorial_core::model::{RawRecord, Record};
    use memorial_core::tagger::tag_records;

    use super::*;
    use crate::config::Config;

    fn factory(records: Vec<RawRecord>) -> SessionFactory {
        let records: Arc<[Record]> = tag_records(records).into();
        let config = Config {
            data_path: "unused.json".to_string(),
            tcp_addr: None,
            http_addr: None,
            suggestion_limit: 8,
            search_debounce: std::time::Duration::from_millis(200),
            cutoff_phrases: vec!["Share this story".to_string()],
        };
        SessionFactory::new(records, config)
    }

    fn noa() -> RawRecord {
        RawRecord {
            name: "Noa <Levi>".into(),
            age: Some(21),
            bio: "soldier from Tel Aviv".into(),
            story: "First.\\n\\nSecond\\nline.\\n\\nShare this story".into(),
            image: "img/noa.jpg".into(),
            url: "https://example.org/noa".into(),
        }
    }

    #[tokio::test]
    async fn page_renders_record_slots() {
        let Html(body) = page(State(factory(vec![noa()])), Query(PageParams::default()))
            .await
            .unwrap();
        assert!(body.contains("<h1 id=\"victim-name\">Noa &lt;Levi&gt;, 21</h1>"));
        assert!(body.contains("<div class=\"first-paragraph\"><p>First.</p></div>"));
        assert!(body.contains("<div class=\"remaining-paragraphs\"><p>Second<br>line.</p></div>"));
        assert!(!body.contains("Share this story"));
        assert!(body.contains("class=\"filter-tag active\" data-filter=\"all\""));
    }

    #[tokio::test]
    async fn page_shows_empty_state_for_unmatched_search() {
        let params = PageParams {
            filter: Some("soldiers".into()),
            q: Some("zzz".into()),
            pick: None,
        };
        let Html(body) = page(State(factory(vec![noa()])), Query(params)).await.unwrap();
        assert!(body.contains("id=\"empty-state\""));
        assert!(body.contains("No results for &quot;zzz&quot; in Soldiers"));
        assert!(!body.contains("id=\"victim-name\""));
    }

    #[tokio::test]
    async fn page_with_no_data_shows_global_error() {
        let Html(body) = page(State(factory(Vec::new())), Query(PageParams::default()))
            .await
            .unwrap();
        assert!(body.contains("id=\"global-error\""));
    }

    #[tokio::test]
    async fn bad_filter_is_rejected() {
        let params = PageParams {
            filter: Some("pilots".into()),
            ..Default::default()
        };
        let err = page(State(factory(vec![noa()])), Query(params)).await.unwrap_err();
        assert_eq!(err.0, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn suggestion_api_highlights_matches() {
        let params = SuggestParams {
            q: Some("noa".into()),
            ..Default::default()
        };
        let Json(response) = suggestions(State(factory(vec![noa()])), Query(params))
            .await
            .unwrap();
        assert_eq!(response.suggestions.len(), 1);
        assert_eq!(response.suggestions[0].score, 90);
        assert!(response.suggestions[0].segments[0].matched);
        assert_eq!(response.suggestions[0].detail.as_deref(), Some("21"));
    }

    #[tokio::test]
    async fn suggestion_api_defaults_to_configured_limit() {
        let records: Vec<RawRecord> = (0..12)
            .map(|i| RawRecord {
                name: format!("Noa {i:02}"),
                ..Default::default()
            })
            .collect();
        let params = SuggestParams {
            q: Some("noa".into()),
            ..Default::default()
        };
        let Json(response) = suggestions(State(factory(records)), Query(params))
            .await
            .unwrap();
        assert_eq!(response.suggestions.len(), 8);
    }

    #[tokio::test]
    async fn suggestion_links_encode_the_query() {
        let records = vec![RawRecord {
            name: "Zoë Ben&Ami".into(),
            ..Default::default()
        }];
        let params = PageParams {
            q: Some("Zoë Ben&".into()),
            ..Default::default()
        };
        let Html(body) = page(State(factory(records)), Query(params)).await.unwrap();
        assert!(body.contains("href=\"/?filter=all&amp;q=Zo%C3%AB%20Ben%26&amp;pick=0\""));
    }

    #[test]
    fn escape_html() {
        assert_eq!(escape("<a href='x'>"), "&lt;a href=&#39;x&#39;&gt;");
    }
}
