use rand::rngs::StdRng;
use rand::Rng;
use tokio::time::Instant;
use tracing::debug;

use crate::debounce::Debouncer;
use crate::presenter::{Event, Key, Presenter, Renderer, SessionState};

/// One visitor's interaction loop: the presenter, its state, and the
/// debounced search box.
///
/// Transports feed raw events in through `handle` and wake the session at
/// `deadline()` to call `poll`.
pub struct Session<G = StdRng> {
    presenter: Presenter<G>,
    state: SessionState,
    search: Debouncer<String>,
}

impl<G: Rng> Session<G> {
    pub fn new(presenter: Presenter<G>, search: Debouncer<String>) -> Self {
        Self {
            presenter,
            state: SessionState::default(),
            search,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.search.deadline()
    }

    pub fn handle(&mut self, event: Event, now: Instant, renderer: &mut dyn Renderer) {
        match &event {
            Event::SearchInput(text) => {
                self.search.submit(text.clone(), now);
            }
            Event::Key(Key::Enter) => {
                if let Some(text) = self.search.flush() {
                    debug!(query = %text, "flushing pending search on enter");
                    self.step(Event::SearchSettled(text), renderer);
                }
            }
            Event::Key(Key::Escape)
            | Event::ClearSearch
            | Event::SelectFilter(_)
            | Event::PickSuggestion(_) => {
                self.search.cancel();
            }
            _ => {}
        }
        self.step(event, renderer);
    }

    /// Run the debounced search if its quiet period is over.
    pub fn poll(&mut self, now: Instant, renderer: &mut dyn Renderer) {
        if let Some(text) = self.search.take_due(now) {
            self.step(Event::SearchSettled(text), renderer);
        }
    }

    fn step(&mut self, event: Event, renderer: &mut dyn Renderer) {
        let state = std::mem::take(&mut self.state);
        self.state = self.presenter.dispatch(state, event, renderer);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::presenter::tests::{presenter, sample_records, Recording};

    fn session() -> Session {
        Session::new(presenter(sample_records()), Debouncer::default())
    }

    #[tokio::test(start_paused = true)]
    async fn keystroke_burst_runs_one_search() {
        let mut session = session();
        let mut r = Recording::default();
        session.handle(Event::Load, Instant::now(), &mut r);

        for text in ["n", "no", "noa"] {
            session.handle(Event::SearchInput(text.into()), Instant::now(), &mut r);
            tokio::time::advance(Duration::from_millis(60)).await;
            session.poll(Instant::now(), &mut r);
        }
        assert_eq!(r.count("suggestions:"), 0);

        let deadline = session.deadline().expect("search pending");
        tokio::time::sleep_until(deadline).await;
        session.poll(Instant::now(), &mut r);
        session.poll(Instant::now(), &mut r);

        assert_eq!(r.count("suggestions:"), 1);
        assert_eq!(session.state().search_term, "noa");
        let names: Vec<&str> = session
            .state()
            .suggestions
            .iter()
            .map(|s| s.name.as_str())
            .collect();
        assert_eq!(names, vec!["Noa Levi", "Noam Peretz"]);
    }

    #[tokio::test(start_paused = true)]
    async fn enter_flushes_pending_search() {
        let mut session = session();
        let mut r = Recording::default();
        session.handle(Event::Load, Instant::now(), &mut r);
        session.handle(Event::SearchInput("noam".into()), Instant::now(), &mut r);
        session.handle(Event::Key(Key::Enter), Instant::now(), &mut r);

        assert!(session.deadline().is_none());
        assert_eq!(r.calls.last().unwrap(), "record:Noam Peretz");
    }

    #[tokio::test(start_paused = true)]
    async fn clear_search_cancels_pending_search() {
        let mut session = session();
        let mut r = Recording::default();
        session.handle(Event::Load, Instant::now(), &mut r);
        session.handle(Event::SearchInput("noa".into()), Instant::now(), &mut r);
        session.handle(Event::ClearSearch, Instant::now(), &mut r);

        tokio::time::advance(Duration::from_secs(1)).await;
        session.poll(Instant::now(), &mut r);
        assert_eq!(r.count("suggestions:"), 0);
        assert_eq!(session.state().search_term, "");
    }
}
