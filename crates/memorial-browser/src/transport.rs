use std::sync::Arc;

use rand::Rng;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

use memorial_core::debounce::Debouncer;
use memorial_core::model::Record;
use memorial_core::presenter::Presenter;
use memorial_core::session::Session;
use memorial_core::story::StoryFormatter;

use crate::config::Config;
use crate::error::AppError;
use crate::protocol::{ClientEvent, JsonRenderer};

/// Everything needed to start a new session. Cheap to clone.
#[derive(Clone)]
pub struct SessionFactory {
    records: Arc<[Record]>,
    formatter: StoryFormatter,
    config: Config,
}

impl SessionFactory {
    pub fn new(records: Arc<[Record]>, config: Config) -> Self {
        let formatter = StoryFormatter::new(config.cutoff_phrases.iter().cloned());
        Self {
            records,
            formatter,
            config,
        }
    }

    pub fn records(&self) -> &Arc<[Record]> {
        &self.records
    }

    pub fn suggestion_limit(&self) -> usize {
        self.config.suggestion_limit
    }

    pub fn presenter(&self) -> Presenter {
        Presenter::new(
            Arc::clone(&self.records),
            self.formatter.clone(),
            self.config.suggestion_limit,
        )
    }

    pub fn session(&self) -> Session {
        Session::new(
            self.presenter(),
            Debouncer::new(self.config.search_debounce),
        )
    }
}

/// Drive one session until the reader hits EOF.
pub async fn run_session<G, R, W>(
    mut session: Session<G>,
    reader: R,
    mut writer: W,
) -> Result<(), AppError>
where
    G: Rng,
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut lines = BufReader::new(reader).lines();
    let mut renderer = JsonRenderer::default();

    loop {
        let deadline = session.deadline();
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else {
                    debug!("session input closed");
                    break;
                };
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                match serde_json::from_str::<ClientEvent>(line) {
                    Ok(event) => session.handle(event.into(), Instant::now(), &mut renderer),
                    Err(e) => {
                        warn!(error = %e, line, "skipping malformed event");
                        continue;
                    }
                }
            }
            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                session.poll(Instant::now(), &mut renderer);
            }
        }

        for op in renderer.drain() {
            let mut json = serde_json::to_vec(&op)?;
            json.push(b'\n');
            writer.write_all(&json).await?;
        }
        writer.flush().await?;
    }
    Ok(())
}

pub async fn serve_stdio(factory: SessionFactory) -> Result<(), AppError> {
    info!("session ready, serving on stdio");
    run_session(factory.session(), tokio::io::stdin(), tokio::io::stdout()).await?;
    info!("stdio session closed");
    Ok(())
}

pub async fn serve_tcp(factory: SessionFactory, addr: &str) -> Result<(), AppError> {
    let listener = TcpListener::bind(addr).await?;
    info!(listen_addr = %addr, "serving sessions on TCP");
    loop {
        let (stream, peer) = listener.accept().await?;
        let session = factory.session();
        tokio::spawn(async move {
            info!(peer = %peer, "visitor connected");
            let (reader, writer) = stream.into_split();
            if let Err(e) = run_session(session, reader, writer).await {
                error!(peer = %peer, error = %e, "session failed");
            }
            info!(peer = %peer, "visitor disconnected");
        });
    }
}
