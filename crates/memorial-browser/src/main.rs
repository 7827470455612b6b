mod config;
mod error;
mod http;
mod protocol;
mod transport;

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use memorial_core::dataset::load_dataset;
use memorial_core::model::Record;
use memorial_core::tagger::tag_records;

use config::Config;
use transport::SessionFactory;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout belongs to the session protocol
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting memorial-browser");

    let config = Config::from_env()?;
    info!(
        data_path = %config.data_path,
        tcp = config.tcp_addr.is_some(),
        http = config.http_addr.is_some(),
        suggestion_limit = config.suggestion_limit,
        debounce_ms = config.search_debounce.as_millis() as u64,
        "configuration loaded"
    );

    // A missing or broken dataset still serves: sessions show the global error.
    let records: Arc<[Record]> = match load_dataset(&config.data_path()) {
        Ok(raw) => tag_records(raw).into(),
        Err(e) => {
            error!(error = %e, "victim data unavailable");
            Arc::from(Vec::new())
        }
    };
    info!(records = records.len(), "records tagged");

    let factory = SessionFactory::new(records, config.clone());

    match (config.tcp_addr.as_deref(), config.http_addr.as_deref()) {
        (Some(tcp), Some(http)) => {
            tokio::try_join!(
                transport::serve_tcp(factory.clone(), tcp),
                http::serve_http(factory, http),
            )?;
        }
        (Some(tcp), None) => transport::serve_tcp(factory, tcp).await?,
        (None, Some(http)) => http::serve_http(factory, http).await?,
        (None, None) => transport::serve_stdio(factory).await?,
    }
    info!("memorial-browser shut down");
    Ok(())
}
