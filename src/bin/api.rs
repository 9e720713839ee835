use drafting_assistant::{
    api::start_server,
    config::AppConfig,
    memory::build_transcript_store,
    records::{HttpRecordStore, InMemoryRecordStore, LoggingNavigator, RecordStore},
    session::SessionFactory,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load environment variables
    dotenv::dotenv().ok();

    let config = AppConfig::from_env()?;

    info!("Drafting Assistant - API Server");
    info!("Port: {}", config.port);
    info!("Session idle limit: {}s", config.session_idle.as_secs());

    let records: Arc<dyn RecordStore> = match &config.records_base_url {
        Some(url) => {
            info!("Record backend: {}", url);
            Arc::new(HttpRecordStore::new(url)?)
        }
        None => {
            info!("Record backend: in-memory (DASHBOARD_API_BASE_URL not set)");
            Arc::new(InMemoryRecordStore::new())
        }
    };
    let transcripts = build_transcript_store(config.database_url.as_deref());

    // Routing happens in the client; the server only logs navigation
    let factory = SessionFactory::new(records, Arc::new(LoggingNavigator), transcripts)
        .with_pacing(config.reply_delay, config.menu_delay);

    info!("Starting API server...");
    start_server(factory, config.port, config.session_idle).await?;

    Ok(())
}
