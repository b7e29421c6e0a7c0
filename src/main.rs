use anyhow::{Context, Result};
use docwright_api::{AppState, serve};
use docwright_common::{SERVICE_NAME, Settings};
use docwright_store::{DocumentService, initialize_store};
use log::{error, info};
use tokio::net::TcpListener;

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
    }
    info!("Shutdown signal received.");
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env の読み込みとログ初期化
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = Settings::from_env().context("Invalid configuration")?;
    info!("Starting {SERVICE_NAME} (timezone {})...", settings.timezone);

    // 文書ディレクトリを用意してサービスを組み立てる
    let repository = initialize_store(&settings.documents_dir, settings.timezone)
        .await
        .context("Failed to prepare documents directory")?;
    let service = DocumentService::new(repository, settings.default_author.clone());

    // Ctrl-C まで HTTP を提供
    let address = settings.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;

    serve(listener, AppState::new(service), shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("{SERVICE_NAME} stopped.");
    Ok(())
}
