//! HTTP front door: REST routes under `/word` plus the `/mcp` JSON-RPC
//! endpoint, both backed by one [`DocumentService`].

pub mod error;
pub mod handlers;

use std::future::Future;

use axum::Router;
use axum::routing::{delete, get, post};
use docwright_mcp::McpDispatcher;
use docwright_store::DocumentService;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

pub use error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub service: DocumentService,
    pub mcp: McpDispatcher,
}

impl AppState {
    pub fn new(service: DocumentService) -> Self {
        let mcp = McpDispatcher::new(service.clone());
        Self { service, mcp }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::describe))
        .route("/health", get(handlers::health))
        .route("/tools", get(handlers::tools))
        .route("/word/create", post(handlers::create_document))
        .route("/word/create-from-chat", post(handlers::create_from_chat))
        .route("/word/list", get(handlers::list_documents))
        .route("/word/download/{filename}", get(handlers::download_document))
        .route("/word/delete/{filename}", delete(handlers::delete_document))
        .route("/mcp", post(handlers::mcp))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

/// Serves until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(address) = listener.local_addr() {
        info!("HTTP server listening on {address}");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}
