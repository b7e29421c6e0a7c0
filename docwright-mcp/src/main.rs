use anyhow::Result;
use docwright_common::Settings;
use docwright_mcp::DocumentServer;
use docwright_store::{DocumentService, initialize_store};
use rmcp::{ServiceExt, transport::stdio};
use tracing_subscriber::{self, EnvFilter};

/// stdio で MCP クライアントと通信するサーバー
///
/// 提供するツール: create_document, create_document_from_chat,
/// list_documents, delete_document。作成済みの文書はリソースとしても読める
///
/// 使用例: npx @modelcontextprotocol/inspector cargo run -p docwright-mcp
#[tokio::main]
async fn main() -> Result<()> {
    // .env があれば環境変数に読み込む
    dotenvy::dotenv().ok();

    // ログは stdout を汚さないよう stderr に出す（stdout は MCP の通信路）
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    tracing::info!("Starting MCP server on stdio");

    // 設定を読み、文書ディレクトリを用意する
    let settings = Settings::from_env()?;
    let repository = initialize_store(&settings.documents_dir, settings.timezone).await?;
    let server = DocumentServer::new(DocumentService::new(repository, settings.default_author));

    // 標準入出力でサーバーを開始し、クライアントが切断するまで待つ
    let service = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!("MCP server failed to start: {e:?}");
    })?;
    service.waiting().await?;

    tracing::info!("MCP server finished");
    Ok(())
}
