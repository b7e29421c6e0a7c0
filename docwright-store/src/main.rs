//! Bulk import: turns every `*.md` and `*.txt` file in a directory into a
//! Word document in the documents directory.

use anyhow::{Context, Result};
use docwright_common::{DocumentRequest, Settings, TemplateName};
use docwright_store::{DocumentRecord, DocumentService, initialize_store};
use glob::glob;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::env;
use std::path::{Path, PathBuf};

// 設定構造体でマジックナンバーを排除
#[derive(Debug, Clone)]
struct ImportConfig {
    source_dir: PathBuf,
    template: TemplateName,
    author: Option<String>,
}

impl ImportConfig {
    fn from_env() -> Result<Self> {
        let template = match env::var("IMPORT_TEMPLATE") {
            Ok(raw) => raw
                .parse()
                .with_context(|| format!("Invalid IMPORT_TEMPLATE '{raw}'"))?,
            Err(_) => TemplateName::default(),
        };
        Ok(Self {
            source_dir: PathBuf::from(env::var("IMPORT_DIR").unwrap_or_else(|_| "data".to_string())),
            template,
            author: env::var("IMPORT_AUTHOR").ok(),
        })
    }
}

#[derive(Debug, Default)]
struct ImportSummary {
    created: usize,
    skipped: usize,
    failed: usize,
}

// 対象ファイルの一覧（Markdown とプレーンテキスト）
fn source_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let base = glob::Pattern::escape(&dir.to_string_lossy());
    let mut paths = ["*.md", "*.txt"]
        .iter()
        .flat_map(|pattern| {
            glob(&format!("{base}/{pattern}"))
                .context("Failed to read glob pattern")
                .into_iter()
                .flatten()
        })
        .collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect file paths")?;
    paths.sort();
    Ok(paths)
}

// 一ファイル分の変換。空のファイルは None
async fn import_file(
    service: &DocumentService,
    path: &Path,
    config: &ImportConfig,
) -> Result<Option<DocumentRecord>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    if content.trim().is_empty() {
        warn!("Skipping empty file: {}", path.display());
        return Ok(None);
    }

    let title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("untitled")
        .to_string();
    // .md だけ Markdown として解釈し、.txt はそのまま段落にする
    let markdown = path.extension().is_some_and(|ext| ext == "md");

    let record = service
        .create_document(DocumentRequest {
            title,
            content,
            author: config.author.clone(),
            template: config.template,
            markdown,
        })
        .await
        .with_context(|| format!("Failed to convert {}", path.display()))?;
    Ok(Some(record))
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env を読み込み、ログを初期化（RUST_LOG 未設定なら info）
    dotenvy::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // サービス共通の設定と、取り込み専用の設定
    let settings = Settings::from_env()?;
    let config = ImportConfig::from_env()?;

    // 出力先の文書ディレクトリを用意
    let repository = initialize_store(&settings.documents_dir, settings.timezone).await?;
    let service = DocumentService::new(repository, settings.default_author.clone());

    // 取り込み対象を列挙。無ければ何もせず終了
    let files = source_files(&config.source_dir)?;
    if files.is_empty() {
        warn!("No documents found in '{}'", config.source_dir.display());
        return Ok(());
    }
    info!("Found {} files to import.", files.len());

    // 進捗バーの設定
    let progress = ProgressBar::new(files.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}")
            .context("Invalid progress bar template")?,
    );

    // 一件ずつ変換。失敗しても残りは続ける
    let mut summary = ImportSummary::default();
    for path in &files {
        progress.set_message(path.display().to_string());
        match import_file(&service, path, &config).await {
            Ok(Some(record)) => {
                info!("{} -> {}", path.display(), record.filename);
                summary.created += 1;
            }
            Ok(None) => summary.skipped += 1,
            Err(e) => {
                error!("{e:#}");
                summary.failed += 1;
            }
        }
        progress.inc(1);
    }
    progress.finish_with_message("done");

    println!(
        "Import completed. created: {}, skipped: {}, failed: {}",
        summary.created, summary.skipped, summary.failed
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Tz;
    use docwright_store::DocumentRepository;
    use std::fs;
    use tempfile::TempDir;

    fn config(source: &Path) -> ImportConfig {
        ImportConfig {
            source_dir: source.to_path_buf(),
            template: TemplateName::Memo,
            author: Some("Importer".to_string()),
        }
    }

    fn service(target: &TempDir) -> DocumentService {
        DocumentService::new(DocumentRepository::new(target.path(), Tz::UTC), "Word MCP Server")
    }

    #[test]
    fn test_source_files_picks_markdown_and_text() {
        let source = TempDir::new().unwrap();
        for name in ["b.txt", "a.md", "c.docx", "d.json"] {
            fs::write(source.path().join(name), "x").unwrap();
        }

        let files = source_files(source.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.md", "b.txt"]);
    }

    #[tokio::test]
    async fn test_import_file_creates_document_from_stem() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let path = source.path().join("release-notes.md");
        fs::write(&path, "# Notes\n\n- first").unwrap();

        let record = import_file(&service(&target), &path, &config(source.path()))
            .await
            .unwrap()
            .expect("non-empty file should be imported");
        assert_eq!(record.title, "release-notes");
        assert_eq!(record.author.as_deref(), Some("Importer"));
        assert_eq!(record.template, Some(TemplateName::Memo));
        assert!(record.path.starts_with(target.path()));
    }

    #[tokio::test]
    async fn test_import_file_skips_empty_and_reports_missing() {
        let source = TempDir::new().unwrap();
        let target = TempDir::new().unwrap();
        let service = service(&target);
        let config = config(source.path());

        let blank = source.path().join("blank.txt");
        fs::write(&blank, "  \n\n").unwrap();
        assert!(import_file(&service, &blank, &config).await.unwrap().is_none());

        let missing = source.path().join("missing.md");
        assert!(import_file(&service, &missing, &config).await.is_err());
        assert!(service.list_documents().await.unwrap().is_empty());
    }
}
