use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, FixedOffset, Utc};
use chrono_tz::Tz;
use docwright_common::{Instruction, LayoutDirectives};
use glob::glob;
use log::{debug, info, warn};
use mockable::{Clock, DefaultClock};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

use crate::error::StoreError;
use crate::model::{DocumentMeta, DocumentRecord, download_url};
use crate::render::{DocumentHeader, render_document};

pub const DOCX_EXTENSION: &str = ".docx";
const SIDECAR_EXTENSION: &str = ".json";
const MAX_SLUG_LEN: usize = 50;
const FALLBACK_SLUG: &str = "document";
/// Upper bound on `-N` suffixes tried for one slug within one second.
const MAX_SUFFIX: u32 = 1000;

/// Filesystem-backed document registry rooted at one directory.
#[derive(Clone)]
pub struct DocumentRepository {
    root: PathBuf,
    timezone: Tz,
    clock: Arc<dyn Clock + Send + Sync>,
}

impl DocumentRepository {
    pub fn new(root: impl Into<PathBuf>, timezone: Tz) -> Self {
        Self::with_clock(root, timezone, Arc::new(DefaultClock))
    }

    pub fn with_clock(
        root: impl Into<PathBuf>,
        timezone: Tz,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        Self {
            root: root.into(),
            timezone,
            clock,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Renders the instructions and writes them under a fresh, unique name.
    pub async fn create(
        &self,
        header: DocumentHeader,
        instructions: Vec<Instruction>,
        layout: LayoutDirectives,
    ) -> Result<DocumentRecord, StoreError> {
        let now = self.clock.utc();
        let created_at = now.with_timezone(&self.timezone).fixed_offset();
        let created_label = created_at.format("%B %d, %Y at %I:%M %p").to_string();

        // 描画は CPU 処理なのでブロッキング用スレッドで行う
        let render_header = header.clone();
        let bytes = tokio::task::spawn_blocking(move || {
            render_document(&render_header, &created_label, &instructions, &layout)
        })
        .await
        .map_err(|e| StoreError::Render(e.to_string()))??;

        let (filename, path) = self.write_unique(&slugify(&header.title), now, &bytes).await?;

        let meta = DocumentMeta {
            title: header.title.clone(),
            author: header.author.clone(),
            template: header.template,
            created_at,
        };
        // メタデータが書けなければ本体も消して失敗扱い
        if let Err(e) = self.write_sidecar(&path, &meta).await {
            let _ = fs::remove_file(&path).await;
            return Err(e);
        }

        info!("Created document {filename} ({} bytes)", bytes.len());
        Ok(DocumentRecord {
            download_url: download_url(&filename),
            filename,
            title: header.title,
            author: header.author,
            template: header.template,
            created_at,
            size_bytes: bytes.len() as u64,
            path,
        })
    }

    /// Reserves `<slug>_<timestamp>[-N].docx` with create-new semantics and
    /// writes the bytes into it.
    async fn write_unique(
        &self,
        slug: &str,
        now: DateTime<Utc>,
        bytes: &[u8],
    ) -> Result<(String, PathBuf), StoreError> {
        let stamp = now.format("%Y%m%dT%H%M%SZ").to_string();
        for attempt in 1..=MAX_SUFFIX {
            let filename = if attempt == 1 {
                format!("{slug}_{stamp}{DOCX_EXTENSION}")
            } else {
                format!("{slug}_{stamp}-{attempt}{DOCX_EXTENSION}")
            };
            let path = self.root.join(&filename);

            let mut file = match OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("{filename} already taken, trying next suffix");
                    continue;
                }
                Err(source) => return Err(StoreError::Write { path, source }),
            };

            let written = async {
                file.write_all(bytes).await?;
                file.flush().await
            }
            .await;
            if let Err(source) = written {
                drop(file);
                let _ = fs::remove_file(&path).await;
                return Err(StoreError::Write { path, source });
            }
            return Ok((filename, path));
        }

        Err(StoreError::Write {
            path: self.root.join(format!("{slug}_{stamp}{DOCX_EXTENSION}")),
            source: std::io::Error::new(
                ErrorKind::AlreadyExists,
                "no free filename left for this second",
            ),
        })
    }

    async fn write_sidecar(&self, path: &Path, meta: &DocumentMeta) -> Result<(), StoreError> {
        let sidecar = sidecar_path(path);
        let json = serde_json::to_vec_pretty(meta).map_err(|e| StoreError::Write {
            path: sidecar.clone(),
            source: e.into(),
        })?;
        fs::write(&sidecar, json)
            .await
            .map_err(|source| StoreError::Write {
                path: sidecar,
                source,
            })
    }

    /// All documents, newest first. Ties are ordered by filename, descending.
    pub async fn list(&self) -> Result<Vec<DocumentRecord>, StoreError> {
        let root = self.root.to_string_lossy();
        let pattern = format!("{}/*{DOCX_EXTENSION}", glob::Pattern::escape(&root));
        let paths: Vec<PathBuf> = glob(&pattern)?.filter_map(Result::ok).collect();

        let mut records = Vec::with_capacity(paths.len());
        for path in paths {
            if let Some(record) = self.load_record(&path).await? {
                records.push(record);
            }
        }
        records.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.filename.cmp(&a.filename))
        });
        Ok(records)
    }

    /// `None` when the file vanished between the directory scan and the stat.
    async fn load_record(&self, path: &Path) -> Result<Option<DocumentRecord>, StoreError> {
        let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
            warn!("Skipping non UTF-8 file name: {path:?}");
            return Ok(None);
        };
        let metadata = match fs::metadata(path).await {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StoreError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let meta = match fs::read(sidecar_path(path)).await {
            Ok(bytes) => serde_json::from_slice::<DocumentMeta>(&bytes)
                .inspect_err(|e| warn!("Ignoring unreadable metadata for {filename}: {e}"))
                .ok(),
            Err(_) => None,
        };

        let (title, author, template, created_at) = match meta {
            Some(meta) => (meta.title, meta.author, meta.template, meta.created_at),
            None => {
                let stamp = metadata
                    .created()
                    .or_else(|_| metadata.modified())
                    .unwrap_or(SystemTime::UNIX_EPOCH);
                (
                    title_from_filename(filename),
                    None,
                    None,
                    self.localize(DateTime::<Utc>::from(stamp)),
                )
            }
        };

        Ok(Some(DocumentRecord {
            filename: filename.to_string(),
            title,
            author,
            template,
            created_at,
            size_bytes: metadata.len(),
            path: path.to_path_buf(),
            download_url: download_url(filename),
        }))
    }

    pub async fn fetch(&self, filename: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.resolve(filename)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StoreError::NotFound(filename.to_string()))
            }
            Err(source) => Err(StoreError::Read { path, source }),
        }
    }

    /// Not idempotent: deleting a name twice reports `NotFound` the second time.
    pub async fn delete(&self, filename: &str) -> Result<(), StoreError> {
        let path = self.resolve(filename)?;
        match fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StoreError::NotFound(filename.to_string()));
            }
            Err(source) => return Err(StoreError::Write { path, source }),
        }
        if let Err(e) = fs::remove_file(sidecar_path(&path)).await {
            if e.kind() != ErrorKind::NotFound {
                warn!("Failed to remove metadata for {filename}: {e}");
            }
        }
        info!("Deleted document {filename}");
        Ok(())
    }

    fn resolve(&self, filename: &str) -> Result<PathBuf, StoreError> {
        if is_safe_filename(filename) {
            Ok(self.root.join(filename))
        } else {
            warn!("Rejected document name {filename:?}");
            Err(StoreError::NotFound(filename.to_string()))
        }
    }

    fn localize(&self, time: DateTime<Utc>) -> DateTime<FixedOffset> {
        time.with_timezone(&self.timezone).fixed_offset()
    }
}

/// A plain `.docx` name that cannot escape the documents directory.
pub fn is_safe_filename(name: &str) -> bool {
    name.len() > DOCX_EXTENSION.len()
        && name.ends_with(DOCX_EXTENSION)
        && !name.contains(['/', '\\', '\0'])
        && !name.contains("..")
}

/// Lowercase ASCII slug: separators collapse to single dashes, everything
/// else that is not alphanumeric is dropped. At most 50 characters, cut at a
/// word boundary when there is one.
pub fn slugify(title: &str) -> String {
    let mut slug = String::new();
    let mut pending_dash = false;
    let mut cut_mid_word = false;
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                // 区切りと次の語の一文字が入らないなら、語の境界で打ち切る
                if slug.len() + 2 > MAX_SLUG_LEN {
                    break;
                }
                slug.push('-');
            }
            pending_dash = false;
            if slug.len() >= MAX_SLUG_LEN {
                cut_mid_word = true;
                break;
            }
            slug.push(ch.to_ascii_lowercase());
        } else if ch.is_whitespace() || ch == '-' || ch == '_' {
            pending_dash = true;
        }
    }
    // 語の途中で切れたら、直前の区切りまで戻す（一語だけなら長さで切る）
    if cut_mid_word {
        if let Some(boundary) = slug.rfind('-') {
            slug.truncate(boundary);
        }
    }
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

fn title_from_filename(filename: &str) -> String {
    let stem = filename.strip_suffix(DOCX_EXTENSION).unwrap_or(filename);
    let slug = stem.rsplit_once('_').map_or(stem, |(slug, _)| slug);
    slug.replace('-', " ")
}

fn sidecar_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(SIDECAR_EXTENSION);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use docwright_common::{TemplateName, format};
    use tempfile::TempDir;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn local(&self) -> DateTime<Local> {
            self.0.with_timezone(&Local)
        }

        fn utc(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn fixed_repository(dir: &TempDir, secs: i64) -> DocumentRepository {
        let now = Utc.timestamp_opt(secs, 0).unwrap();
        DocumentRepository::with_clock(dir.path(), Tz::UTC, Arc::new(FixedClock(now)))
    }

    fn header(title: &str) -> DocumentHeader {
        DocumentHeader {
            title: title.to_string(),
            author: Some("Tester".to_string()),
            template: Some(TemplateName::Report),
        }
    }

    async fn create(repo: &DocumentRepository, title: &str) -> DocumentRecord {
        repo.create(
            header(title),
            format("# Heading\n\nbody", true),
            TemplateName::Report.layout(),
        )
        .await
        .unwrap()
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Hello, World!"), "hello-world");
        assert_eq!(slugify("  Q3 -- report__final "), "q3-report-final");
        assert_eq!(slugify("日本語"), "document");
        assert_eq!(slugify(&"a".repeat(80)).len(), 50);
        assert_eq!(slugify(&format!("{} b", "a".repeat(49))), "a".repeat(49));
        assert_eq!(
            slugify(&format!("{} b", "a".repeat(48))),
            format!("{}-b", "a".repeat(48))
        );
        assert_eq!(slugify(&format!("{} bcd", "a".repeat(47))), "a".repeat(47));
        assert_eq!(
            slugify(&format!("{} {}", "a".repeat(10), "b".repeat(60))),
            "a".repeat(10)
        );
    }

    #[test]
    fn test_filename_guard() {
        assert!(is_safe_filename("report_20261019T055300Z.docx"));
        assert!(!is_safe_filename("../etc/passwd.docx"));
        assert!(!is_safe_filename("sub/dir.docx"));
        assert!(!is_safe_filename("sub\\dir.docx"));
        assert!(!is_safe_filename("notes.docx.json"));
        assert!(!is_safe_filename(".docx"));
        assert!(!is_safe_filename(""));
    }

    #[tokio::test]
    async fn test_same_second_titles_get_suffixes() {
        let dir = TempDir::new().unwrap();
        let repo = fixed_repository(&dir, 1_700_000_000);

        let first = create(&repo, "Weekly Report").await;
        let second = create(&repo, "Weekly Report").await;
        let third = create(&repo, "Weekly Report").await;

        assert_eq!(first.filename, "weekly-report_20231114T221320Z.docx");
        assert_eq!(second.filename, "weekly-report_20231114T221320Z-2.docx");
        assert_eq!(third.filename, "weekly-report_20231114T221320Z-3.docx");
        assert!(first.size_bytes > 0);
        assert_eq!(first.download_url, format!("/word/download/{}", first.filename));
    }

    #[tokio::test]
    async fn test_fetch_returns_rendered_document() {
        let dir = TempDir::new().unwrap();
        let repo = fixed_repository(&dir, 1_700_000_000);
        let record = create(&repo, "Plan").await;

        let bytes = repo.fetch(&record.filename).await.unwrap();
        assert_eq!(bytes.len() as u64, record.size_bytes);

        let paragraphs = crate::render::tests::paragraphs(&bytes);
        assert!(paragraphs.contains(&(Some("Heading1".to_string()), "Heading".to_string())));
        assert!(paragraphs.iter().any(|(_, text)| text == "body"));
    }

    #[tokio::test]
    async fn test_list_is_newest_first_and_stable() {
        let dir = TempDir::new().unwrap();
        let older = create(&fixed_repository(&dir, 1_700_000_000), "Older").await;
        let newer = create(&fixed_repository(&dir, 1_700_000_100), "Newer").await;

        let repo = fixed_repository(&dir, 1_700_000_200);
        let first = repo.list().await.unwrap();
        let second = repo.list().await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first, vec![newer, older]);
        assert_eq!(first[0].author.as_deref(), Some("Tester"));
        assert_eq!(first[0].template, Some(TemplateName::Report));
    }

    #[tokio::test]
    async fn test_list_without_sidecar_recomputes_from_file() {
        let dir = TempDir::new().unwrap();
        let repo = fixed_repository(&dir, 1_700_000_000);
        std::fs::write(dir.path().join("loose-notes_20200101T000000Z.docx"), b"bytes").unwrap();
        std::fs::write(dir.path().join("ignored.txt"), b"nope").unwrap();

        let records = repo.list().await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].title, "loose notes");
        assert_eq!(records[0].size_bytes, 5);
        assert_eq!(records[0].author, None);
    }

    #[tokio::test]
    async fn test_delete_twice_reports_not_found() {
        let dir = TempDir::new().unwrap();
        let repo = fixed_repository(&dir, 1_700_000_000);
        let record = create(&repo, "Ephemeral").await;

        repo.delete(&record.filename).await.unwrap();
        assert!(!sidecar_path(&record.path).exists());
        assert!(matches!(
            repo.delete(&record.filename).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            repo.fetch(&record.filename).await,
            Err(StoreError::NotFound(_))
        ));
        assert!(repo.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_traversal_names_are_not_found() {
        let dir = TempDir::new().unwrap();
        let repo = fixed_repository(&dir, 1_700_000_000);
        let record = create(&repo, "Secret").await;
        let sidecar = format!("{}.json", record.filename);

        for name in ["../outside.docx", "a/b.docx", sidecar.as_str()] {
            assert!(matches!(
                repo.fetch(name).await,
                Err(StoreError::NotFound(_))
            ));
            assert!(matches!(
                repo.delete(name).await,
                Err(StoreError::NotFound(_))
            ));
        }
        assert_eq!(repo.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_write_failure_is_write_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        let repo = DocumentRepository::new(&missing, Tz::UTC);

        let result = repo
            .create(header("x"), Vec::new(), TemplateName::Standard.layout())
            .await;
        assert!(matches!(result, Err(StoreError::Write { .. })));
    }
}
