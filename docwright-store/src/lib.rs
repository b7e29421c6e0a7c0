pub mod error;
pub mod model;
pub mod render;
pub mod repository;
pub mod service;

use std::path::Path;

use chrono_tz::Tz;
use log::info;

pub use error::StoreError;
pub use model::DocumentRecord;
pub use repository::DocumentRepository;
pub use service::{DocumentService, ErrorClass, ServiceError};

/// Makes sure the documents directory exists and opens a repository on it.
pub async fn initialize_store(documents_dir: &Path, timezone: Tz) -> Result<DocumentRepository, StoreError> {
    info!("Using documents directory {}", documents_dir.display());
    if tokio::fs::try_exists(documents_dir).await.unwrap_or(false) {
        info!("Documents directory '{}' already exists.", documents_dir.display());
    } else {
        info!("Creating documents directory '{}'.", documents_dir.display());
        tokio::fs::create_dir_all(documents_dir)
            .await
            .map_err(|source| StoreError::Write {
                path: documents_dir.to_path_buf(),
                source,
            })?;
        info!("Documents directory '{}' created successfully.", documents_dir.display());
    }
    Ok(DocumentRepository::new(documents_dir, timezone))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_initialize_store_creates_directory() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a").join("documents");

        let repo = initialize_store(&nested, Tz::UTC).await.unwrap();
        assert!(nested.is_dir());
        assert_eq!(repo.root(), nested.as_path());

        // 二回目は既存ディレクトリをそのまま使う
        initialize_store(&nested, Tz::UTC).await.unwrap();
    }
}
