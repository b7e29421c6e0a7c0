use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// Missing file, or a name that does not resolve inside the documents
    /// directory.
    #[error("document not found: {0}")]
    NotFound(String),

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render document: {0}")]
    Render(String),

    #[error("invalid documents directory pattern: {0}")]
    Pattern(#[from] glob::PatternError),
}
