use std::path::PathBuf;

use chrono::{DateTime, FixedOffset};
use docwright_common::TemplateName;
use serde::{Deserialize, Serialize};

/// Metadata of one stored document. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRecord {
    pub filename: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template: Option<TemplateName>,
    pub created_at: DateTime<FixedOffset>,
    pub size_bytes: u64,
    pub path: PathBuf,
    pub download_url: String,
}

/// Sidecar file stored next to each document (`<filename>.json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct DocumentMeta {
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub template: Option<TemplateName>,
    pub created_at: DateTime<FixedOffset>,
}

pub fn download_url(filename: &str) -> String {
    format!("/word/download/{filename}")
}
