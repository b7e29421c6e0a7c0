//! The one handler set behind both the REST routes and the MCP tools.

use docwright_common::{
    ChatExportRequest, DocumentRequest, TemplateName, Validate, ValidationError, format,
    format_chat_as,
};
use log::{info, warn};
use thiserror::Error;

use crate::error::StoreError;
use crate::model::DocumentRecord;
use crate::render::DocumentHeader;
use crate::repository::DocumentRepository;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Coarse classification used by the front doors to pick status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    Invalid,
    NotFound,
    Internal,
}

impl ServiceError {
    pub fn class(&self) -> ErrorClass {
        match self {
            ServiceError::Validation(_) => ErrorClass::Invalid,
            ServiceError::Store(StoreError::NotFound(_)) => ErrorClass::NotFound,
            ServiceError::Store(_) => ErrorClass::Internal,
        }
    }
}

#[derive(Clone)]
pub struct DocumentService {
    repository: DocumentRepository,
    default_author: String,
}

impl DocumentService {
    pub fn new(repository: DocumentRepository, default_author: impl Into<String>) -> Self {
        Self {
            repository,
            default_author: default_author.into(),
        }
    }

    pub fn repository(&self) -> &DocumentRepository {
        &self.repository
    }

    fn author_or_default(&self, author: Option<String>) -> String {
        author
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| self.default_author.clone())
    }

    pub async fn create_document(
        &self,
        request: DocumentRequest,
    ) -> Result<DocumentRecord, ServiceError> {
        request.validate().inspect_err(|e| warn!("Rejected document request: {e}"))?;
        info!("Creating Word document: {}", request.title);

        let instructions = format(&request.content, request.markdown);
        let header = DocumentHeader {
            title: request.title.trim().to_string(),
            author: Some(self.author_or_default(request.author)),
            template: Some(request.template),
        };
        Ok(self
            .repository
            .create(header, instructions, request.template.layout())
            .await?)
    }

    /// Chat exports always use the standard layout.
    pub async fn create_from_chat(
        &self,
        request: ChatExportRequest,
    ) -> Result<DocumentRecord, ServiceError> {
        request.validate().inspect_err(|e| warn!("Rejected chat export: {e}"))?;
        info!(
            "Creating document from chat: {} ({} messages)",
            request.display_title(),
            request.messages.len()
        );

        let instructions = format_chat_as(&request.messages, request.format_style);
        let header = DocumentHeader {
            title: request.display_title().trim().to_string(),
            author: Some(self.author_or_default(request.author)),
            template: None,
        };
        Ok(self
            .repository
            .create(header, instructions, TemplateName::Standard.layout())
            .await?)
    }

    pub async fn list_documents(&self) -> Result<Vec<DocumentRecord>, ServiceError> {
        Ok(self.repository.list().await?)
    }

    pub async fn fetch_document(&self, filename: &str) -> Result<Vec<u8>, ServiceError> {
        Ok(self.repository.fetch(filename).await?)
    }

    pub async fn delete_document(&self, filename: &str) -> Result<(), ServiceError> {
        Ok(self.repository.delete(filename).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Tz;
    use docwright_common::{ChatFormatStyle, ChatMessage, Role};
    use tempfile::TempDir;

    fn service(dir: &TempDir) -> DocumentService {
        DocumentService::new(DocumentRepository::new(dir.path(), Tz::UTC), "Word MCP Server")
    }

    fn request(title: &str) -> DocumentRequest {
        DocumentRequest {
            title: title.to_string(),
            content: "# Intro\n\nHello".to_string(),
            author: None,
            template: TemplateName::Memo,
            markdown: true,
        }
    }

    #[tokio::test]
    async fn test_create_document_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let record = service(&dir)
            .create_document(DocumentRequest {
                author: Some("  ".to_string()),
                ..request(" Minutes ")
            })
            .await
            .unwrap();

        assert_eq!(record.title, "Minutes");
        assert_eq!(record.author.as_deref(), Some("Word MCP Server"));
        assert_eq!(record.template, Some(TemplateName::Memo));
        assert!(record.filename.starts_with("minutes_"));
    }

    #[tokio::test]
    async fn test_invalid_request_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let err = service
            .create_document(DocumentRequest {
                content: "\n \n".to_string(),
                ..request("Empty")
            })
            .await
            .unwrap_err();

        assert_eq!(err.class(), ErrorClass::Invalid);
        assert!(service.list_documents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_chat_still_produces_document() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let record = service
            .create_from_chat(ChatExportRequest {
                messages: Vec::new(),
                title: None,
                author: Some("Ops".to_string()),
                format_style: ChatFormatStyle::Conversation,
            })
            .await
            .unwrap();

        assert_eq!(record.title, ChatExportRequest::DEFAULT_TITLE);
        assert_eq!(record.template, None);
        let bytes = service.fetch_document(&record.filename).await.unwrap();
        assert_eq!(bytes.len() as u64, record.size_bytes);
    }

    #[tokio::test]
    async fn test_chat_export_and_not_found_class() {
        let dir = TempDir::new().unwrap();
        let service = service(&dir);
        let record = service
            .create_from_chat(ChatExportRequest {
                messages: vec![
                    ChatMessage::new(Role::User, "Ship it?"),
                    ChatMessage::new(Role::Assistant, "Yes"),
                ],
                title: Some("Release".to_string()),
                author: None,
                format_style: ChatFormatStyle::Report,
            })
            .await
            .unwrap();
        assert_eq!(record.title, "Release");

        service.delete_document(&record.filename).await.unwrap();
        let err = service.delete_document(&record.filename).await.unwrap_err();
        assert_eq!(err.class(), ErrorClass::NotFound);
    }
}
