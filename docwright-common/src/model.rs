use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ValidationError;
use crate::template::TemplateName;

/// Checks that serde cannot express, run after deserialization.
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// Parses a JSON value into a request type and validates it.
///
/// REST bodies and MCP tool arguments both go through here.
pub fn parse_request<T>(value: Value) -> Result<T, ValidationError>
where
    T: DeserializeOwned + Validate,
{
    if !value.is_object() {
        return Err(ValidationError::NotAnObject);
    }
    let request: T =
        serde_json::from_value(value).map_err(|e| ValidationError::Malformed(e.to_string()))?;
    request.validate()?;
    Ok(request)
}

fn default_markdown() -> bool {
    true
}

/// Create a document from text or Markdown content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct DocumentRequest {
    /// Document title
    pub title: String,
    /// Document content (Markdown unless `markdown` is false)
    pub content: String,
    /// Document author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Document template
    #[serde(default)]
    pub template: TemplateName,
    /// Interpret headings, lists and emphasis markers in the content
    #[serde(default = "default_markdown")]
    pub markdown: bool,
}

impl Validate for DocumentRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyField("title"));
        }
        if self.content.trim().is_empty() {
            return Err(ValidationError::EmptyField("content"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
            Role::System => "System",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ChatMessage {
    pub role: Role,
    /// Message text (`content` is accepted as well)
    #[serde(alias = "content")]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

impl ChatMessage {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
            timestamp: None,
        }
    }
}

/// How a chat transcript is laid out in the document body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ChatFormatStyle {
    #[default]
    Conversation,
    Summary,
    Report,
}

/// Export a chat transcript as a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ChatExportRequest {
    /// Chat messages in conversation order
    pub messages: Vec<ChatMessage>,
    /// Chat conversation title
    #[serde(default, alias = "chat_title", skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Document author
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Format style for the document
    #[serde(default)]
    pub format_style: ChatFormatStyle,
}

impl ChatExportRequest {
    pub const DEFAULT_TITLE: &'static str = "Chat Conversation";

    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(Self::DEFAULT_TITLE)
    }
}

impl Validate for ChatExportRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        match &self.title {
            Some(title) if title.trim().is_empty() => Err(ValidationError::EmptyField("title")),
            _ => Ok(()),
        }
    }
}
