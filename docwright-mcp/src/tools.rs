//! The fixed tool catalog. Each tool carries the schema of its arguments,
//! generated from the same types the arguments are parsed into.

use std::sync::LazyLock;

use docwright_common::{ChatExportRequest, DocumentRequest, Validate, ValidationError};
use schemars::{JsonSchema, schema_for};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    CreateDocument,
    CreateDocumentFromChat,
    ListDocuments,
    DeleteDocument,
}

impl Tool {
    pub const ALL: [Tool; 4] = [
        Tool::CreateDocument,
        Tool::CreateDocumentFromChat,
        Tool::ListDocuments,
        Tool::DeleteDocument,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Tool::CreateDocument => "create_document",
            Tool::CreateDocumentFromChat => "create_document_from_chat",
            Tool::ListDocuments => "list_documents",
            Tool::DeleteDocument => "delete_document",
        }
    }

    /// Also accepts `create_from_chat`, the name older clients use.
    pub fn from_name(name: &str) -> Option<Tool> {
        match name {
            "create_from_chat" => Some(Tool::CreateDocumentFromChat),
            _ => Tool::ALL.into_iter().find(|tool| tool.name() == name),
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Tool::CreateDocument => {
                "Create a Word document from text content with markdown support"
            }
            Tool::CreateDocumentFromChat => "Create a Word document from a chat conversation",
            Tool::ListDocuments => "List all created documents",
            Tool::DeleteDocument => "Delete a Word document by filename",
        }
    }

    pub fn input_schema(self) -> Value {
        let schema = match self {
            Tool::CreateDocument => schema_for!(DocumentRequest),
            Tool::CreateDocumentFromChat => schema_for!(ChatExportRequest),
            Tool::ListDocuments => schema_for!(ListDocumentsArgs),
            Tool::DeleteDocument => schema_for!(DeleteDocumentArgs),
        };
        let mut value = serde_json::to_value(schema).unwrap_or_else(|e| {
            error!("Failed to serialize input schema of {}: {e}", self.name());
            json!({"type": "object"})
        });
        if let Value::Object(map) = &mut value {
            map.remove("$schema");
        }
        value
    }
}

#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct ListDocumentsArgs {}

impl Validate for ListDocumentsArgs {
    fn validate(&self) -> Result<(), ValidationError> {
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DeleteDocumentArgs {
    /// Filename to delete
    pub filename: String,
}

impl Validate for DeleteDocumentArgs {
    fn validate(&self) -> Result<(), ValidationError> {
        if self.filename.trim().is_empty() {
            return Err(ValidationError::EmptyField("filename"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolDefinition {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolsListResult {
    pub tools: Vec<ToolDefinition>,
}

static CATALOG: LazyLock<ToolsListResult> = LazyLock::new(|| ToolsListResult {
    tools: Tool::ALL
        .into_iter()
        .map(|tool| ToolDefinition {
            name: tool.name(),
            description: tool.description(),
            input_schema: tool.input_schema(),
        })
        .collect(),
});

/// Built on first use, never mutated afterwards.
pub fn catalog() -> &'static ToolsListResult {
    &CATALOG
}

static CATALOG_JSON: LazyLock<Value> = LazyLock::new(|| {
    serde_json::to_value(catalog()).unwrap_or_else(|e| {
        // 空の一覧と区別できるよう error を付ける
        error!("Failed to serialize tool catalog: {e}");
        json!({ "tools": [], "error": e.to_string() })
    })
});

/// `{ tools: [...] }` as served by `tools/list` and `GET /tools`.
pub fn catalog_json() -> &'static Value {
    &CATALOG_JSON
}
