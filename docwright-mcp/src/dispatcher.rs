//! Method dispatch for the MCP endpoint. The HTTP route hands raw bodies to
//! [`McpDispatcher`]; the stdio server reuses its tool and resource methods.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use docwright_common::{
    ChatExportRequest, DOCX_MIME_TYPE, DocumentRequest, SERVICE_NAME, Validate, ValidationError,
    parse_request,
};
use docwright_store::{DocumentService, ErrorClass, ServiceError};
use rmcp::model::{
    ErrorCode, ErrorData, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use crate::tools::{DeleteDocumentArgs, ListDocumentsArgs, Tool, catalog_json};
use crate::types::{
    JsonRpcRequest, JsonRpcResponse, internal_error, invalid_params, invalid_request,
    method_not_found, parse_error,
};

pub const RESOURCE_URI_PREFIX: &str = "word://documents/";

pub fn resource_uri(filename: &str) -> String {
    format!("{RESOURCE_URI_PREFIX}{filename}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Initialize,
    Initialized,
    Ping,
    ToolsList,
    ToolsCall,
    ResourcesList,
    ResourcesRead,
}

impl Method {
    pub fn from_name(name: &str) -> Option<Method> {
        Some(match name {
            "initialize" => Method::Initialize,
            "notifications/initialized" => Method::Initialized,
            "ping" => Method::Ping,
            "tools/list" => Method::ToolsList,
            "tools/call" => Method::ToolsCall,
            "resources/list" => Method::ResourcesList,
            "resources/read" => Method::ResourcesRead,
            _ => return None,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

#[derive(Debug, Deserialize)]
struct ReadResourceParams {
    uri: String,
}

#[derive(Clone)]
pub struct McpDispatcher {
    service: DocumentService,
    server_info: Arc<ServerInfo>,
}

impl McpDispatcher {
    pub fn new(service: DocumentService) -> Self {
        let server_info = ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_resources()
                .enable_tools()
                .build(),
            server_info: Implementation {
                name: SERVICE_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Implementation::from_build_env()
            },
            instructions: Some(
                "Creates Word documents from text or chat transcripts.\n\nTools: create_document, create_document_from_chat, list_documents, delete_document.\nCreated documents are also exposed as resources under word://documents/."
                    .to_string(),
            ),
        };
        Self {
            service,
            server_info: Arc::new(server_info),
        }
    }

    pub fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Returns `None` when nothing should be sent back: a lone notification,
    /// or a batch made only of notifications.
    pub async fn handle_body(&self, body: &str) -> Option<Value> {
        match serde_json::from_str::<Value>(body) {
            Ok(value) => self.handle_value(value).await,
            Err(e) => {
                warn!("Unparseable MCP body: {e}");
                Some(JsonRpcResponse::error(Value::Null, parse_error(e.to_string())).into_value())
            }
        }
    }

    pub async fn handle_value(&self, value: Value) -> Option<Value> {
        match value {
            Value::Array(batch) if batch.is_empty() => Some(
                JsonRpcResponse::error(Value::Null, invalid_request("empty batch")).into_value(),
            ),
            Value::Array(batch) => {
                let mut responses = Vec::with_capacity(batch.len());
                for message in batch {
                    if let Some(response) = self.handle_message(message).await {
                        responses.push(response.into_value());
                    }
                }
                (!responses.is_empty()).then_some(Value::Array(responses))
            }
            message => self
                .handle_message(message)
                .await
                .map(JsonRpcResponse::into_value),
        }
    }

    async fn handle_message(&self, message: Value) -> Option<JsonRpcResponse> {
        match JsonRpcRequest::from_value(message) {
            Ok(request) => self.handle_request(request).await,
            Err((id, error)) => {
                warn!("Rejected JSON-RPC envelope: {}", error.message);
                Some(JsonRpcResponse::error(id, error))
            }
        }
    }

    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        debug!(method = %request.method, "MCP request");
        let outcome = self.dispatch(&request.method, request.params).await;
        // 通知には応答しない
        let id = request.id?;
        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(error) => JsonRpcResponse::error(id, error),
        })
    }

    async fn dispatch(&self, method: &str, params: Value) -> Result<Value, ErrorData> {
        let Some(method) = Method::from_name(method) else {
            warn!("Unknown MCP method: {method}");
            return Err(method_not_found(method));
        };
        match method {
            Method::Initialize => {
                info!("MCP client initialized");
                to_result(&*self.server_info)
            }
            Method::Initialized => Ok(Value::Null),
            Method::Ping => Ok(json!({})),
            Method::ToolsList => Ok(catalog_json().clone()),
            Method::ToolsCall => self.call_tool(params).await,
            Method::ResourcesList => self.list_resources().await,
            Method::ResourcesRead => self.read_resource(params).await,
        }
    }

    async fn call_tool(&self, params: Value) -> Result<Value, ErrorData> {
        let call: ToolCallParams = from_params(params)?;
        self.run_tool(&call.name, call.arguments).await
    }

    /// Runs one tool by name and returns its raw JSON result. Shared by the
    /// JSON-RPC route and the rmcp stdio server.
    pub async fn run_tool(&self, name: &str, arguments: Value) -> Result<Value, ErrorData> {
        let Some(tool) = Tool::from_name(name) else {
            warn!("Unknown tool: {name}");
            return Err(ErrorData::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("Tool not found: {name}"),
                None,
            ));
        };
        // 引数なしは空オブジェクト扱い
        let arguments = match arguments {
            Value::Null => json!({}),
            arguments => arguments,
        };
        info!(tool = tool.name(), "MCP tool call");

        match tool {
            Tool::CreateDocument => {
                let request: DocumentRequest = parse_args(arguments)?;
                let record = self
                    .service
                    .create_document(request)
                    .await
                    .map_err(service_error)?;
                to_result(&record)
            }
            Tool::CreateDocumentFromChat => {
                let request: ChatExportRequest = parse_args(arguments)?;
                let record = self
                    .service
                    .create_from_chat(request)
                    .await
                    .map_err(service_error)?;
                to_result(&record)
            }
            Tool::ListDocuments => {
                let _: ListDocumentsArgs = parse_args(arguments)?;
                let documents = self.service.list_documents().await.map_err(service_error)?;
                Ok(json!({ "count": documents.len(), "documents": documents }))
            }
            Tool::DeleteDocument => {
                let args: DeleteDocumentArgs = parse_args(arguments)?;
                self.service
                    .delete_document(&args.filename)
                    .await
                    .map_err(service_error)?;
                Ok(json!({ "deleted": true, "filename": args.filename }))
            }
        }
    }

    /// `{ resources: [...] }`, one entry per stored document.
    pub async fn list_resources(&self) -> Result<Value, ErrorData> {
        let documents = self.service.list_documents().await.map_err(service_error)?;
        let resources: Vec<Value> = documents
            .iter()
            .map(|record| {
                json!({
                    "uri": resource_uri(&record.filename),
                    "name": record.title,
                    "description": record.filename,
                    "mimeType": DOCX_MIME_TYPE,
                    "size": record.size_bytes,
                })
            })
            .collect();
        Ok(json!({ "resources": resources }))
    }

    async fn read_resource(&self, params: Value) -> Result<Value, ErrorData> {
        let params: ReadResourceParams = from_params(params)?;
        self.read_resource_uri(&params.uri).await
    }

    /// `{ contents: [{ uri, mimeType, blob }] }` with the document bytes in
    /// base64. Only `word://documents/` URIs are served.
    pub async fn read_resource_uri(&self, uri: &str) -> Result<Value, ErrorData> {
        let filename = uri
            .strip_prefix(RESOURCE_URI_PREFIX)
            .ok_or_else(|| invalid_params(format!("Unsupported resource URI: {uri}")))?;
        let bytes = self
            .service
            .fetch_document(filename)
            .await
            .map_err(service_error)?;
        Ok(json!({
            "contents": [{
                "uri": uri,
                "mimeType": DOCX_MIME_TYPE,
                "blob": STANDARD.encode(bytes),
            }]
        }))
    }
}

fn to_result<T: Serialize + ?Sized>(value: &T) -> Result<Value, ErrorData> {
    serde_json::to_value(value).map_err(|e| internal_error(e.to_string()))
}

fn from_params<T: DeserializeOwned>(params: Value) -> Result<T, ErrorData> {
    serde_json::from_value(params).map_err(|e| invalid_params(format!("Invalid params: {e}")))
}

fn parse_args<T: DeserializeOwned + Validate>(
    arguments: Value,
) -> Result<T, ErrorData> {
    parse_request(arguments).map_err(|e: ValidationError| {
        warn!("Invalid tool arguments: {e}");
        invalid_params(e.to_string())
    })
}

fn service_error(e: ServiceError) -> ErrorData {
    match e.class() {
        ErrorClass::Invalid | ErrorClass::NotFound => invalid_params(e.to_string()),
        ErrorClass::Internal => {
            error!("MCP tool failed: {e}");
            internal_error(e.to_string())
        }
    }
}
