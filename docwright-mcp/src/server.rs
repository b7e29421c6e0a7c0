//! rmcp server used by the stdio binary. Tool and resource requests go to the
//! same [`McpDispatcher`] methods the HTTP endpoint uses.

use docwright_store::DocumentService;
use rmcp::{
    ErrorData as McpError, RoleServer, ServerHandler,
    model::{
        CallToolRequestParam, CallToolResult, Content, ListResourcesResult, ListToolsResult,
        PaginatedRequestParam, ReadResourceRequestParam, ReadResourceResult, ServerInfo,
    },
    service::RequestContext,
};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::dispatcher::McpDispatcher;
use crate::tools::catalog_json;
use crate::types::internal_error;

#[derive(Clone)]
pub struct DocumentServer {
    dispatcher: McpDispatcher,
}

impl DocumentServer {
    pub fn new(service: DocumentService) -> Self {
        Self {
            dispatcher: McpDispatcher::new(service),
        }
    }
}

// ディスパッチャの JSON を rmcp のモデル型に詰め替える
fn into_model<T: DeserializeOwned>(value: Value) -> Result<T, McpError> {
    serde_json::from_value(value).map_err(|e| internal_error(e.to_string()))
}

impl ServerHandler for DocumentServer {
    fn get_info(&self) -> ServerInfo {
        self.dispatcher.server_info().clone()
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: into_model(catalog_json()["tools"].clone())?,
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        let arguments = request.arguments.map(Value::Object).unwrap_or(Value::Null);
        let result = self.dispatcher.run_tool(&request.name, arguments).await?;
        // 結果のレコードは JSON テキストとして返す
        Ok(CallToolResult::success(vec![Content::json(result)?]))
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        into_model(self.dispatcher.list_resources().await?)
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        into_model(self.dispatcher.read_resource_uri(&request.uri).await?)
    }
}
