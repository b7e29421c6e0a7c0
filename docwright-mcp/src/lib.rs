//! MCP (JSON-RPC 2.0) front door for the document service.

pub mod dispatcher;
pub mod server;
pub mod tools;
pub mod types;

pub use dispatcher::{McpDispatcher, Method, resource_uri};
pub use server::DocumentServer;
pub use tools::{Tool, catalog, catalog_json};
pub use types::{JsonRpcRequest, JsonRpcResponse};
