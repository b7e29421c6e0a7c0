pub mod config;
pub mod error;
pub mod format;
pub mod model;
pub mod template;

pub use config::Settings;
pub use error::ValidationError;
pub use format::{Instruction, LineKind, Run, classify_line, format, format_chat, format_chat_as};
pub use model::{
    ChatExportRequest, ChatFormatStyle, ChatMessage, DocumentRequest, Role, Validate,
    parse_request,
};
pub use template::{LayoutDirectives, TemplateName, TitleStyle, UnknownTemplate, resolve_template};

/// MIME type of every document this service produces.
pub const DOCX_MIME_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document";

/// MCP protocol revision announced by `initialize`.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

pub const SERVICE_NAME: &str = "Word MCP Server";
