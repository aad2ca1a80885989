//! Stdio transport: an MCP server over newline-delimited JSON-RPC.
//!
//! The MCP session (handshake, request routing, concurrency) is run by
//! `rmcp`; tool listing and tool calls go to the [`Dispatcher`].

use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, CustomRequest, CustomResult, ErrorCode,
    Implementation, JsonObject, ListToolsResult, PaginatedRequestParams, ProtocolVersion,
    ServerCapabilities, ServerInfo, Tool,
};
use rmcp::service::{RequestContext, ServerInitializeError};
use rmcp::{ErrorData, RoleServer, ServerHandler, ServiceExt};
use serde_json::Value;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::lines::LineTransport;
use crate::error::ServerError;
use crate::tools::{Dispatcher, ToolDef};
use crate::types::{InvocationResult, INVALID_PARAMETERS, TOOL_NOT_FOUND};

pub const SERVER_NAME: &str = env!("CARGO_PKG_NAME");
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Serve on the process's stdin/stdout.
pub async fn serve_stdio(
    dispatcher: Dispatcher,
    shutdown: CancellationToken,
) -> Result<(), ServerError> {
    let (stdin, stdout) = rmcp::transport::stdio();
    serve(stdin, stdout, dispatcher, shutdown).await
}

/// Run one MCP session over `reader`/`writer`. Returns once input ends or
/// `shutdown` fires and every request already read has been answered.
pub async fn serve<R, W>(
    reader: R,
    writer: W,
    dispatcher: Dispatcher,
    shutdown: CancellationToken,
) -> Result<(), ServerError>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    info!(tools = dispatcher.registry().len(), "stdio transport started");

    let transport = LineTransport::new(reader, writer, shutdown);
    let service = match DispatchServer::new(dispatcher).serve(transport).await {
        Ok(service) => service,
        Err(ServerInitializeError::ConnectionClosed(context)) => {
            info!(%context, "input ended before the session was initialized");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let reason = service.waiting().await?;
    info!(?reason, "stdio transport stopped");
    Ok(())
}

/// MCP tool server backed by a [`Dispatcher`].
#[derive(Clone)]
pub struct DispatchServer {
    dispatcher: Dispatcher,
}

impl DispatchServer {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }
}

impl ServerHandler for DispatchServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
                ..Implementation::from_build_env()
            },
            instructions: None,
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        let tools = self
            .dispatcher
            .registry()
            .definitions()
            .into_iter()
            .map(tool_info)
            .collect();
        Ok(ListToolsResult::with_all_items(tools))
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let Some(arguments) = request.arguments else {
            return Err(ErrorData::invalid_params("No arguments provided", None));
        };
        debug!(tool = %request.name, "tools/call");
        let result = self
            .dispatcher
            .dispatch(&request.name, &Value::Object(arguments))
            .await;
        Ok(tool_result(result))
    }

    // A `tools/call` whose params do not parse lands here instead of `call_tool`.
    async fn on_custom_request(
        &self,
        request: CustomRequest,
        _context: RequestContext<RoleServer>,
    ) -> Result<CustomResult, ErrorData> {
        match (request.method.as_str(), request.params) {
            ("tools/call", None) => Err(ErrorData::invalid_params("Missing params", None)),
            ("tools/call", Some(_)) => Err(ErrorData::invalid_params(
                "tools/call params need a tool name",
                None,
            )),
            (other, _) => Err(ErrorData::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("Unknown method: {other}"),
                None,
            )),
        }
    }
}

fn tool_info(def: &ToolDef) -> Tool {
    let schema = match def.input_schema() {
        Value::Object(schema) => schema.clone(),
        _ => JsonObject::new(),
    };
    Tool::new(def.name.clone(), def.description.clone(), schema)
}

fn tool_result(result: InvocationResult) -> CallToolResult {
    match result {
        InvocationResult::Success {
            value: Value::String(text),
        } => CallToolResult::success(vec![Content::text(text)]),
        InvocationResult::Success { value } => CallToolResult::success(vec![Content::text(
            serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string()),
        )]),
        InvocationResult::ValidationFailure { errors } => {
            let details = errors
                .iter()
                .map(|e| {
                    let path = if e.path.is_empty() { "(root)" } else { &e.path };
                    format!("- {path}: {}", e.message)
                })
                .collect::<Vec<_>>()
                .join("\n");
            CallToolResult::error(vec![Content::text(format!(
                "{INVALID_PARAMETERS}:\n{details}"
            ))])
        }
        InvocationResult::NotFound { tool } => {
            CallToolResult::error(vec![Content::text(format!("{TOOL_NOT_FOUND}: {tool}"))])
        }
        InvocationResult::HandlerFailure { message } => {
            CallToolResult::error(vec![Content::text(message)])
        }
    }
}
