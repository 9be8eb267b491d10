//! MCP server exposing the `generateChart` tool.
//!
//! Lifecycle:
//!
//! 1. **Initialisation**: `initialize` request, then the `notifications/initialized`
//!    notification
//! 2. **Operation**: `tools/list`, `tools/call` and `ping`
//! 3. **Shutdown**: end of input or Ctrl-C; in-flight calls finish first
//!
//! Tool calls run as independent tasks. Every response goes through one
//! channel to a single writer task, so output lines never interleave.

use std::future::Future;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

use crate::async_api::ChartService;
use crate::chart::ChartKind;
use crate::mcp::protocol::{
    parse_message, IncomingMessage, JsonRpcError, JsonRpcNotification, JsonRpcRequest,
    JsonRpcResponse, OutgoingMessage, RequestId, MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::transport::{self, LineReader, LineWriter};
use crate::renderer::{Artifact, OutputMode, RenderResult};
use crate::rendering::RenderingEngine;

/// Name of the single tool this server provides.
pub const TOOL_NAME: &str = "generateChart";

/// Responses waiting for the writer.
const OUTBOX_CAPACITY: usize = 64;

/// Input lines read ahead of the dispatcher.
const INBOX_CAPACITY: usize = 16;

/// Server state in the MCP lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    /// Waiting for initialize request.
    AwaitingInit,
    /// Initialize received, waiting for initialized notification.
    Initialising,
    /// Ready for normal operation.
    Running,
    /// Input closed; draining in-flight calls.
    ShuttingDown,
}

#[derive(Debug, Clone, Serialize)]
struct ServerInfo {
    name: &'static str,
    version: &'static str,
}

/// Parameters for the initialize request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitializeParams {
    #[serde(default)]
    protocol_version: Option<String>,
    #[serde(default)]
    client_info: Option<Value>,
}

/// A tool definition for tools/list response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Parameters for tools/call request.
#[derive(Debug, Clone, Deserialize)]
struct ToolCallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Arguments of `generateChart`.
///
/// `chartConfig` is passed through untouched; the validator decides whether it
/// is usable.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateChartArgs {
    #[serde(default)]
    chart_config: Value,
    #[serde(default)]
    output_format: OutputMode,
    #[serde(default)]
    save_to_file: bool,
}

/// Content item in a tool call response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    Text {
        text: String,
    },
    Image {
        /// Base64 payload
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    pub content: Vec<ToolContent>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
}

impl ToolCallResult {
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }

    #[must_use]
    pub fn image(png: &[u8]) -> Self {
        Self {
            content: vec![ToolContent::Image {
                data: BASE64.encode(png),
                mime_type: "image/png".to_string(),
            }],
            is_error: false,
        }
    }
}

/// Advice appended to every failed `generateChart` call.
#[must_use]
pub fn remediation_hint() -> String {
    format!(
        "Please ensure your configuration follows the Chart.js v4 schema. Common issues:\n\
         - Check data format matches chart type (e.g., scatter charts need {{x, y}} objects)\n\
         - Verify all required dataset properties are provided\n\
         - Ensure chart type is supported: {}",
        ChartKind::supported_list()
    )
}

/// Map a render result onto tool content.
#[must_use]
pub fn tool_result(result: RenderResult) -> ToolCallResult {
    match result {
        RenderResult::Success {
            artifact: Artifact::Binary(png),
            ..
        } => ToolCallResult::image(&png),
        RenderResult::Success {
            artifact: Artifact::FileReference(uri),
            ..
        } => ToolCallResult::text(uri),
        RenderResult::Success {
            artifact: Artifact::Markup(html),
            ..
        } => ToolCallResult::text(html),
        RenderResult::Failure { message, .. } => {
            ToolCallResult::error(format!("{message}\n\n{}", remediation_hint()))
        }
    }
}

/// Tools this server advertises.
#[must_use]
pub fn tool_definitions() -> Vec<ToolDefinition> {
    vec![ToolDefinition {
        name: TOOL_NAME.to_string(),
        description: format!(
            "Generate a chart from a Chart.js v4 configuration. Returns a PNG image, a file:// \
             reference to a saved PNG, or an embeddable HTML snippet. Supported chart types: {}.",
            ChartKind::supported_list()
        ),
        input_schema: json!({
            "type": "object",
            "properties": {
                "chartConfig": {
                    "type": "object",
                    "description": "Chart.js configuration object with `type`, `data` (labels and datasets) and optional `options`",
                },
                "outputFormat": {
                    "type": "string",
                    "enum": ["raster", "markup"],
                    "default": "raster",
                    "description": "`raster` for a PNG image, `markup` for an HTML snippet drawn client-side",
                },
                "saveToFile": {
                    "type": "boolean",
                    "default": false,
                    "description": "Save the PNG to disk and return its file:// URI (raster only)",
                },
            },
            "required": ["chartConfig"],
        }),
    }]
}

/// The chart MCP server.
pub struct McpServer<E> {
    state: ServerState,
    service: ChartService<E>,
    protocol_version: Option<String>,
}

impl<E: RenderingEngine + 'static> McpServer<E> {
    #[must_use]
    pub fn new(service: ChartService<E>) -> Self {
        Self {
            state: ServerState::AwaitingInit,
            service,
            protocol_version: None,
        }
    }

    /// Returns the current server state.
    #[must_use]
    pub const fn state(&self) -> ServerState {
        self.state
    }

    /// Protocol version agreed during initialisation, if it has happened.
    #[must_use]
    pub fn protocol_version(&self) -> Option<&str> {
        self.protocol_version.as_deref()
    }

    /// Serve over stdin/stdout until end of input or Ctrl-C.
    ///
    /// # Errors
    ///
    /// Returns an error if transport I/O fails.
    pub async fn run_stdio(&mut self) -> std::io::Result<()> {
        let (reader, writer) = transport::stdio();
        let shutdown = async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("received Ctrl-C, shutting down");
            } else {
                std::future::pending::<()>().await;
            }
        };
        self.serve(reader, writer, shutdown).await
    }

    /// Serve one session until end of input or until `shutdown` resolves,
    /// then wait for in-flight tool calls and flush their responses.
    ///
    /// Lines are read by their own task, so a partially received line is
    /// never lost when another branch of the dispatch loop wins.
    ///
    /// # Errors
    ///
    /// Returns an error if reading or writing fails.
    pub async fn serve<R, W, S>(
        &mut self,
        mut reader: LineReader<R>,
        mut writer: LineWriter<W>,
        shutdown: S,
    ) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
        S: Future<Output = ()>,
    {
        let (line_tx, mut lines) = mpsc::channel::<std::io::Result<Option<String>>>(INBOX_CAPACITY);
        let reader_task = tokio::spawn(async move {
            loop {
                let line = reader.read_line().await;
                let last = !matches!(line, Ok(Some(_)));
                if line_tx.send(line).await.is_err() || last {
                    break;
                }
            }
        });

        let (tx, mut rx) = mpsc::channel::<OutgoingMessage>(OUTBOX_CAPACITY);
        let writer_task = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                writer.write_message(&message).await?;
            }
            Ok::<(), std::io::Error>(())
        });

        let mut calls = JoinSet::new();
        tokio::pin!(shutdown);

        let read_result = loop {
            tokio::select! {
                () = &mut shutdown => break Ok(()),

                Some(joined) = calls.join_next(), if !calls.is_empty() => {
                    if let Err(e) = joined {
                        error!("tool call task failed: {e}");
                    }
                }

                line = lines.recv() => match line {
                    Some(Ok(Some(line))) => {
                        if line.trim().is_empty() {
                            continue;
                        }
                        if let Some(reply) = self.handle_line(&line, &tx, &mut calls) {
                            if tx.send(reply).await.is_err() {
                                break Ok(());
                            }
                        }
                    }
                    Some(Ok(None)) | None => break Ok(()),
                    Some(Err(e)) => break Err(e),
                },
            }
        };

        reader_task.abort();
        self.state = ServerState::ShuttingDown;
        debug!(
            "session over (protocol {})",
            self.protocol_version().unwrap_or("never negotiated")
        );
        if !calls.is_empty() {
            info!("waiting for {} in-flight tool call(s)", calls.len());
        }
        while let Some(joined) = calls.join_next().await {
            if let Err(e) = joined {
                error!("tool call task failed: {e}");
            }
        }

        drop(tx);
        let write_result = writer_task.await.map_err(std::io::Error::other)?;
        read_result.and(write_result)
    }

    /// Handle one input line. Returns the reply to send right away, if any;
    /// tool calls reply later from their own task.
    fn handle_line(
        &mut self,
        line: &str,
        tx: &mpsc::Sender<OutgoingMessage>,
        calls: &mut JoinSet<()>,
    ) -> Option<OutgoingMessage> {
        match parse_message(line) {
            Ok(IncomingMessage::Request(req)) => self.handle_request(req, tx, calls),
            Ok(IncomingMessage::Notification(notif)) => {
                self.handle_notification(&notif);
                None
            }
            Err(err) => {
                warn!("rejected input line: {}", err.error.message);
                Some(err.into())
            }
        }
    }

    fn handle_request(
        &mut self,
        req: JsonRpcRequest,
        tx: &mpsc::Sender<OutgoingMessage>,
        calls: &mut JoinSet<()>,
    ) -> Option<OutgoingMessage> {
        debug!("request {:?}: {}", req.id, req.method);
        let response = match req.method.as_str() {
            "initialize" => self.handle_initialize(&req),
            "tools/list" => self.handle_tools_list(&req),
            "tools/call" => match self.prepare_tool_call(&req) {
                Ok(args) => {
                    self.spawn_tool_call(req.id, args, tx.clone(), calls);
                    return None;
                }
                Err(err) => Err(err),
            },
            "ping" => Ok(JsonRpcResponse::success(req.id.clone(), json!({}))),
            _ => Err(JsonRpcError::method_not_found(req.id.clone(), &req.method)),
        };

        Some(match response {
            Ok(resp) => resp.into(),
            Err(err) => err.into(),
        })
    }

    fn handle_notification(&mut self, notif: &JsonRpcNotification) {
        match notif.method.as_str() {
            "notifications/initialized" if self.state == ServerState::Initialising => {
                info!("session initialised");
                self.state = ServerState::Running;
            }
            "notifications/cancelled" => {
                debug!("ignoring cancellation; calls run to completion");
            }
            other => debug!("ignoring notification {other}"),
        }
    }

    fn handle_initialize(&mut self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        if self.state != ServerState::AwaitingInit {
            return Err(JsonRpcError::invalid_request(
                Some(req.id.clone()),
                "Server already initialised",
            ));
        }

        let params: InitializeParams = req
            .params
            .clone()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| {
                JsonRpcError::invalid_params(req.id.clone(), format!("Invalid initialize params: {e}"))
            })?
            .ok_or_else(|| JsonRpcError::invalid_params(req.id.clone(), "Missing initialize params"))?;

        if let Some(client) = &params.client_info {
            info!("client connected: {client}");
        }
        if let Some(requested) = params.protocol_version.as_deref() {
            if requested != MCP_PROTOCOL_VERSION {
                debug!("client requested protocol {requested}, offering {MCP_PROTOCOL_VERSION}");
            }
        }

        self.protocol_version = Some(MCP_PROTOCOL_VERSION.to_string());
        self.state = ServerState::Initialising;

        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": { "tools": {} },
                "serverInfo": ServerInfo {
                    name: SERVER_NAME,
                    version: env!("CARGO_PKG_VERSION"),
                },
            }),
        ))
    }

    fn handle_tools_list(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        self.require_running(&req.id)?;
        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({ "tools": tool_definitions() }),
        ))
    }

    /// Check state and call params. Problems with the tool's own arguments
    /// are not protocol errors and come back as `Err(ToolCallResult)` inside
    /// the `Ok`.
    fn prepare_tool_call(
        &self,
        req: &JsonRpcRequest,
    ) -> Result<Result<GenerateChartArgs, ToolCallResult>, JsonRpcError> {
        self.require_running(&req.id)?;

        let params: ToolCallParams = req
            .params
            .clone()
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| {
                JsonRpcError::invalid_params(req.id.clone(), format!("Invalid tool call params: {e}"))
            })?
            .ok_or_else(|| JsonRpcError::invalid_params(req.id.clone(), "Missing tool call params"))?;

        if params.name != TOOL_NAME {
            return Ok(Err(ToolCallResult::error(format!("Unknown tool: {}", params.name))));
        }

        let arguments = if params.arguments.is_null() {
            json!({})
        } else {
            params.arguments
        };
        Ok(serde_json::from_value(arguments).map_err(|e| {
            ToolCallResult::error(format!(
                "Invalid arguments for {TOOL_NAME}: {e}\n\n{}",
                remediation_hint()
            ))
        }))
    }

    fn spawn_tool_call(
        &self,
        id: RequestId,
        args: Result<GenerateChartArgs, ToolCallResult>,
        tx: mpsc::Sender<OutgoingMessage>,
        calls: &mut JoinSet<()>,
    ) {
        let service = self.service.clone();
        calls.spawn(async move {
            let result = match args {
                Ok(args) => {
                    let rendered = service
                        .generate(args.chart_config, args.output_format, args.save_to_file)
                        .await;
                    tool_result(rendered)
                }
                Err(result) => result,
            };

            let reply: OutgoingMessage = match serde_json::to_value(&result) {
                Ok(value) => JsonRpcResponse::success(id, value).into(),
                Err(e) => {
                    error!("failed to serialise tool call result: {e}");
                    JsonRpcError::internal(id, "Internal error: failed to serialise result").into()
                }
            };
            if tx.send(reply).await.is_err() {
                warn!("response dropped: writer closed");
            }
        });
    }

    /// Ensures the server is in the Running state.
    fn require_running(&self, id: &RequestId) -> Result<(), JsonRpcError> {
        if self.state != ServerState::Running {
            return Err(JsonRpcError::invalid_request(Some(id.clone()), "Server not initialised"));
        }
        Ok(())
    }
}
