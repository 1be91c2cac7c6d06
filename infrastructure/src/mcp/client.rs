//! MCP client over a child process's stdio.
//!
//! A single background reader task owns the server's stdout and routes
//! responses to the waiting caller by request id, so tool calls from
//! concurrent analysis sessions can share one server process.

use super::error::{McpError, Result};
use super::protocol::{
    CallToolResult, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, JsonRpcResponseOut,
    ListToolsResult, McpTool, MessageKind, PROTOCOL_VERSION, classify_message,
};
use serde::Serialize;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, MutexGuard, PoisonError};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

type PendingMap = Arc<std::sync::Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;
type Writer = Arc<Mutex<Box<dyn AsyncWrite + Send + Unpin>>>;

/// Never held across an await.
fn lock_pending(
    pending: &PendingMap,
) -> MutexGuard<'_, HashMap<u64, oneshot::Sender<JsonRpcResponse>>> {
    pending.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Removes a request's pending entry when the waiting future goes away,
/// including when it is dropped mid-flight.
struct PendingEntry<'a> {
    pending: &'a PendingMap,
    id: u64,
}

impl Drop for PendingEntry<'_> {
    fn drop(&mut self) {
        lock_pending(self.pending).remove(&self.id);
    }
}

/// How to launch the tool server.
#[derive(Debug, Clone, PartialEq)]
pub struct McpServerCommand {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
}

impl McpServerCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// Connection to one MCP server.
pub struct McpClient {
    reader_handle: JoinHandle<()>,
    pending_responses: PendingMap,
    /// Set by the reader loop once the server's stdout is gone.
    closed: Arc<AtomicBool>,
    writer: Writer,
    /// Server process (killed on Drop to prevent orphans).
    child: Option<Child>,
}

impl McpClient {
    /// Spawn the server process and connect to its stdio.
    pub fn spawn(command: &McpServerCommand) -> Result<Arc<Self>> {
        debug!("Spawning MCP tool server: {} {:?}", command.program, command.args);

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .envs(command.env.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        // Linux: request kernel to send SIGTERM to child when parent dies.
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                Ok(())
            });
        }

        let mut child = cmd.spawn()?;
        let stdout = child.stdout.take().ok_or_else(|| {
            McpError::Io(std::io::Error::other("Failed to capture stdout"))
        })?;
        let stdin = child.stdin.take().ok_or_else(|| {
            McpError::Io(std::io::Error::other("Failed to capture stdin"))
        })?;

        Ok(Self::connect_internal(stdout, stdin, Some(child)))
    }

    /// Connect over an existing byte stream pair.
    pub fn connect<R, W>(reader: R, writer: W) -> Arc<Self>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self::connect_internal(reader, writer, None)
    }

    fn connect_internal<R, W>(reader: R, writer: W, child: Option<Child>) -> Arc<Self>
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let pending_responses: PendingMap = Arc::new(std::sync::Mutex::new(HashMap::new()));
        let writer: Writer = Arc::new(Mutex::new(Box::new(writer)));

        let closed = Arc::new(AtomicBool::new(false));

        let pending_bg = Arc::clone(&pending_responses);
        let closed_bg = Arc::clone(&closed);
        let writer_bg = Arc::clone(&writer);
        let reader_handle = tokio::spawn(async move {
            Self::reader_loop(reader, &pending_bg, writer_bg).await;
            closed_bg.store(true, Ordering::SeqCst);
            lock_pending(&pending_bg).clear();
        });

        Arc::new(Self {
            reader_handle,
            pending_responses,
            closed,
            writer,
            child,
        })
    }

    /// Background reader loop, single owner of the server's stdout.
    ///
    /// Returns when stdout closes; the caller then drops all pending senders
    /// so waiting callers observe [`McpError::TransportClosed`].
    async fn reader_loop<R>(reader: R, pending_responses: &PendingMap, writer: Writer)
    where
        R: AsyncRead + Unpin,
    {
        let mut lines = BufReader::new(reader).lines();

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => {
                    debug!("MCP reader: server closed stdout");
                    break;
                }
                Err(e) => {
                    warn!("MCP reader: read error: {}", e);
                    break;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            trace!("MCP received: {}", line);

            let json_value: serde_json::Value = match serde_json::from_str(&line) {
                Ok(v) => v,
                Err(e) => {
                    // Servers launched through npx may print banners to stdout
                    debug!("MCP reader: skipping non-JSON line: {}", e);
                    continue;
                }
            };

            match classify_message(&json_value) {
                MessageKind::Response { id } => {
                    let response: JsonRpcResponse = match serde_json::from_value(json_value) {
                        Ok(r) => r,
                        Err(e) => {
                            warn!("MCP reader: failed to parse response: {}", e);
                            continue;
                        }
                    };
                    let sender = lock_pending(pending_responses).remove(&id);
                    match sender {
                        Some(tx) => {
                            let _ = tx.send(response);
                        }
                        None => debug!("MCP reader: no pending receiver for id={}", id),
                    }
                }
                MessageKind::IncomingRequest { id } => {
                    let method = json_value
                        .get("method")
                        .and_then(|m| m.as_str())
                        .unwrap_or_default();
                    let reply = if method == "ping" {
                        JsonRpcResponseOut::result(id, serde_json::json!({}))
                    } else {
                        JsonRpcResponseOut::method_not_found(id, method)
                    };
                    if let Err(e) = Self::write_line(&writer, &reply).await {
                        warn!("MCP reader: failed to answer {}: {}", method, e);
                    }
                }
                MessageKind::Notification => {
                    trace!("MCP notification: {}", json_value);
                }
                MessageKind::Invalid => {
                    debug!("MCP reader: ignoring message without id or method");
                }
            }
        }
    }

    async fn write_line<T: Serialize>(writer: &Writer, message: &T) -> Result<()> {
        let mut json = serde_json::to_string(message)?;
        trace!("MCP sending: {}", json);
        json.push('\n');

        let mut writer = writer.lock().await;
        writer.write_all(json.as_bytes()).await?;
        writer.flush().await?;
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Send a request and wait for the correlated response's result.
    pub async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value> {
        let request = JsonRpcRequest::new(method, params);
        let (tx, rx) = oneshot::channel();
        let request_id = request.id;

        lock_pending(&self.pending_responses).insert(request_id, tx);
        let _entry = PendingEntry {
            pending: &self.pending_responses,
            id: request_id,
        };
        if self.is_closed() {
            return Err(McpError::TransportClosed);
        }

        Self::write_line(&self.writer, &request).await?;

        let response = rx.await.map_err(|_| McpError::TransportClosed)?;
        if let Some(err) = response.error {
            return Err(McpError::RpcError {
                code: err.code,
                message: err.message,
            });
        }
        Ok(response.result.unwrap_or(serde_json::Value::Null))
    }

    /// Send a notification (no response expected).
    pub async fn notify(&self, method: &str, params: Option<serde_json::Value>) -> Result<()> {
        Self::write_line(&self.writer, &JsonRpcNotification::new(method, params)).await
    }

    /// Perform the `initialize` handshake.
    pub async fn initialize(&self) -> Result<()> {
        let result = self
            .request(
                "initialize",
                Some(serde_json::json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": "repo-lens",
                        "version": env!("CARGO_PKG_VERSION"),
                    },
                })),
            )
            .await?;

        if let Some(server) = result.get("serverInfo") {
            info!(
                "Connected to MCP server {} {}",
                server.get("name").and_then(|v| v.as_str()).unwrap_or("unknown"),
                server.get("version").and_then(|v| v.as_str()).unwrap_or("")
            );
        }
        self.notify("notifications/initialized", None).await
    }

    /// List all tools, following pagination cursors.
    pub async fn list_tools(&self) -> Result<Vec<McpTool>> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let params = cursor.as_ref().map(|c| serde_json::json!({ "cursor": c }));
            let result = self.request("tools/list", params).await?;
            let page: ListToolsResult = serde_json::from_value(result)
                .map_err(|e| McpError::UnexpectedResponse(format!("tools/list: {e}")))?;
            tools.extend(page.tools);
            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }
        Ok(tools)
    }

    /// Invoke one tool.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<CallToolResult> {
        let result = self
            .request(
                "tools/call",
                Some(serde_json::json!({ "name": name, "arguments": arguments })),
            )
            .await?;
        serde_json::from_value(result)
            .map_err(|e| McpError::UnexpectedResponse(format!("tools/call: {e}")))
    }
}

impl Drop for McpClient {
    fn drop(&mut self) {
        if let Some(child) = self.child.as_mut() {
            debug!("McpClient dropping, killing tool server process");
            let _ = child.start_kill();
        }
        self.reader_handle.abort();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use serde_json::{Value, json};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

    /// In-process MCP server answering from a handler function.
    pub(crate) fn fake_server<F>(handler: F) -> Arc<McpClient>
    where
        F: Fn(&str, &Value) -> Option<Value> + Send + 'static,
    {
        let (client_io, server_io) = tokio::io::duplex(64 * 1024);
        let (client_read, client_write) = tokio::io::split(client_io);
        tokio::spawn(serve(server_io, handler));
        McpClient::connect(client_read, client_write)
    }

    async fn serve<F>(io: DuplexStream, handler: F)
    where
        F: Fn(&str, &Value) -> Option<Value>,
    {
        let (read, mut write) = tokio::io::split(io);
        let mut lines = BufReader::new(read).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            let msg: Value = serde_json::from_str(&line).unwrap();
            let Some(id) = msg.get("id").cloned() else {
                continue;
            };
            let method = msg["method"].as_str().unwrap_or_default().to_string();
            let params = msg.get("params").cloned().unwrap_or(Value::Null);
            let reply = match handler(&method, &params) {
                Some(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
                None => json!({
                    "jsonrpc": "2.0",
                    "id": id,
                    "error": {"code": -32601, "message": format!("no {method}")}
                }),
            };
            let mut out = reply.to_string();
            out.push('\n');
            write.write_all(out.as_bytes()).await.unwrap();
        }
    }

    #[tokio::test]
    async fn handshake_and_paginated_listing() {
        let client = fake_server(|method, params| match method {
            "initialize" => Some(json!({"serverInfo": {"name": "fake", "version": "1"}})),
            "tools/list" if params.get("cursor").is_none() => Some(json!({
                "tools": [{"name": "list_directory"}],
                "nextCursor": "2"
            })),
            "tools/list" => Some(json!({"tools": [{"name": "read_file", "description": "Read"}]})),
            _ => None,
        });

        client.initialize().await.unwrap();
        let tools = client.list_tools().await.unwrap();
        let names: Vec<_> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["list_directory", "read_file"]);
    }

    #[tokio::test]
    async fn rpc_errors_are_surfaced() {
        let client = fake_server(|_, _| None);
        let err = client.request("tools/call", None).await.unwrap_err();
        assert!(matches!(err, McpError::RpcError { code: -32601, .. }));
    }

    #[tokio::test]
    async fn concurrent_requests_are_correlated() {
        let client = fake_server(|_, params| Some(json!({"content": [{"type": "text", "text": params["name"]}]})));
        let (a, b) = tokio::join!(
            client.call_tool("a", json!({})),
            client.call_tool("b", json!({}))
        );
        assert_eq!(a.unwrap().text(), "a");
        assert_eq!(b.unwrap().text(), "b");
    }

    #[tokio::test]
    async fn closed_transport_fails_pending_requests() {
        let (client_io, server_io) = tokio::io::duplex(1024);
        let (client_read, client_write) = tokio::io::split(client_io);
        let client = McpClient::connect(client_read, client_write);
        drop(server_io);
        let err = client.request("tools/list", None).await.unwrap_err();
        assert!(matches!(err, McpError::TransportClosed | McpError::Io(_)));
    }

    #[tokio::test]
    async fn abandoned_requests_release_their_pending_entries() {
        // Server reads every request and never answers.
        let (client_io, server_io) = tokio::io::duplex(64 * 1024);
        let (client_read, client_write) = tokio::io::split(client_io);
        let client = McpClient::connect(client_read, client_write);
        tokio::spawn(async move {
            let mut lines = BufReader::new(server_io).lines();
            while let Ok(Some(_)) = lines.next_line().await {}
        });

        for i in 0..5 {
            let name = format!("tool_{i}");
            let call = client.call_tool(&name, json!({}));
            let outcome = tokio::time::timeout(std::time::Duration::from_millis(20), call).await;
            assert!(outcome.is_err());
        }

        assert!(lock_pending(&client.pending_responses).is_empty());
        assert!(!client.is_closed());
    }

    #[tokio::test]
    async fn answered_requests_leave_no_pending_entries() {
        let client = fake_server(|_, _| Some(json!({"content": []})));
        client.call_tool("a", json!({})).await.unwrap();
        client.request("tools/call", None).await.unwrap();
        assert!(lock_pending(&client.pending_responses).is_empty());
    }

    #[tokio::test]
    async fn answers_server_ping() {
        let (client_io, server_io) = tokio::io::duplex(1024);
        let (client_read, client_write) = tokio::io::split(client_io);
        let _client = McpClient::connect(client_read, client_write);

        let (read, mut write) = tokio::io::split(server_io);
        write
            .write_all(b"{\"jsonrpc\":\"2.0\",\"id\":\"p\",\"method\":\"ping\"}\n")
            .await
            .unwrap();
        let mut lines = BufReader::new(read).lines();
        let reply: Value = serde_json::from_str(&lines.next_line().await.unwrap().unwrap()).unwrap();
        assert_eq!(reply["id"], "p");
        assert_eq!(reply["result"], json!({}));
    }
}
