//! Ghost-text language server
//!
//! Tracks open documents, answers `custom/triggerGhostText` with an
//! acknowledgement and pushes the suggestion later as
//! `ghostText/virtualText`. A trigger that starts no work is declined with
//! `{ack: false}`; an acknowledged one ends in exactly one push unless it is
//! cancelled. One dispatch loop owns all server state;
//! completion calls run as spawned tasks that write through the same
//! outbound channel as the loop.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use ghostline_core::position::char_len;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::completion::{CompletionProvider, CompletionRequest, ContextFile};
use crate::config::ServerConfig;
use crate::context::{trim_suffix_overlap, ContextWindow};
use crate::protocol::{
    self, ProjectFileParams, TextDocumentPositionParams, TriggerReply, VirtualTextParams,
};
use crate::transport::{
    JsonRpcError, JsonRpcNotification, JsonRpcResponse, LspMessage, MessageReader, MessageWriter,
};
use crate::types::{LspError, LspResult, ServerState};

/// Repository files shared by the client
#[derive(Debug, Default, Clone)]
pub struct ProjectContext {
    repo: Option<String>,
    files: BTreeMap<String, String>,
}

impl ProjectContext {
    pub fn repo(&self) -> Option<&str> {
        self.repo.as_deref()
    }

    pub fn file(&self, key: &str) -> Option<&str> {
        self.files.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    fn insert(&mut self, root: Option<&str>, path: &str, content: String) {
        if let Some(root) = root {
            let name = Path::new(root)
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| root.to_string());
            self.repo = Some(name);
        }
        let key = match &self.repo {
            Some(repo) => format!("{}/{}", repo, path),
            None => path.to_string(),
        };
        self.files.insert(key, content);
    }

    fn context_files(&self) -> Vec<ContextFile> {
        self.files
            .iter()
            .map(|(path, content)| ContextFile {
                path: path.clone(),
                content: content.clone(),
            })
            .collect()
    }
}

/// Suggestion work accepted by a trigger, started once the ack is queued
#[derive(Debug)]
struct SuggestionJob {
    uri: String,
    line: u32,
    request: CompletionRequest,
}

/// Ghost-text language server
pub struct GhostTextServer {
    state: ServerState,
    config: ServerConfig,
    provider: Arc<dyn CompletionProvider>,
    documents: HashMap<String, Vec<String>>,
    project: ProjectContext,
    tasks: Vec<JoinHandle<()>>,
    deferred: Option<SuggestionJob>,
    outgoing: mpsc::UnboundedSender<LspMessage>,
}

impl GhostTextServer {
    /// Create a server writing its outbound messages to `outgoing`
    pub fn new(
        config: ServerConfig,
        provider: Arc<dyn CompletionProvider>,
        outgoing: mpsc::UnboundedSender<LspMessage>,
    ) -> Self {
        Self {
            state: ServerState::Initializing,
            config,
            provider,
            documents: HashMap::new(),
            project: ProjectContext::default(),
            tasks: Vec::new(),
            deferred: None,
            outgoing,
        }
    }

    pub fn state(&self) -> ServerState {
        self.state
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Lines of an open document
    pub fn document(&self, uri: &str) -> Option<&[String]> {
        self.documents.get(uri).map(Vec::as_slice)
    }

    pub fn project(&self) -> &ProjectContext {
        &self.project
    }

    /// Number of suggestion tasks still running
    pub fn active_tasks(&mut self) -> usize {
        self.tasks.retain(|task| !task.is_finished());
        self.tasks.len()
    }

    /// Abort every running suggestion task
    pub fn cancel_all(&mut self) -> usize {
        let mut cancelled = 0;
        for task in self.tasks.drain(..) {
            if !task.is_finished() {
                task.abort();
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            debug!(cancelled, "Cancelled suggestion tasks");
        }
        cancelled
    }

    fn ensure_initialized(&self) -> LspResult<()> {
        if self.state != ServerState::Initialized {
            return Err(LspError::InvalidRequest(
                "Server is not initialized".to_string(),
            ));
        }
        Ok(())
    }

    /// Handle initialize request
    pub fn handle_initialize(&mut self, _params: Value) -> LspResult<Value> {
        if self.state != ServerState::Initializing {
            return Err(LspError::InvalidRequest(
                "Server is not in initializing state".to_string(),
            ));
        }

        info!("Initializing ghost text server");
        Ok(json!({
            "capabilities": {
                "hoverProvider": true,
                "textDocumentSync": {
                    "openClose": true,
                    "change": 1,
                    "save": true
                },
                "experimental": {"ghostTextProvider": true}
            },
            "serverInfo": {
                "name": "ghostline",
                "version": env!("CARGO_PKG_VERSION")
            }
        }))
    }

    /// Handle initialized notification
    pub fn handle_initialized(&mut self) -> LspResult<()> {
        if self.state != ServerState::Initializing {
            return Err(LspError::InvalidRequest(
                "Server is not in initializing state".to_string(),
            ));
        }
        self.state = ServerState::Initialized;
        info!("Ghost text server initialized");
        Ok(())
    }

    /// Handle shutdown request
    pub fn handle_shutdown(&mut self) -> LspResult<Value> {
        self.ensure_initialized()?;
        info!("Shutdown request received");
        self.cancel_all();
        self.state = ServerState::ShuttingDown;
        Ok(Value::Null)
    }

    /// Handle exit notification
    pub fn handle_exit(&mut self) -> LspResult<()> {
        if self.state != ServerState::ShuttingDown {
            warn!("Exit received without shutdown");
        }
        self.cancel_all();
        self.state = ServerState::ShutDown;
        Ok(())
    }

    pub fn handle_did_open(&mut self, params: Value) -> LspResult<()> {
        self.ensure_initialized()?;

        let text_document = params
            .get("textDocument")
            .ok_or_else(|| LspError::InvalidParams("Missing textDocument".to_string()))?;
        let uri = text_document
            .get("uri")
            .and_then(|v| v.as_str())
            .ok_or_else(|| LspError::InvalidParams("Missing uri".to_string()))?;
        let text = text_document
            .get("text")
            .and_then(|v| v.as_str())
            .ok_or_else(|| LspError::InvalidParams("Missing text".to_string()))?;

        debug!(uri, size = text.len(), "Document opened");
        self.documents.insert(uri.to_string(), split_document(text));
        Ok(())
    }

    /// Full-sync change; also cancels running suggestion tasks
    pub fn handle_did_change(&mut self, params: Value) -> LspResult<()> {
        self.ensure_initialized()?;

        let uri = params
            .get("textDocument")
            .and_then(|d| d.get("uri"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| LspError::InvalidParams("Missing uri".to_string()))?;
        let content_changes = params
            .get("contentChanges")
            .and_then(|v| v.as_array())
            .ok_or_else(|| LspError::InvalidParams("Missing contentChanges".to_string()))?;

        if let Some(text) = content_changes
            .last()
            .and_then(|change| change.get("text"))
            .and_then(|v| v.as_str())
        {
            self.documents.insert(uri.to_string(), split_document(text));
        }

        let cancelled = self.cancel_all();
        if cancelled > 0 {
            debug!(uri, cancelled, "Document changed while suggestions were running");
        }
        Ok(())
    }

    pub fn handle_did_close(&mut self, params: Value) -> LspResult<()> {
        self.ensure_initialized()?;

        let uri = params
            .get("textDocument")
            .and_then(|d| d.get("uri"))
            .and_then(|v| v.as_str())
            .ok_or_else(|| LspError::InvalidParams("Missing uri".to_string()))?;

        debug!(uri, "Document closed");
        self.documents.remove(uri);
        Ok(())
    }

    /// Echo the hovered line
    pub fn handle_hover(&self, params: Value) -> LspResult<Value> {
        self.ensure_initialized()?;
        let params: TextDocumentPositionParams = parse_params(params)?;

        let line_number = params.position.line;
        let line = self
            .documents
            .get(&params.text_document.uri)
            .and_then(|lines| lines.get(line_number as usize));

        Ok(match line {
            Some(line) => json!({
                "contents": {
                    "kind": "markdown",
                    "value": format!("**Echo**\n\n`{}`", line)
                },
                "range": {
                    "start": {"line": line_number, "character": 0},
                    "end": {"line": line_number, "character": char_len(line)}
                }
            }),
            None => Value::Null,
        })
    }

    /// Acknowledge a trigger and queue the suggestion work
    ///
    /// Triggers that cannot start work are declined rather than acknowledged,
    /// so the client is not left waiting for a push.
    pub fn handle_trigger(&mut self, params: Value) -> LspResult<Value> {
        self.ensure_initialized()?;
        let params: TextDocumentPositionParams = parse_params(params)?;
        let ack = serde_json::to_value(TriggerReply::ack())
            .map_err(|e| LspError::SerializationError(e.to_string()))?;
        let declined = serde_json::to_value(TriggerReply::declined())
            .map_err(|e| LspError::SerializationError(e.to_string()))?;

        let uri = params.text_document.uri;
        let position = params.position;

        let Some(lines) = self.documents.get(&uri) else {
            debug!(uri = %uri, "Ghost request for unknown document");
            return Ok(declined);
        };
        if position.line as usize >= lines.len() {
            debug!(line = position.line, "Ghost request line out of range");
            return Ok(declined);
        }
        let Some(window) = ContextWindow::extract(
            lines,
            position,
            self.config.prefix_lines,
            self.config.suffix_lines,
        ) else {
            debug!(%position, "Ghost request character out of range");
            return Ok(declined);
        };
        if self.active_tasks() > 0 {
            debug!("A suggestion task is already running, declining trigger");
            return Ok(declined);
        }

        self.deferred = Some(SuggestionJob {
            uri,
            line: position.line,
            request: CompletionRequest {
                prefix: window.prefix,
                suffix: window.suffix,
                repo: self.project.repo.clone(),
                files: self.project.context_files(),
            },
        });
        Ok(ack)
    }

    pub fn handle_cancel(&mut self) {
        let cancelled = self.cancel_all();
        debug!(cancelled, "Ghost text cancel received");
    }

    pub fn handle_project_file(&mut self, params: Value) -> LspResult<()> {
        let params: ProjectFileParams = parse_params(params)?;
        let (Some(path), Some(content)) = (params.path, params.content) else {
            return Ok(());
        };
        if path.is_empty() {
            return Ok(());
        }
        self.project.insert(params.root.as_deref(), &path, content);
        debug!(path = %path, repo = ?self.project.repo, "Stored project file");
        Ok(())
    }

    /// Route one message; `Some` is the result for a request
    pub fn process_message(&mut self, message: LspMessage) -> LspResult<Option<Value>> {
        match message {
            LspMessage::Request(req) => {
                let params = req.params.unwrap_or(json!({}));
                match req.method.as_str() {
                    protocol::INITIALIZE => self.handle_initialize(params),
                    protocol::SHUTDOWN => self.handle_shutdown(),
                    protocol::HOVER => self.handle_hover(params),
                    protocol::TRIGGER_GHOST_TEXT => self.handle_trigger(params),
                    _ => Err(LspError::MethodNotFound(req.method)),
                }
                .map(Some)
            }
            LspMessage::Notification(notif) => {
                let params = notif.params.unwrap_or(json!({}));
                match notif.method.as_str() {
                    protocol::INITIALIZED => self.handle_initialized(),
                    protocol::DID_OPEN => self.handle_did_open(params),
                    protocol::DID_CHANGE => self.handle_did_change(params),
                    protocol::DID_CLOSE => self.handle_did_close(params),
                    protocol::CANCEL_GHOST_TEXT => {
                        self.handle_cancel();
                        Ok(())
                    }
                    protocol::PROJECT_FILE => self.handle_project_file(params),
                    protocol::EXIT => self.handle_exit(),
                    other => {
                        debug!(method = other, "Ignoring notification");
                        Ok(())
                    }
                }
                .map(|_| None)
            }
            LspMessage::Response(_) => Ok(None),
        }
    }

    /// Process a message, queue its response, then start deferred work
    pub fn handle_message(&mut self, message: LspMessage) {
        match &message {
            LspMessage::Request(req) => {
                debug!(method = %req.method, id = %req.id, "Received request")
            }
            LspMessage::Notification(notif) => {
                debug!(method = %notif.method, "Received notification")
            }
            LspMessage::Response(_) => debug!("Ignoring response from client"),
        }

        let (request_id, method) = match &message {
            LspMessage::Request(req) => (Some(req.id.clone()), req.method.clone()),
            LspMessage::Notification(notif) => (None, notif.method.clone()),
            LspMessage::Response(_) => (None, String::new()),
        };

        let result = self.process_message(message);
        match (request_id, result) {
            (Some(id), Ok(value)) => {
                self.send(LspMessage::Response(JsonRpcResponse::success(
                    id,
                    value.unwrap_or(Value::Null),
                )));
            }
            (Some(id), Err(err)) => {
                warn!(method = %method, "Error processing request: {}", err);
                self.send(LspMessage::Response(JsonRpcResponse::error(
                    id,
                    JsonRpcError::from(&err),
                )));
            }
            (None, Err(err)) => warn!(method = %method, "Error processing notification: {}", err),
            (None, Ok(_)) => {}
        }

        if let Some(job) = self.deferred.take() {
            self.launch(job);
        }
    }

    fn launch(&mut self, job: SuggestionJob) {
        let provider = Arc::clone(&self.provider);
        let outgoing = self.outgoing.clone();

        debug!(uri = %job.uri, line = job.line, "Starting suggestion task");
        let task = tokio::spawn(async move {
            let pushed = match provider.complete(&job.request).await {
                Ok(text) => {
                    let text = trim_suffix_overlap(&text, &job.request.suffix);
                    VirtualTextParams::suggestion(&job.uri, job.line, text)
                }
                Err(e) => {
                    warn!(uri = %job.uri, line = job.line, "Completion failed: {}", e);
                    VirtualTextParams::failed(&job.uri, job.line, e.to_string())
                }
            };
            let params = match serde_json::to_value(&pushed) {
                Ok(params) => params,
                Err(e) => {
                    error!("Failed to serialize ghost text: {}", e);
                    return;
                }
            };
            let notification = JsonRpcNotification::new(protocol::VIRTUAL_TEXT, Some(params));
            if outgoing.send(LspMessage::Notification(notification)).is_err() {
                debug!("Outbound channel closed, dropping ghost text");
            } else {
                debug!(uri = %job.uri, line = job.line, failed = pushed.error.is_some(), "Ghost text sent");
            }
        });
        self.tasks.push(task);
    }

    fn send(&self, message: LspMessage) {
        if self.outgoing.send(message).is_err() {
            error!("Outbound channel closed");
        }
    }

    /// Serve one client over a byte stream until `exit` or end of input
    pub async fn serve<R, W>(
        config: ServerConfig,
        provider: Arc<dyn CompletionProvider>,
        reader: R,
        writer: W,
    ) -> LspResult<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (outgoing, mut outbound) = mpsc::unbounded_channel::<LspMessage>();
        let writer_task = tokio::spawn(async move {
            let mut writer = MessageWriter::new(writer);
            while let Some(message) = outbound.recv().await {
                if let Err(e) = writer.write_message(&message).await {
                    error!("Failed to write message: {}", e);
                    break;
                }
            }
        });

        let mut server = Self::new(config, provider, outgoing);
        let mut reader = MessageReader::new(reader);
        info!("Ghost text server started");

        loop {
            match reader.read_message().await {
                Ok(Some(message)) => server.handle_message(message),
                Ok(None) => {
                    info!("Client closed the connection");
                    break;
                }
                Err(LspError::IoError(e)) => {
                    error!("Failed to read message: {}", e);
                    break;
                }
                Err(e) => {
                    warn!("Discarding malformed message: {}", e);
                    server.send(LspMessage::Response(JsonRpcResponse::error(
                        Value::Null,
                        JsonRpcError::from(&e),
                    )));
                }
            }

            if server.state() == ServerState::ShutDown {
                break;
            }
        }

        server.cancel_all();
        drop(server);
        writer_task
            .await
            .map_err(|e| LspError::InternalError(format!("Writer task failed: {}", e)))?;
        info!("Ghost text server stopped");
        Ok(())
    }
}

/// Split document text into lines, dropping `\n` / `\r\n` terminators
fn split_document(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}

fn parse_params<T: DeserializeOwned>(params: Value) -> LspResult<T> {
    serde_json::from_value(params).map_err(|e| LspError::InvalidParams(e.to_string()))
}
