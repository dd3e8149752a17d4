//! Ghost-text LSP client
//!
//! [`LspClient`] correlates responses to requests by JSON-RPC id and fans
//! notifications out over a broadcast channel. Every message read is stamped
//! with its position on the wire, so a caller can tell which notifications
//! followed a given response. [`LspGhostTextBackend`] puts the core's backend
//! contract on top of it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ghostline_core::{
    BackendError, BackendReply, GhostTextBackend, GhostTextPayload, RequestId, TriggerParams,
};
use serde_json::{json, Value};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{broadcast, mpsc, oneshot, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::protocol::{self, TextDocumentPositionParams, TriggerReply, VirtualTextParams};
use crate::transport::{
    JsonRpcError, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, LspMessage, MessageReader,
    MessageWriter,
};
use crate::types::{LspError, LspResult};

/// Default timeout for requests to the server
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// A response together with the wire sequence number it was read at
type Sequenced = (u64, LspResult<Value>);

type PendingRequests = Arc<RwLock<HashMap<u64, oneshot::Sender<Sequenced>>>>;

/// What the reader task publishes to subscribers
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// A notification and its position among all messages read
    Notification {
        sequence: u64,
        notification: JsonRpcNotification,
    },
    /// The connection ended
    Closed,
}

/// Connection to a ghost-text server
pub struct LspClient {
    next_id: AtomicU64,
    pending: PendingRequests,
    closed: Arc<AtomicBool>,
    outgoing: mpsc::UnboundedSender<LspMessage>,
    notifications: broadcast::Sender<ServerEvent>,
    request_timeout: Duration,
    tasks: Vec<JoinHandle<()>>,
}

impl LspClient {
    /// Start reader and writer tasks over a byte stream
    pub fn connect<R, W>(reader: R, writer: W) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let pending: PendingRequests = Arc::new(RwLock::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let (outgoing, mut outbound) = mpsc::unbounded_channel::<LspMessage>();
        let (notifications, _) = broadcast::channel(100);

        let writer_task = tokio::spawn(async move {
            let mut writer = MessageWriter::new(writer);
            while let Some(message) = outbound.recv().await {
                if let Err(e) = writer.write_message(&message).await {
                    error!("Failed to write message: {}", e);
                    break;
                }
            }
        });

        let reader_task = tokio::spawn(read_loop(
            MessageReader::new(reader),
            Arc::clone(&pending),
            Arc::clone(&closed),
            notifications.clone(),
            outgoing.clone(),
        ));

        Self {
            next_id: AtomicU64::new(1),
            pending,
            closed,
            outgoing,
            notifications,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            tasks: vec![writer_task, reader_task],
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Send a request and wait for its response
    pub async fn request(&self, method: &str, params: Option<Value>) -> LspResult<Value> {
        self.request_sequenced(method, params)
            .await
            .map(|(_, result)| result)
    }

    /// Like [`request`](Self::request), also returning the wire sequence
    /// number the response was read at
    pub async fn request_sequenced(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> LspResult<(u64, Value)> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.write().await;
            if self.closed.load(Ordering::SeqCst) {
                return Err(LspError::ConnectionClosed);
            }
            pending.insert(id, tx);
        }

        let message = LspMessage::Request(JsonRpcRequest::new(json!(id), method, params));
        if self.outgoing.send(message).is_err() {
            self.pending.write().await.remove(&id);
            return Err(LspError::ConnectionClosed);
        }
        debug!(id, method, "Request sent");

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok((sequence, result))) => result.map(|value| (sequence, value)),
            Ok(Err(_)) => Err(LspError::ConnectionClosed),
            Err(_) => {
                self.pending.write().await.remove(&id);
                Err(LspError::TimeoutError(format!(
                    "{} timed out after {}ms",
                    method,
                    self.request_timeout.as_millis()
                )))
            }
        }
    }

    /// Send a notification without waiting
    pub fn notify(&self, method: &str, params: Option<Value>) -> LspResult<()> {
        self.outgoing
            .send(LspMessage::Notification(JsonRpcNotification::new(method, params)))
            .map_err(|_| LspError::ConnectionClosed)
    }

    /// Subscribe to server notifications
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.notifications.subscribe()
    }

    /// Requests still waiting for a response
    pub async fn pending_count(&self) -> usize {
        self.pending.read().await.len()
    }

    /// `initialize` followed by `initialized`
    pub async fn initialize(&self, root_uri: Option<&str>) -> LspResult<Value> {
        let result = self
            .request(
                protocol::INITIALIZE,
                Some(json!({
                    "processId": std::process::id(),
                    "rootUri": root_uri,
                    "capabilities": {}
                })),
            )
            .await?;
        self.notify(protocol::INITIALIZED, Some(json!({})))?;
        Ok(result)
    }

    pub fn did_open(&self, uri: &str, language_id: &str, text: &str) -> LspResult<()> {
        self.notify(
            protocol::DID_OPEN,
            Some(json!({
                "textDocument": {"uri": uri, "languageId": language_id, "version": 0, "text": text}
            })),
        )
    }

    /// Full-document change
    pub fn did_change(&self, uri: &str, version: u64, text: &str) -> LspResult<()> {
        self.notify(
            protocol::DID_CHANGE,
            Some(json!({
                "textDocument": {"uri": uri, "version": version},
                "contentChanges": [{"text": text}]
            })),
        )
    }

    pub fn did_close(&self, uri: &str) -> LspResult<()> {
        self.notify(protocol::DID_CLOSE, Some(json!({"textDocument": {"uri": uri}})))
    }

    /// Share a repository file as completion context
    pub fn project_file(&self, root: &str, path: &str, content: &str) -> LspResult<()> {
        self.notify(
            protocol::PROJECT_FILE,
            Some(json!({"root": root, "path": path, "content": content})),
        )
    }

    /// `shutdown` followed by `exit`
    pub async fn shutdown(&self) -> LspResult<()> {
        self.request(protocol::SHUTDOWN, None).await?;
        self.notify(protocol::EXIT, None)
    }
}

impl Drop for LspClient {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

async fn read_loop<R: AsyncRead + Unpin>(
    mut reader: MessageReader<R>,
    pending: PendingRequests,
    closed: Arc<AtomicBool>,
    notifications: broadcast::Sender<ServerEvent>,
    outgoing: mpsc::UnboundedSender<LspMessage>,
) {
    let mut sequence: u64 = 0;
    loop {
        let message = reader.read_message().await;
        if matches!(message, Ok(Some(_))) {
            sequence += 1;
        }
        match message {
            Ok(Some(LspMessage::Response(response))) => {
                let Some(id) = response.id.as_u64() else {
                    warn!(id = %response.id, "Response with unexpected id");
                    continue;
                };
                match pending.write().await.remove(&id) {
                    Some(tx) => {
                        let _ = tx.send((sequence, response.into_result()));
                    }
                    None => debug!(id, "Response for unknown or abandoned request"),
                }
            }
            Ok(Some(LspMessage::Notification(notification))) => {
                let _ = notifications.send(ServerEvent::Notification {
                    sequence,
                    notification,
                });
            }
            Ok(Some(LspMessage::Request(request))) => {
                debug!(method = %request.method, "Declining server request");
                let _ = outgoing.send(LspMessage::Response(JsonRpcResponse::error(
                    request.id,
                    JsonRpcError::method_not_found(&request.method),
                )));
            }
            Ok(None) => {
                debug!("Server closed the connection");
                break;
            }
            Err(LspError::IoError(e)) => {
                error!("Failed to read from server: {}", e);
                break;
            }
            Err(e) => warn!("Discarding malformed message: {}", e),
        }
    }

    // Dropping the senders fails every waiter with ConnectionClosed
    let mut pending = pending.write().await;
    closed.store(true, Ordering::SeqCst);
    pending.clear();
    let _ = notifications.send(ServerEvent::Closed);
}

/// [`GhostTextBackend`] speaking the ghost-text LSP extension
pub struct LspGhostTextBackend {
    client: Arc<LspClient>,
}

impl LspGhostTextBackend {
    pub fn new(client: Arc<LspClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &Arc<LspClient> {
        &self.client
    }
}

#[async_trait]
impl GhostTextBackend for LspGhostTextBackend {
    /// Send the trigger and, when it is acknowledged, wait for its push
    ///
    /// The push answering an acknowledged trigger is the first matching
    /// `ghostText/virtualText` read after the acknowledgement. Pushes read
    /// before it belong to earlier triggers, even on the same line.
    async fn trigger(&self, params: TriggerParams) -> BackendReply {
        let wire = serde_json::to_value(TextDocumentPositionParams::from(&params))
            .map_err(|e| BackendError::Malformed(e.to_string()))?;
        // Subscribe first so a push right behind the acknowledgement is not missed
        let mut events = self.client.subscribe();
        let (acked_at, result) = self
            .client
            .request_sequenced(protocol::TRIGGER_GHOST_TEXT, Some(wire))
            .await?;

        match parse_trigger_reply(&params, result)? {
            Some(payload) => Ok(Some(payload)),
            None => {
                let timeout = self.client.request_timeout();
                match tokio::time::timeout(timeout, next_push(&mut events, &params, acked_at)).await
                {
                    Ok(reply) => reply.map(Some),
                    Err(_) => Err(BackendError::Unreachable(format!(
                        "no ghost text within {}ms of acknowledgement",
                        timeout.as_millis()
                    ))),
                }
            }
        }
    }

    fn cancel(&self, request_id: RequestId) {
        debug!(request_id, "Sending ghost text cancel");
        if let Err(e) = self.client.notify(protocol::CANCEL_GHOST_TEXT, None) {
            debug!(request_id, "Cancel not sent: {}", e);
        }
    }
}

async fn next_push(
    events: &mut broadcast::Receiver<ServerEvent>,
    params: &TriggerParams,
    acked_at: u64,
) -> Result<GhostTextPayload, BackendError> {
    loop {
        match events.recv().await {
            Ok(ServerEvent::Notification {
                sequence,
                notification,
            }) => {
                if sequence <= acked_at || notification.method != protocol::VIRTUAL_TEXT {
                    continue;
                }
                let params_value = notification.params.unwrap_or(Value::Null);
                let pushed = match serde_json::from_value::<VirtualTextParams>(params_value) {
                    Ok(pushed) => pushed,
                    Err(e) => {
                        warn!("Malformed virtual text notification: {}", e);
                        continue;
                    }
                };
                if !pushed.is_for(params) {
                    debug!(uri = %pushed.uri, line = pushed.line, "Virtual text for another anchor");
                    continue;
                }
                return pushed.into_reply();
            }
            Ok(ServerEvent::Closed) | Err(broadcast::error::RecvError::Closed) => {
                return Err(LspError::ConnectionClosed.into());
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Notification subscriber lagged");
            }
        }
    }
}

/// Interpret the result of `custom/triggerGhostText`
///
/// `{ack: true}` (`Ok(None)`) means the text follows as a push; `null` or
/// `{ack: false}` means there is nothing to suggest.
pub fn parse_trigger_reply(params: &TriggerParams, result: Value) -> BackendReply {
    let nothing = || {
        Ok(Some(GhostTextPayload::new(
            params.document.as_str(),
            params.position.line,
            "",
        )))
    };

    if result.is_null() {
        return nothing();
    }
    match serde_json::from_value::<TriggerReply>(result) {
        Ok(TriggerReply::Ack { ack: true }) => Ok(None),
        Ok(TriggerReply::Ack { ack: false }) => nothing(),
        Ok(TriggerReply::Inline(payload)) => Ok(Some(payload)),
        Err(e) => Err(BackendError::Malformed(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ghostline_core::{DocumentId, Position};

    fn params() -> TriggerParams {
        TriggerParams {
            document: DocumentId::new("file:///a.py"),
            position: Position::new(2, 5),
        }
    }

    #[test]
    fn test_parse_ack() {
        assert_eq!(parse_trigger_reply(&params(), json!({"ack": true})), Ok(None));
    }

    #[test]
    fn test_parse_inline_payload() {
        let reply = parse_trigger_reply(
            &params(),
            json!({"uri": "file:///a.py", "line": 2, "text": "x"}),
        );
        assert_eq!(reply, Ok(Some(GhostTextPayload::new("file:///a.py", 2, "x"))));
    }

    #[test]
    fn test_parse_null_is_no_suggestion() {
        let reply = parse_trigger_reply(&params(), Value::Null).unwrap().unwrap();
        assert!(reply.is_empty());
        assert_eq!(reply.line, 2);
    }

    #[test]
    fn test_parse_garbage_is_malformed() {
        assert!(matches!(
            parse_trigger_reply(&params(), json!([1, 2])),
            Err(BackendError::Malformed(_))
        ));
    }
}
