//! CDP WebSocket connection
//!
//! Request/response plumbing for one DevTools WebSocket. Commands are
//! correlated with replies through a pending map keyed by command ID, and
//! protocol events are fanned out to subscribers. The socket is split at
//! connect time so the reader task never contends with command senders.

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, warn};

use crate::error::{Error, Result};

type WsWriter = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsReader = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// Outgoing CDP command frame
#[derive(Debug, Serialize)]
struct CdpRequest {
    id: u64,
    method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<serde_json::Value>,
}

/// Incoming reply to a command
#[derive(Debug, Deserialize)]
struct CdpReply {
    id: u64,
    #[serde(default)]
    result: serde_json::Value,
    error: Option<CdpErrorPayload>,
}

#[derive(Debug, Deserialize)]
struct CdpErrorPayload {
    code: i64,
    message: String,
    data: Option<serde_json::Value>,
}

/// Incoming protocol notification
#[derive(Debug, Deserialize)]
struct CdpNotification {
    method: String,
    #[serde(default)]
    params: serde_json::Value,
}

/// CDP event broadcast to subscribers
#[derive(Debug, Clone)]
pub struct CdpEvent {
    pub method: String,
    pub params: serde_json::Value,
}

/// Command awaiting its reply
#[derive(Debug)]
struct PendingCommand {
    /// Response channel sender
    sender: oneshot::Sender<CdpReply>,
    /// Command method (for logging)
    method: String,
}

/// WebSocket connection to a single CDP endpoint
#[derive(Debug)]
pub struct CdpConnection {
    /// WebSocket URL
    url: String,
    /// Write half of the socket
    writer: Arc<Mutex<WsWriter>>,
    /// Next command ID
    next_id: AtomicU64,
    /// Commands waiting for replies (ID -> response sender)
    pending: Arc<Mutex<HashMap<u64, PendingCommand>>>,
    /// Event subscribers
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<CdpEvent>>>>,
    /// Is connection active
    is_active: Arc<AtomicBool>,
    /// Per-command reply timeout
    command_timeout: Duration,
}

impl CdpConnection {
    /// Connect to a CDP WebSocket endpoint
    ///
    /// Spawns the reader task that routes replies and events for the life of
    /// the connection.
    pub async fn connect(url: &str, command_timeout: Duration) -> Result<Arc<Self>> {
        debug!("Connecting to CDP WebSocket: {}", url);

        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|e| Error::websocket(format!("Failed to connect to {}: {}", url, e)))?;

        let (writer, reader) = ws_stream.split();

        let connection = Arc::new(Self {
            url: url.to_string(),
            writer: Arc::new(Mutex::new(writer)),
            next_id: AtomicU64::new(1),
            pending: Arc::new(Mutex::new(HashMap::new())),
            subscribers: Arc::new(Mutex::new(Vec::new())),
            is_active: Arc::new(AtomicBool::new(true)),
            command_timeout,
        });

        tokio::spawn(Self::read_loop(
            reader,
            Arc::clone(&connection.writer),
            Arc::clone(&connection.pending),
            Arc::clone(&connection.subscribers),
            Arc::clone(&connection.is_active),
        ));

        Ok(connection)
    }

    /// Get the WebSocket URL this connection is attached to
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Check if connection is active
    pub fn is_active(&self) -> bool {
        self.is_active.load(Ordering::SeqCst)
    }

    /// Send a CDP command and wait for its result
    pub async fn send_command(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value> {
        if !self.is_active.load(Ordering::SeqCst) {
            return Err(Error::websocket("Connection is not active"));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = CdpRequest {
            id,
            method: method.to_string(),
            params: if params.is_null() { None } else { Some(params) },
        };
        let json = serde_json::to_string(&request)?;

        let (sender, receiver) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(
                id,
                PendingCommand {
                    sender,
                    method: method.to_string(),
                },
            );
        }

        debug!("Sending CDP command {}: {}", id, method);

        {
            let mut writer = self.writer.lock().await;
            if let Err(e) = writer.send(Message::Text(json)).await {
                self.pending.lock().await.remove(&id);
                return Err(Error::websocket(format!(
                    "Failed to send {} to {}: {}",
                    method, self.url, e
                )));
            }
        }

        match tokio::time::timeout(self.command_timeout, receiver).await {
            Ok(Ok(reply)) => {
                if let Some(error) = reply.error {
                    let detail = error
                        .data
                        .as_ref()
                        .map(|d| format!(": {}", d))
                        .unwrap_or_default();
                    return Err(Error::cdp(format!(
                        "{} failed: {} (code {}){}",
                        method, error.message, error.code, detail
                    )));
                }
                Ok(reply.result)
            }
            Ok(Err(_)) => Err(Error::websocket(format!(
                "Connection closed while waiting for {}",
                method
            ))),
            Err(_) => {
                self.pending.lock().await.remove(&id);
                Err(Error::timeout(format!(
                    "{} got no reply within {:?}",
                    method, self.command_timeout
                )))
            }
        }
    }

    /// Evaluate a JavaScript expression in the attached target
    ///
    /// Wraps `Runtime.evaluate` with by-value results and promise awaiting.
    /// Exceptions thrown by the script surface as script execution errors.
    pub async fn evaluate(&self, expression: &str) -> Result<serde_json::Value> {
        let result = self
            .send_command(
                "Runtime.evaluate",
                serde_json::json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
            )
            .await?;

        if let Some(exception) = result.get("exceptionDetails") {
            let text = exception
                .get("exception")
                .and_then(|e| e.get("description"))
                .and_then(|v| v.as_str())
                .or_else(|| exception.get("text").and_then(|v| v.as_str()))
                .unwrap_or("JavaScript exception");
            return Err(Error::script_execution_failed(text));
        }

        Ok(result
            .get("result")
            .and_then(|r| r.get("value"))
            .cloned()
            .unwrap_or(serde_json::Value::Null))
    }

    /// Subscribe to protocol events
    ///
    /// Every event received after this call is delivered to the returned
    /// channel until the receiver is dropped.
    pub async fn subscribe(&self) -> mpsc::UnboundedReceiver<CdpEvent> {
        let (sender, receiver) = mpsc::unbounded_channel();
        self.subscribers.lock().await.push(sender);
        receiver
    }

    /// Close the connection
    pub async fn close(&self) -> Result<()> {
        debug!("Closing CDP connection to {}", self.url);

        self.is_active.store(false, Ordering::SeqCst);

        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.send(Message::Close(None)).await {
            debug!("Close frame not delivered: {}", e);
        }

        Ok(())
    }

    /// Reader task: routes replies to pending commands and events to subscribers
    async fn read_loop(
        mut reader: WsReader,
        writer: Arc<Mutex<WsWriter>>,
        pending: Arc<Mutex<HashMap<u64, PendingCommand>>>,
        subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<CdpEvent>>>>,
        is_active: Arc<AtomicBool>,
    ) {
        while is_active.load(Ordering::SeqCst) {
            match reader.next().await {
                Some(Ok(Message::Text(text))) => {
                    Self::dispatch_message(&text, &pending, &subscribers).await;
                }
                Some(Ok(Message::Ping(data))) => {
                    let mut writer = writer.lock().await;
                    if let Err(e) = writer.send(Message::Pong(data)).await {
                        warn!("Failed to send pong: {}", e);
                    }
                }
                Some(Ok(Message::Close(_))) => {
                    debug!("WebSocket close frame received");
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("WebSocket read error: {}", e);
                    break;
                }
                None => {
                    debug!("WebSocket stream ended");
                    break;
                }
            }
        }

        is_active.store(false, Ordering::SeqCst);

        // Dropping the senders fails every command still waiting for a reply.
        pending.lock().await.clear();

        debug!("CDP message loop exited");
    }

    /// Route one incoming frame
    async fn dispatch_message(
        text: &str,
        pending: &Arc<Mutex<HashMap<u64, PendingCommand>>>,
        subscribers: &Arc<Mutex<Vec<mpsc::UnboundedSender<CdpEvent>>>>,
    ) {
        if let Ok(reply) = serde_json::from_str::<CdpReply>(text) {
            let mut pending = pending.lock().await;
            if let Some(command) = pending.remove(&reply.id) {
                debug!("Reply {} for {}", reply.id, command.method);
                let _ = command.sender.send(reply);
            } else {
                warn!("Reply for unknown command ID: {}", reply.id);
            }
            return;
        }

        if let Ok(notification) = serde_json::from_str::<CdpNotification>(text) {
            let event = CdpEvent {
                method: notification.method,
                params: notification.params,
            };

            let mut subscribers = subscribers.lock().await;
            subscribers.retain(|sender| sender.send(event.clone()).is_ok());
            return;
        }

        warn!("Unknown CDP message format: {}", text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_omits_null_params() {
        let request = CdpRequest {
            id: 7,
            method: "Page.enable".to_string(),
            params: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"id":7,"method":"Page.enable"}"#);
    }

    #[test]
    fn test_reply_parsing() {
        let reply: CdpReply =
            serde_json::from_str(r#"{"id":3,"result":{"frameId":"F1"}}"#).unwrap();
        assert_eq!(reply.id, 3);
        assert_eq!(reply.result["frameId"], "F1");
        assert!(reply.error.is_none());

        let failed: CdpReply =
            serde_json::from_str(r#"{"id":4,"error":{"code":-32000,"message":"No node"}}"#)
                .unwrap();
        let error = failed.error.unwrap();
        assert_eq!(error.code, -32000);
        assert_eq!(error.message, "No node");
        assert!(error.data.is_none());
    }

    #[test]
    fn test_notification_parsing() {
        let text = r#"{"method":"Page.lifecycleEvent","params":{"name":"networkIdle"}}"#;
        assert!(serde_json::from_str::<CdpReply>(text).is_err());

        let notification: CdpNotification = serde_json::from_str(text).unwrap();
        assert_eq!(notification.method, "Page.lifecycleEvent");
        assert_eq!(notification.params["name"], "networkIdle");
    }
}
