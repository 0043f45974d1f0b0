//! Log-stream subscription engine
//!
//! A long-lived WebSocket session to an indexer's `/ws/logs` endpoint.
//! Subscriptions bootstrap from per-(contract, log-type) cursors, inbound
//! frames dispatch to handlers in arrival order, and durable progress is
//! written back through an injected cursor store. The engine never
//! reconnects on its own: callers construct a new stream from the latest
//! cursor when the transport drops.

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::cursor::{cursor_key, CursorStore, LogCursor};
use crate::SdkError;

// ==================== Socket abstraction ====================

/// One live socket to the indexer. Pluggable so the engine is testable
/// without a server.
#[async_trait]
pub trait LogSocket: Send {
    /// Send one text frame.
    async fn send(&mut self, frame: String) -> Result<(), SdkError>;

    /// Receive the next text frame; `None` when the peer closed.
    async fn recv(&mut self) -> Option<Result<String, SdkError>>;

    /// Close the socket.
    async fn close(&mut self, code: Option<u16>, reason: Option<String>);
}

/// Socket factory.
#[async_trait]
pub trait LogConnector: Send + Sync {
    /// Open a socket to the given URL.
    async fn connect(&self, url: &str) -> Result<Box<dyn LogSocket>, SdkError>;
}

/// The production connector: tokio-tungstenite over TCP/TLS.
#[derive(Debug, Default)]
pub struct WsConnector;

struct WsSocket {
    url: String,
    inner: tokio_tungstenite::WebSocketStream<
        tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
    >,
}

#[async_trait]
impl LogConnector for WsConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn LogSocket>, SdkError> {
        let (inner, _response) = tokio_tungstenite::connect_async(url).await.map_err(|e| {
            SdkError::IndexerRequestFailed {
                url: url.to_string(),
                message: e.to_string(),
            }
        })?;
        Ok(Box::new(WsSocket {
            url: url.to_string(),
            inner,
        }))
    }
}

#[async_trait]
impl LogSocket for WsSocket {
    async fn send(&mut self, frame: String) -> Result<(), SdkError> {
        self.inner
            .send(Message::Text(frame))
            .await
            .map_err(|e| SdkError::IndexerRequestFailed {
                url: self.url.clone(),
                message: e.to_string(),
            })
    }

    async fn recv(&mut self) -> Option<Result<String, SdkError>> {
        loop {
            match self.inner.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text)),
                Ok(Message::Close(_)) => return None,
                // Pings are answered by tungstenite on the next read/write.
                Ok(_) => continue,
                Err(e) => {
                    return Some(Err(SdkError::IndexerRequestFailed {
                        url: self.url.clone(),
                        message: e.to_string(),
                    }));
                }
            }
        }
    }

    async fn close(&mut self, code: Option<u16>, reason: Option<String>) {
        let frame = CloseFrame {
            code: code.map(CloseCode::from).unwrap_or(CloseCode::Normal),
            reason: reason.unwrap_or_default().into(),
        };
        let _ = self.inner.close(Some(frame)).await;
    }
}

// ==================== Subscriptions and handlers ====================

/// One (contract, log type) subscription, optionally with an explicit
/// resume cursor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogSubscription {
    /// Contract index
    pub sc_index: u32,
    /// Log type
    pub log_type: u32,
    /// Explicit resume tick; wins over the cursor store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_tick: Option<u32>,
    /// Explicit resume log id; wins over the cursor store
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_log_id: Option<u64>,
}

impl LogSubscription {
    /// Subscribe with no explicit cursor.
    pub fn new(sc_index: u32, log_type: u32) -> Self {
        Self {
            sc_index,
            log_type,
            last_tick: None,
            last_log_id: None,
        }
    }

    /// The cursor-store key for this subscription.
    pub fn key(&self) -> String {
        cursor_key(self.sc_index, self.log_type)
    }

    fn explicit_cursor(&self) -> Option<LogCursor> {
        if self.last_tick.is_none() && self.last_log_id.is_none() {
            return None;
        }
        Some(LogCursor {
            last_tick: self.last_tick,
            last_log_id: self.last_log_id,
        })
    }
}

/// One delivered log frame.
#[derive(Debug, Clone)]
pub struct LogEvent {
    /// Contract index the log belongs to
    pub sc_index: Option<u32>,
    /// Log type
    pub log_type: Option<u32>,
    /// The log payload
    pub message: Value,
}

/// Callbacks for inbound traffic. All fire on the engine task, in frame
/// arrival order.
#[derive(Clone, Default)]
pub struct LogHandlers {
    /// A log frame arrived
    pub on_log: Option<Arc<dyn Fn(LogEvent) + Send + Sync>>,
    /// The indexer greeted the session
    pub on_welcome: Option<Arc<dyn Fn(Value) + Send + Sync>>,
    /// A subscription action was acknowledged
    pub on_ack: Option<Arc<dyn Fn(Value) + Send + Sync>>,
    /// Catch-up replay finished for a subscription
    pub on_catch_up_complete: Option<Arc<dyn Fn(Value) + Send + Sync>>,
    /// Pong for an application-level ping
    pub on_pong: Option<Arc<dyn Fn(Value) + Send + Sync>>,
    /// The indexer reported an error frame
    pub on_stream_error: Option<Arc<dyn Fn(Value) + Send + Sync>>,
    /// Transport or cursor-store failure; dispatch never blocks on these
    pub on_error: Option<Arc<dyn Fn(SdkError) + Send + Sync>>,
}

impl std::fmt::Debug for LogHandlers {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogHandlers")
            .field("on_log", &self.on_log.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish_non_exhaustive()
    }
}

/// Configuration for one log stream.
#[derive(Default)]
pub struct LogStreamConfig {
    /// Indexer endpoint; `/ws/logs` is appended when missing
    pub url: String,
    /// Subscriptions declared up front
    pub subscriptions: Vec<LogSubscription>,
    /// Top-level resume tick for the batched bootstrap
    pub last_tick: Option<u32>,
    /// Top-level resume log id for the batched bootstrap
    pub last_log_id: Option<u64>,
    /// Durable cursor persistence
    pub cursor_store: Option<Arc<dyn CursorStore>>,
    /// Inbound callbacks
    pub handlers: LogHandlers,
    /// Closes the socket when fired
    pub cancel: Option<CancellationToken>,
}

enum Command {
    Frame(Value),
    Close {
        code: Option<u16>,
        reason: Option<String>,
    },
}

/// A live log-stream session.
pub struct LogStream {
    commands: mpsc::UnboundedSender<Command>,
    cancel: CancellationToken,
}

impl LogStream {
    /// Connect to the indexer and bootstrap the declared subscriptions.
    pub async fn connect(config: LogStreamConfig) -> Result<Self, SdkError> {
        Self::connect_with(Arc::new(WsConnector), config).await
    }

    /// Connect through a custom socket factory (used by tests).
    pub async fn connect_with(
        connector: Arc<dyn LogConnector>,
        config: LogStreamConfig,
    ) -> Result<Self, SdkError> {
        let url = normalize_stream_url(&config.url);
        let mut socket = connector.connect(&url).await?;

        // Resolve each subscription's initial cursor: explicit wins, then
        // the cursor store, then none.
        let mut resolved: Vec<(LogSubscription, Option<LogCursor>)> = Vec::new();
        for sub in &config.subscriptions {
            let cursor = match sub.explicit_cursor() {
                Some(cursor) => Some(cursor),
                None => match &config.cursor_store {
                    Some(store) => match store.get(&sub.key()).await {
                        Ok(cursor) => cursor,
                        Err(e) => {
                            if let Some(handler) = &config.handlers.on_error {
                                handler(e);
                            }
                            None
                        }
                    },
                    None => None,
                },
            };
            resolved.push((sub.clone(), cursor));
        }

        // Exactly one bootstrap: batched when nothing carries its own
        // cursor and there is more than one subscription, per-subscription
        // frames otherwise.
        let no_per_sub_cursor = resolved.iter().all(|(_, cursor)| cursor.is_none());
        if no_per_sub_cursor && resolved.len() > 1 {
            let frame = batched_subscribe_frame(
                resolved.iter().map(|(sub, _)| sub),
                LogCursor {
                    last_tick: config.last_tick,
                    last_log_id: config.last_log_id,
                },
            );
            socket.send(frame.to_string()).await?;
        } else {
            for (sub, cursor) in &resolved {
                let frame = subscribe_frame(sub, *cursor);
                socket.send(frame.to_string()).await?;
            }
        }

        let cancel = config.cancel.clone().unwrap_or_default();
        let (commands, command_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_session(
            socket,
            command_rx,
            cancel.clone(),
            config.handlers,
            config.cursor_store,
        ));

        Ok(Self { commands, cancel })
    }

    /// Subscribe to one (contract, log type), with its explicit cursor if
    /// set.
    pub fn subscribe(&self, sub: &LogSubscription) {
        let _ = self
            .commands
            .send(Command::Frame(subscribe_frame(sub, sub.explicit_cursor())));
    }

    /// Subscribe to several (contract, log type) pairs in one frame, with
    /// an optional shared cursor.
    pub fn subscribe_many(&self, subs: &[LogSubscription], cursor: Option<LogCursor>) {
        let frame = batched_subscribe_frame(subs.iter(), cursor.unwrap_or_default());
        let _ = self.commands.send(Command::Frame(frame));
    }

    /// Unsubscribe from one (contract, log type).
    pub fn unsubscribe(&self, sub: &LogSubscription) {
        let _ = self.commands.send(Command::Frame(json!({
            "action": "unsubscribe",
            "scIndex": sub.sc_index,
            "logType": sub.log_type,
        })));
    }

    /// Drop every subscription on this session.
    pub fn unsubscribe_all(&self) {
        let _ = self
            .commands
            .send(Command::Frame(json!({ "action": "unsubscribeAll" })));
    }

    /// Application-level ping.
    pub fn ping(&self) {
        let _ = self.commands.send(Command::Frame(json!({ "action": "ping" })));
    }

    /// Close the session.
    pub fn close(&self, code: Option<u16>, reason: Option<String>) {
        let _ = self.commands.send(Command::Close { code, reason });
    }

    /// Token that closes the socket when fired.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

fn normalize_stream_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    if trimmed.ends_with("/ws/logs") {
        trimmed.to_string()
    } else {
        format!("{trimmed}/ws/logs")
    }
}

fn cursor_fields(frame: &mut Value, cursor: LogCursor) {
    // The log id is the finer watermark; send it alone when present.
    if let Some(last_log_id) = cursor.last_log_id {
        frame["lastLogId"] = json!(last_log_id);
    } else if let Some(last_tick) = cursor.last_tick {
        frame["lastTick"] = json!(last_tick);
    }
}

fn subscribe_frame(sub: &LogSubscription, cursor: Option<LogCursor>) -> Value {
    let mut frame = json!({
        "action": "subscribe",
        "scIndex": sub.sc_index,
        "logType": sub.log_type,
    });
    if let Some(cursor) = cursor {
        cursor_fields(&mut frame, cursor);
    }
    frame
}

fn batched_subscribe_frame<'a>(
    subs: impl Iterator<Item = &'a LogSubscription>,
    cursor: LogCursor,
) -> Value {
    let subscriptions: Vec<Value> = subs
        .map(|sub| json!({ "scIndex": sub.sc_index, "logType": sub.log_type }))
        .collect();
    let mut frame = json!({
        "action": "subscribe",
        "subscriptions": subscriptions,
    });
    cursor_fields(&mut frame, cursor);
    frame
}

// ==================== Session loop ====================

async fn run_session(
    mut socket: Box<dyn LogSocket>,
    mut commands: mpsc::UnboundedReceiver<Command>,
    cancel: CancellationToken,
    handlers: LogHandlers,
    cursor_store: Option<Arc<dyn CursorStore>>,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                socket.close(None, None).await;
                break;
            }

            command = commands.recv() => match command {
                Some(Command::Frame(frame)) => {
                    if let Err(e) = socket.send(frame.to_string()).await {
                        if let Some(handler) = &handlers.on_error {
                            handler(e);
                        }
                        break;
                    }
                }
                Some(Command::Close { code, reason }) => {
                    socket.close(code, reason).await;
                    break;
                }
                None => {
                    socket.close(None, None).await;
                    break;
                }
            },

            inbound = socket.recv() => match inbound {
                Some(Ok(text)) => dispatch(&text, &handlers, &cursor_store),
                Some(Err(e)) => {
                    if let Some(handler) = &handlers.on_error {
                        handler(e);
                    }
                    break;
                }
                None => {
                    tracing::debug!("log stream closed by peer");
                    break;
                }
            },
        }
    }
}

fn dispatch(text: &str, handlers: &LogHandlers, cursor_store: &Option<Arc<dyn CursorStore>>) {
    // Individual unparseable frames are dropped, not fatal.
    let frame: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!(error = %e, "dropping unparseable log-stream frame");
            return;
        }
    };

    let call = |handler: &Option<Arc<dyn Fn(Value) + Send + Sync>>| {
        if let Some(handler) = handler {
            handler(frame.clone());
        }
    };

    match frame.get("type").and_then(Value::as_str) {
        Some("welcome") => call(&handlers.on_welcome),
        Some("ack") => call(&handlers.on_ack),
        Some("catchUpComplete") => call(&handlers.on_catch_up_complete),
        Some("pong") => call(&handlers.on_pong),
        Some("error") => call(&handlers.on_stream_error),
        Some("log") => {
            let event = LogEvent {
                sc_index: frame.get("scIndex").and_then(value_as_u64).map(|v| v as u32),
                log_type: frame.get("logType").and_then(value_as_u64).map(|v| v as u32),
                message: frame.get("message").cloned().unwrap_or(Value::Null),
            };

            if let Some(handler) = &handlers.on_log {
                handler(event.clone());
            }

            update_cursor(&event, handlers, cursor_store);
        }
        other => {
            tracing::debug!(kind = ?other, "dropping log-stream frame of unknown type");
        }
    }
}

/// Fire-and-forget cursor write for one delivered log. Store failures go to
/// the error handler and never block dispatch.
fn update_cursor(
    event: &LogEvent,
    handlers: &LogHandlers,
    cursor_store: &Option<Arc<dyn CursorStore>>,
) {
    let Some(store) = cursor_store else { return };
    let (Some(sc_index), Some(log_type)) = (event.sc_index, event.log_type) else {
        return;
    };

    let log_id = event
        .message
        .get("logId")
        .or_else(|| event.message.get("id"))
        .and_then(value_as_u64);
    let tick = event
        .message
        .get("tick")
        .or_else(|| event.message.get("tickNumber"))
        .and_then(value_as_u64);

    let cursor = if let Some(log_id) = log_id {
        LogCursor {
            last_tick: None,
            last_log_id: Some(log_id),
        }
    } else if let Some(tick) = tick {
        LogCursor {
            last_tick: Some(tick as u32),
            last_log_id: None,
        }
    } else {
        return;
    };

    let store = store.clone();
    let on_error = handlers.on_error.clone();
    let key = cursor_key(sc_index, log_type);
    tokio::spawn(async move {
        if let Err(e) = store.set(&key, cursor).await {
            if let Some(handler) = on_error {
                handler(e);
            }
        }
    });
}

fn value_as_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

// ==================== Mock connector ====================

/// Test-side handle for a [`MockConnector`] session.
pub struct MockStreamHandle {
    /// Frames the engine sent, in order
    pub outbound: mpsc::UnboundedReceiver<String>,
    /// Inject inbound frames; dropping the sender closes the stream
    pub inbound: mpsc::UnboundedSender<String>,
}

impl MockStreamHandle {
    /// Next frame the engine sent, as JSON.
    pub async fn next_sent(&mut self) -> Option<Value> {
        let text = self.outbound.recv().await?;
        serde_json::from_str(&text).ok()
    }

    /// Inject one inbound frame.
    pub fn push(&self, frame: Value) {
        let _ = self.inbound.send(frame.to_string());
    }
}

/// One-shot in-memory connector for tests.
pub struct MockConnector {
    wires: parking_lot::Mutex<Option<MockSocket>>,
}

/// Create a mock connector and its test handle.
pub fn mock_connector() -> (Arc<MockConnector>, MockStreamHandle) {
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (in_tx, in_rx) = mpsc::unbounded_channel();

    let connector = Arc::new(MockConnector {
        wires: parking_lot::Mutex::new(Some(MockSocket {
            outbound: out_tx,
            inbound: in_rx,
        })),
    });
    let handle = MockStreamHandle {
        outbound: out_rx,
        inbound: in_tx,
    };
    (connector, handle)
}

struct MockSocket {
    outbound: mpsc::UnboundedSender<String>,
    inbound: mpsc::UnboundedReceiver<String>,
}

#[async_trait]
impl LogConnector for MockConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn LogSocket>, SdkError> {
        self.wires
            .lock()
            .take()
            .map(|socket| Box::new(socket) as Box<dyn LogSocket>)
            .ok_or_else(|| SdkError::IndexerRequestFailed {
                url: url.to_string(),
                message: "mock connector already consumed".to_string(),
            })
    }
}

#[async_trait]
impl LogSocket for MockSocket {
    async fn send(&mut self, frame: String) -> Result<(), SdkError> {
        self.outbound
            .send(frame)
            .map_err(|_| SdkError::IndexerRequestFailed {
                url: "mock".to_string(),
                message: "mock stream closed".to_string(),
            })
    }

    async fn recv(&mut self) -> Option<Result<String, SdkError>> {
        self.inbound.recv().await.map(Ok)
    }

    async fn close(&mut self, _code: Option<u16>, _reason: Option<String>) {}
}
