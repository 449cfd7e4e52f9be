//! Low-level CDP WebSocket client
//!
//! Connects to a page-level DevTools WebSocket endpoint and speaks
//! JSON-RPC: commands are correlated to responses by id, protocol events
//! are fanned out on a broadcast channel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// A protocol event pushed by the browser (method + params)
#[derive(Debug, Clone)]
pub struct CdpEvent {
    pub method: String,
    pub params: Value,
}

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Value>>>>;

/// Client for one page-level DevTools WebSocket connection
pub struct CdpClient {
    cmd_tx: mpsc::UnboundedSender<Message>,
    pending: PendingMap,
    next_id: AtomicU64,
    event_tx: broadcast::Sender<CdpEvent>,
    alive: Arc<AtomicBool>,
    command_wait: Duration,
}

impl CdpClient {
    /// Connect to a `ws://.../devtools/page/<id>` endpoint
    pub async fn connect(ws_url: &str, command_wait: Duration) -> Result<Self> {
        let (ws, _) = connect_async(ws_url)
            .await
            .map_err(|e| Error::Cdp(format!("connect {}: {}", ws_url, e)))?;
        let (mut sink, mut stream) = ws.split();

        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel::<Message>();
        let (event_tx, _) = broadcast::channel(256);
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let alive = Arc::new(AtomicBool::new(true));

        // Writer task: serialize outgoing commands onto the socket
        tokio::spawn(async move {
            while let Some(msg) = cmd_rx.recv().await {
                if sink.send(msg).await.is_err() {
                    break;
                }
            }
        });

        // Reader task: route responses to pending callers, events to
        // the broadcast channel
        let reader_pending = Arc::clone(&pending);
        let reader_alive = Arc::clone(&alive);
        let reader_events = event_tx.clone();
        tokio::spawn(async move {
            while let Some(msg) = stream.next().await {
                let text = match msg {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Close(_)) | Err(_) => break,
                    Ok(_) => continue,
                };
                let value: Value = match serde_json::from_str(&text) {
                    Ok(v) => v,
                    Err(e) => {
                        warn!("Unparseable CDP frame: {}", e);
                        continue;
                    }
                };

                if let Some(id) = value.get("id").and_then(Value::as_u64) {
                    let sender = reader_pending.lock().unwrap().remove(&id);
                    if let Some(sender) = sender {
                        let _ = sender.send(value);
                    }
                } else if let Some(method) = value.get("method").and_then(Value::as_str) {
                    let params = value.get("params").cloned().unwrap_or(Value::Null);
                    let _ = reader_events.send(CdpEvent {
                        method: method.to_string(),
                        params,
                    });
                }
            }
            debug!("CDP connection closed");
            reader_alive.store(false, Ordering::SeqCst);
            // Pending callers see a dropped sender and report the loss
            reader_pending.lock().unwrap().clear();
        });

        Ok(Self {
            cmd_tx,
            pending,
            next_id: AtomicU64::new(1),
            event_tx,
            alive,
            command_wait,
        })
    }

    /// True while the reader task still owns a live connection
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Subscribe to protocol events (e.g. `Page.domContentEventFired`)
    pub fn events(&self) -> broadcast::Receiver<CdpEvent> {
        self.event_tx.subscribe()
    }

    /// Issue one command and wait (bounded) for its response.
    ///
    /// Returns the command's `result` object; a protocol-level error
    /// response maps to `Error::Cdp`.
    pub async fn call(&self, method: &str, params: Value) -> Result<Value> {
        if !self.is_alive() {
            return Err(Error::Cdp("connection closed".to_string()));
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().insert(id, tx);

        let frame = json!({ "id": id, "method": method, "params": params });
        if self.cmd_tx.send(Message::Text(frame.to_string())).is_err() {
            self.pending.lock().unwrap().remove(&id);
            return Err(Error::Cdp("connection closed".to_string()));
        }

        let response = match tokio::time::timeout(self.command_wait, rx).await {
            Ok(Ok(value)) => value,
            Ok(Err(_)) => return Err(Error::Cdp("connection closed".to_string())),
            Err(_) => {
                self.pending.lock().unwrap().remove(&id);
                return Err(Error::Timeout(format!("{} response", method)));
            }
        };

        if let Some(error) = response.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            return Err(Error::Cdp(format!("{}: {}", method, message)));
        }

        Ok(response.get("result").cloned().unwrap_or(Value::Null))
    }
}
