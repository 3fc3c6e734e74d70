//! `logsSubscribe` websocket stream (§6 upstream: `subscribeLogs`). A stream
//! is backed by a single connection and a background task; cancellation is
//! explicit via a shared `stopped` flag, matching the shutdown discipline in
//! §5 (checked before processing the next notification).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use types::Signature;

use crate::error::RpcError;
use crate::model::{LogFilter, LogNotification};

pub struct LogSubscription {
    receiver: mpsc::UnboundedReceiver<LogNotification>,
    stopped: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl LogSubscription {
    pub async fn connect(ws_url: &str, filter: LogFilter) -> Result<Self, RpcError> {
        let (mut ws, _) = connect_async(ws_url).await?;

        let filter_param = match &filter {
            LogFilter::Mentions(addrs) => json!({ "mentions": addrs.iter().map(|a| a.as_str()).collect::<Vec<_>>() }),
            LogFilter::Program(program_id) => json!({ "mentions": [program_id.as_str()] }),
        };
        let subscribe = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "logsSubscribe",
            "params": [filter_param, { "commitment": "confirmed" }],
        });
        ws.send(Message::Text(subscribe.to_string())).await?;

        let (tx, rx) = mpsc::unbounded_channel();
        let stopped = Arc::new(AtomicBool::new(false));
        let task_stopped = stopped.clone();

        let task = tokio::spawn(async move {
            while !task_stopped.load(Ordering::Relaxed) {
                let Some(message) = ws.next().await else {
                    break;
                };
                let Ok(Message::Text(text)) = message else {
                    if matches!(message, Ok(Message::Close(_)) | Err(_)) {
                        break;
                    }
                    continue;
                };
                if let Some(notification) = parse_logs_notification(&text) {
                    if tx.send(notification).is_err() {
                        break;
                    }
                }
            }
        });

        Ok(Self {
            receiver: rx,
            stopped,
            task,
        })
    }

    /// Await the next log notification. Returns `None` once the connection
    /// closes or the subscription has been cancelled.
    pub async fn next(&mut self) -> Option<LogNotification> {
        self.receiver.recv().await
    }

    pub fn unsubscribe(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }
}

impl Drop for LogSubscription {
    fn drop(&mut self) {
        self.stopped.store(true, Ordering::Relaxed);
        self.task.abort();
    }
}

fn parse_logs_notification(text: &str) -> Option<LogNotification> {
    let v: Value = serde_json::from_str(text).ok()?;
    if v.get("method")?.as_str()? != "logsNotification" {
        return None;
    }
    let value = v.get("params")?.get("result")?.get("value")?;
    Some(LogNotification {
        signature: Signature::new_unchecked(value.get("signature")?.as_str()?),
        slot: v
            .get("params")?
            .get("result")?
            .get("context")
            .and_then(|c| c.get("slot"))
            .and_then(Value::as_u64)
            .unwrap_or_default(),
        logs: value
            .get("logs")?
            .as_array()?
            .iter()
            .filter_map(|l| l.as_str().map(String::from))
            .collect(),
        err: value.get("err").filter(|e| !e.is_null()).cloned(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_logs_notification() {
        let text = json!({
            "jsonrpc": "2.0",
            "method": "logsNotification",
            "params": {
                "result": {
                    "context": { "slot": 42 },
                    "value": { "signature": "sig1", "err": null, "logs": ["Program log: hi"] }
                },
                "subscription": 1,
            }
        })
        .to_string();
        let n = parse_logs_notification(&text).unwrap();
        assert_eq!(n.signature.as_str(), "sig1");
        assert_eq!(n.slot, 42);
        assert_eq!(n.logs, vec!["Program log: hi".to_string()]);
    }

    #[test]
    fn ignores_non_notification_messages() {
        let text = json!({ "jsonrpc": "2.0", "id": 1, "result": 5 }).to_string();
        assert!(parse_logs_notification(&text).is_none());
    }
}
