//! Wire protocol (§6): line-delimited JSON frames over the WS connection.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum InboundFrame {
    Subscribe { pool: String, limit: Option<usize> },
    Unsubscribe { pool: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum OutboundFrame {
    Hello { #[serde(rename = "programId")] program_id: String, ts: i64 },
    Snapshot { pool: String, trades: Vec<Value>, ts: i64 },
    Trade { pool: String, data: Value },
    Event { pool: Option<String>, data: Value },
}

impl OutboundFrame {
    /// The pool this frame is scoped to, for routing purposes. `None`
    /// means the frame is global (e.g. `hello`) and goes to every client.
    /// For an `event` frame with no explicit pool, peeks
    /// `data.{pool|pairId|poolId}` per §4.9.
    pub fn routing_pool(&self) -> Option<String> {
        match self {
            OutboundFrame::Hello { .. } => None,
            OutboundFrame::Snapshot { pool, .. } => Some(pool.clone()),
            OutboundFrame::Trade { pool, .. } => Some(pool.clone()),
            OutboundFrame::Event { pool: Some(pool), .. } => Some(pool.clone()),
            OutboundFrame::Event { pool: None, data } => peek_pool_hint(data),
        }
    }
}

fn peek_pool_hint(data: &Value) -> Option<String> {
    for key in ["pool", "pairId", "poolId"] {
        if let Some(value) = data.get(key).and_then(Value::as_str) {
            return Some(value.to_string());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subscribe_frame_parses() {
        let frame: InboundFrame = serde_json::from_str(r#"{"type":"subscribe","pool":"P1","limit":10}"#).unwrap();
        match frame {
            InboundFrame::Subscribe { pool, limit } => {
                assert_eq!(pool, "P1");
                assert_eq!(limit, Some(10));
            }
            _ => panic!("expected subscribe"),
        }
    }

    #[test]
    fn event_frame_falls_back_to_pool_hint() {
        let frame = OutboundFrame::Event { pool: None, data: json!({"poolId": "P2", "signature": "sig"}) };
        assert_eq!(frame.routing_pool(), Some("P2".to_string()));
    }

    #[test]
    fn hello_frame_has_no_routing_pool() {
        let frame = OutboundFrame::Hello { program_id: "prog".to_string(), ts: 0 };
        assert_eq!(frame.routing_pool(), None);
    }
}
