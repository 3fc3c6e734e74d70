use thiserror::Error;

/// Failures surfaced by [`crate::client::RpcClient`]. Every variant here is
/// "transient" in the Ingestion Engine's error taxonomy: the caller retries
/// later rather than marking a signature seen.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport error calling {method}: {source}")]
    Transport {
        method: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("rpc node returned error {code} for {method}: {message}")]
    JsonRpc {
        method: &'static str,
        code: i64,
        message: String,
    },

    #[error("malformed rpc response for {method}: {source}")]
    Deserialize {
        method: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("log subscription stream closed unexpectedly")]
    SubscriptionClosed,
}
