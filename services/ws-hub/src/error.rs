use thiserror::Error;

#[derive(Debug, Error)]
pub enum WsHubError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] warp::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("admission denied: {reason}")]
    AdmissionDenied { reason: String },

    #[error("client error: {message}")]
    Client { message: String },
}

pub type Result<T> = std::result::Result<T, WsHubError>;
