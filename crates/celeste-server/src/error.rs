use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use celeste_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid JSON")]
    InvalidJson,

    #[error("Missing model or messages")]
    MissingFields,

    #[error("No API key provided")]
    NoApiKey,

    // server-only key policy without API_KEY configured
    #[error("Server misconfiguration")]
    Misconfigured,

    #[error("Chat not found: {0}")]
    ChatNotFound(i64),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Map a store error for chat `id`, turning `NotFound` into a 404.
    pub fn for_chat(id: i64) -> impl FnOnce(StoreError) -> ServerError {
        move |e| match e {
            StoreError::NotFound => ServerError::ChatNotFound(id),
            other => ServerError::Store(other),
        }
    }
}

impl From<JsonRejection> for ServerError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!(error = %rejection, "Rejected request body");
        ServerError::InvalidJson
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::InvalidJson | ServerError::MissingFields | ServerError::NoApiKey => {
                (StatusCode::BAD_REQUEST, self.to_string())
            }
            ServerError::Misconfigured => {
                tracing::error!("API_KEY is required by the server-only key policy but not set");
                (StatusCode::INTERNAL_SERVER_ERROR, self.to_string())
            }
            ServerError::ChatNotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::Store(e) => {
                tracing::error!(error = %e, "Chat store failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
            }
            ServerError::Upstream(e) => {
                tracing::error!(error = %e, "Upstream request failed");
                (StatusCode::BAD_GATEWAY, "Upstream request failed".to_string())
            }
            ServerError::Internal(e) => {
                tracing::error!(error = %e, "Internal error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
