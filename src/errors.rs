use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("projectID cannot be blank")]
    BlankProjectId,

    #[error("encoding token generation request: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("decoding token generation request: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("publishing request token generation: {0}")]
    Publish(#[source] anyhow::Error),

    #[error("generating token on provider: {0}")]
    Provider(#[source] anyhow::Error),

    #[error("receiving from subscription: {0}")]
    Transport(#[from] lapin::Error),

    #[error("subscription delivery stream closed unexpectedly")]
    SubscriptionClosed,

    #[error("consumer did not stop within the grace period")]
    StopTimeout,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type, msg) = match &self {
            AppError::BlankProjectId => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "validation_error",
                self.to_string(),
            ),
            AppError::Publish(e) => {
                tracing::error!("publish error: {:#}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "publish_error",
                    "failed to publish message".to_string(),
                )
            }
            other => {
                tracing::error!("internal error: {}", other);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "message": msg,
                "type": error_type,
            }
        }));

        (status, body).into_response()
    }
}
