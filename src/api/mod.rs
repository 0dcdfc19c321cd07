use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::errors::AppError;
use crate::services::RequestTokenGenerationUseCase;

pub struct AppState {
    pub intake: Arc<dyn RequestTokenGenerationUseCase>,
}

/// Build the intake router: liveness probe plus the token generation intake.
pub fn api_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/liveness", get(liveness))
        .route("/generate_token", post(request_token_generation))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Deserialize)]
pub struct RequestTokenGenerationInput {
    #[serde(default)]
    pub project_id: String,
}

async fn liveness() -> StatusCode {
    StatusCode::OK
}

/// POST /generate_token — queue a token generation request.
///
/// Answers 202 as soon as the bus durably accepts the request; the caller
/// never observes the outcome of generation itself.
async fn request_token_generation(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RequestTokenGenerationInput>,
) -> Result<StatusCode, AppError> {
    state
        .intake
        .request_token_generation(&body.project_id)
        .await?;

    info!(project_id = %body.project_id, "token generation request sent");
    Ok(StatusCode::ACCEPTED)
}
