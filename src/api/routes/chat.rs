use axum::extract::{rejection::JsonRejection, State};
use axum::Json;

use crate::api::{error::ApiError, state::AppState};
use crate::domain::{Answer, ChatQuery};

/// POST /chat
pub async fn chat_handler(
    State(state): State<AppState>,
    request: Result<Json<ChatQuery>, JsonRejection>,
) -> Result<Json<Answer>, ApiError> {
    let Json(query) = request.map_err(|e| ApiError::new(e.status(), e.body_text()))?;
    let answer = state.rag.answer(&query).await?;
    Ok(Json(answer))
}
