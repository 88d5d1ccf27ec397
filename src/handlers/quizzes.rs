// src/handlers/quizzes.rs

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{error::AppError, state::AppState};

/// Retrieves a previously generated quiz by its opaque id.
pub async fn get_generated_quiz(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = state
        .quizzes
        .load(&id)
        .await?
        .ok_or_else(|| AppError::NotFound("Quiz not found".to_string()))?;

    Ok(Json(quiz))
}
