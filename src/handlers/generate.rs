// src/handlers/generate.rs

use axum::{Json, extract::State, http::HeaderMap, response::IntoResponse};
use validator::Validate;

use crate::{
    error::AppError,
    models::quiz::{GenerateQuizRequest, GeneratedQuizRecord},
    state::AppState,
    utils::net::client_key,
};

/// Generates a quiz via the configured upstream service.
///
/// * Enforces the per-client daily generation quota first (429 when exhausted).
/// * Validates the request before any external call (400).
/// * Persists the resulting record and returns it, id included.
pub async fn generate_quiz(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, AppError> {
    let key = client_key(&headers);

    let verdict = state.limiter.check_and_consume(&key);
    if !verdict.allowed {
        tracing::info!("Client {} has reached the generation limit", key);
        return Err(AppError::RateLimited {
            reset_at: verdict.reset_at,
        });
    }

    // Deserialized by hand so missing fields report as 400, matching the
    // validation taxonomy, instead of the Json extractor's 422.
    let params: GenerateQuizRequest = serde_json::from_value(body)?;
    params
        .validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    tracing::info!(
        "Generating {} {} questions about {:?} for client {}",
        params.question_count,
        params.difficulty.as_str(),
        params.topics,
        key
    );

    let questions = state.generator.generate(&params).await?;
    tracing::info!("Generated {} questions", questions.len());

    let record = GeneratedQuizRecord {
        id: uuid::Uuid::new_v4().to_string(),
        title: params
            .title
            .clone()
            .unwrap_or_else(|| format!("{} Trivia Quiz", params.topics)),
        description: format!(
            "{} {} questions about {}",
            params.question_count,
            params.difficulty.as_str(),
            params.topics
        ),
        category: params.category,
        difficulty: params.difficulty,
        topics: params.topics,
        question_count: params.question_count,
        time_limit: params.time_limit,
        reveal_limit: params.reveal_limit,
        include_explanations: params.include_explanations,
        questions,
        created_at: chrono::Utc::now(),
    };

    state.quizzes.save(&record).await?;

    Ok(Json(record))
}

/// Non-consuming quota peek, so clients can show remaining generations and
/// time until reset without burning an attempt.
pub async fn generation_limit(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let verdict = state.limiter.peek(&client_key(&headers));

    Ok(Json(serde_json::json!({
        "limit": state.limiter.limit(),
        "remaining": verdict.remaining,
        "resetAt": verdict.reset_at,
    })))
}
