// src/handlers/tracking.rs

use axum::{
    Json,
    extract::{Query, State},
    http::HeaderMap,
    response::IntoResponse,
};
use serde::Deserialize;
use sqlx::SqlitePool;

use crate::{
    error::AppError,
    models::tracking::{AttemptCounterRow, QuizStats, ScoreRecord, TrackAction, TrackQuizRequest},
    utils::net::client_key,
};

/// Records a quiz attempt event.
///
/// * `start` increments the per-quiz-per-client attempt counter.
/// * `complete` appends a score record (and ensures the counter row exists).
/// * Returns the updated counter either way.
pub async fn track_quiz(
    State(pool): State<SqlitePool>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Result<impl IntoResponse, AppError> {
    let req: TrackQuizRequest = serde_json::from_value(body)?;
    if req.quiz_id.is_empty() {
        return Err(AppError::Validation("quizId is required".to_string()));
    }

    let key = client_key(&headers);
    let now = chrono::Utc::now();

    match req.action {
        TrackAction::Start => {
            sqlx::query(
                r#"
                INSERT INTO quiz_attempts (quiz_id, client_key, total_attempts, last_attempt)
                VALUES (?, ?, 1, ?)
                ON CONFLICT (quiz_id, client_key) DO UPDATE SET
                    total_attempts = total_attempts + 1,
                    last_attempt = excluded.last_attempt
                "#,
            )
            .bind(&req.quiz_id)
            .bind(&key)
            .bind(now)
            .execute(&pool)
            .await?;
        }
        TrackAction::Complete => {
            // Completing without a recorded start still yields a counter row.
            sqlx::query(
                r#"
                INSERT INTO quiz_attempts (quiz_id, client_key, total_attempts, last_attempt)
                VALUES (?, ?, 0, ?)
                ON CONFLICT (quiz_id, client_key) DO NOTHING
                "#,
            )
            .bind(&req.quiz_id)
            .bind(&key)
            .bind(now)
            .execute(&pool)
            .await?;

            sqlx::query(
                r#"
                INSERT INTO quiz_scores (quiz_id, client_key, score, total_questions, created_at)
                VALUES (?, ?, ?, ?, ?)
                "#,
            )
            .bind(&req.quiz_id)
            .bind(&key)
            .bind(req.score.unwrap_or(0))
            .bind(req.total_questions.unwrap_or(0))
            .bind(now)
            .execute(&pool)
            .await?;
        }
    }

    let counter: AttemptCounterRow = sqlx::query_as(
        r#"
        SELECT total_attempts, last_attempt
        FROM quiz_attempts
        WHERE quiz_id = ? AND client_key = ?
        "#,
    )
    .bind(&req.quiz_id)
    .bind(&key)
    .fetch_one(&pool)
    .await?;

    Ok(Json(serde_json::json!({
        "success": true,
        "attempts": counter.total_attempts,
        "lastAttempt": counter.last_attempt,
    })))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsQuery {
    pub quiz_id: Option<String>,
}

/// Aggregate stats for one quiz: attempt totals, unique client count and
/// score aggregates (as percentages), plus the 5 most recent scores.
pub async fn quiz_stats(
    State(pool): State<SqlitePool>,
    Query(query): Query<StatsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let quiz_id = query
        .quiz_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::Validation("Quiz ID is required".to_string()))?;

    let totals: (i64, i64) = sqlx::query_as(
        r#"
        SELECT COALESCE(SUM(total_attempts), 0), COUNT(DISTINCT client_key)
        FROM quiz_attempts
        WHERE quiz_id = ?
        "#,
    )
    .bind(&quiz_id)
    .fetch_one(&pool)
    .await?;

    let scores: Vec<ScoreRecord> = sqlx::query_as(
        r#"
        SELECT quiz_id, score, total_questions, created_at
        FROM quiz_scores
        WHERE quiz_id = ?
        ORDER BY created_at DESC
        "#,
    )
    .bind(&quiz_id)
    .fetch_all(&pool)
    .await?;

    let percentages: Vec<f64> = scores
        .iter()
        .filter(|s| s.total_questions > 0)
        .map(|s| s.score as f64 / s.total_questions as f64 * 100.0)
        .collect();

    let stats = QuizStats {
        total_attempts: totals.0,
        unique_users: totals.1,
        average_score: if percentages.is_empty() {
            0.0
        } else {
            percentages.iter().sum::<f64>() / percentages.len() as f64
        },
        highest_score: percentages.iter().copied().fold(0.0, f64::max),
        recent_scores: scores.into_iter().take(5).collect(),
    };

    Ok(Json(serde_json::json!({
        "success": true,
        "stats": stats,
    })))
}
