// src/models/tracking.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Action reported by the quiz-taking UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackAction {
    Start,
    Complete,
}

/// DTO for reporting a quiz attempt event.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackQuizRequest {
    pub quiz_id: String,
    pub action: TrackAction,
    pub score: Option<i64>,
    pub total_questions: Option<i64>,
}

/// Per-quiz-per-client attempt counter row.
#[derive(Debug, FromRow)]
pub struct AttemptCounterRow {
    pub total_attempts: i64,
    pub last_attempt: chrono::DateTime<chrono::Utc>,
}

/// One recorded completion.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreRecord {
    pub quiz_id: String,
    pub score: i64,
    pub total_questions: i64,
    #[serde(rename = "timestamp")]
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Aggregate stats for a quiz, served by the tracking read endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizStats {
    pub total_attempts: i64,
    pub unique_users: i64,
    pub average_score: f64,
    pub highest_score: f64,
    /// 5 most recent completions, newest first.
    pub recent_scores: Vec<ScoreRecord>,
}
