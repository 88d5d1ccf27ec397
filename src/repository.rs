// src/repository.rs

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::{error::AppError, models::quiz::GeneratedQuizRecord};

/// Storage seam for generated quizzes: the medium (SQLite here, anything
/// else later) is swappable without touching call sites.
#[async_trait]
pub trait QuizRepository: Send + Sync {
    async fn save(&self, quiz: &GeneratedQuizRecord) -> Result<(), AppError>;
    async fn load(&self, id: &str) -> Result<Option<GeneratedQuizRecord>, AppError>;
}

/// Production repository: the record is serialized to a JSON payload column,
/// keyed by its opaque id.
pub struct SqliteQuizRepository {
    pool: SqlitePool,
}

impl SqliteQuizRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuizRepository for SqliteQuizRepository {
    async fn save(&self, quiz: &GeneratedQuizRecord) -> Result<(), AppError> {
        let payload = serde_json::to_string(quiz)
            .map_err(|e| AppError::Internal(format!("failed to serialize quiz: {}", e)))?;

        sqlx::query("INSERT INTO generated_quizzes (id, payload, created_at) VALUES (?, ?, ?)")
            .bind(&quiz.id)
            .bind(payload)
            .bind(quiz.created_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Option<GeneratedQuizRecord>, AppError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT payload FROM generated_quizzes WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((payload,)) => {
                // A corrupt payload degrades to "absent" rather than a 500.
                match serde_json::from_str(&payload) {
                    Ok(quiz) => Ok(Some(quiz)),
                    Err(e) => {
                        tracing::warn!("Discarding corrupt quiz payload for {}: {}", id, e);
                        Ok(None)
                    }
                }
            }
            None => Ok(None),
        }
    }
}

/// In-memory repository for tests.
#[derive(Default)]
pub struct MemoryQuizRepository {
    quizzes: RwLock<HashMap<String, GeneratedQuizRecord>>,
}

impl MemoryQuizRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl QuizRepository for MemoryQuizRepository {
    async fn save(&self, quiz: &GeneratedQuizRecord) -> Result<(), AppError> {
        let mut quizzes = self
            .quizzes
            .write()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        quizzes.insert(quiz.id.clone(), quiz.clone());
        Ok(())
    }

    async fn load(&self, id: &str) -> Result<Option<GeneratedQuizRecord>, AppError> {
        let quizzes = self
            .quizzes
            .read()
            .map_err(|e| AppError::Internal(e.to_string()))?;
        Ok(quizzes.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::quiz::{Difficulty, Question};

    fn record(id: &str) -> GeneratedQuizRecord {
        GeneratedQuizRecord {
            id: id.to_string(),
            title: "Volcanoes Trivia Quiz".into(),
            description: "Hard questions about volcanoes".into(),
            category: "Science".into(),
            difficulty: Difficulty::Hard,
            topics: "volcanoes".into(),
            question_count: 1,
            time_limit: 10,
            reveal_limit: 5,
            include_explanations: false,
            questions: vec![Question {
                text: "Q?".into(),
                options: vec!["a".into(), "b".into(), "c".into(), "d".into()],
                correct_answer: "a".into(),
                explanation: None,
            }],
            created_at: chrono::Utc::now(),
        }
    }

    #[tokio::test]
    async fn memory_repository_round_trips() {
        let repo = MemoryQuizRepository::new();
        repo.save(&record("abc")).await.unwrap();

        let loaded = repo.load("abc").await.unwrap().expect("saved quiz");
        assert_eq!(loaded.title, "Volcanoes Trivia Quiz");
        assert!(repo.load("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn sqlite_repository_round_trips() {
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&pool).await.unwrap();

        let repo = SqliteQuizRepository::new(pool);
        repo.save(&record("xyz")).await.unwrap();

        let loaded = repo.load("xyz").await.unwrap().expect("saved quiz");
        assert_eq!(loaded.questions.len(), 1);
        assert_eq!(loaded.difficulty, Difficulty::Hard);
        assert!(repo.load("missing").await.unwrap().is_none());
    }
}
