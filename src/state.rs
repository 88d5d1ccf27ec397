// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::{
    config::Config, generator::QuestionGenerator, limiter::RateLimiter,
    repository::QuizRepository,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: SqlitePool,
    pub config: Config,
    pub limiter: Arc<RateLimiter>,
    pub generator: Arc<dyn QuestionGenerator>,
    pub quizzes: Arc<dyn QuizRepository>,
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
