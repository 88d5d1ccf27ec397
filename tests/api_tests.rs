// tests/api_tests.rs

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::sqlite::SqlitePoolOptions;
use triviaforge::{
    config::Config,
    error::AppError,
    generator::QuestionGenerator,
    limiter::RateLimiter,
    models::quiz::{GenerateQuizRequest, Question},
    repository::SqliteQuizRepository,
    routes,
    state::AppState,
};

/// Stub generator: returns the requested number of well-formed questions
/// without touching the network.
struct StubGenerator;

#[async_trait]
impl QuestionGenerator for StubGenerator {
    async fn generate(&self, params: &GenerateQuizRequest) -> Result<Vec<Question>, AppError> {
        Ok((0..params.question_count)
            .map(|i| Question {
                text: format!("Stub question {} about {}", i, params.topics),
                options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
                correct_answer: "A".into(),
                explanation: params
                    .include_explanations
                    .then(|| "Because A.".to_string()),
            })
            .collect())
    }
}

/// Helper function to spawn the app on a random port for testing.
/// Returns the base URL (e.g., "http://127.0.0.1:12345").
async fn spawn_app(daily_limit: u32) -> String {
    // In-memory SQLite; a single connection so every query sees the same DB.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        openai_api_key: "test-key".to_string(),
        openai_base_url: "http://127.0.0.1:9".to_string(),
        openai_model: "test-model".to_string(),
        generation_daily_limit: daily_limit,
        generation_timeout_secs: 5,
        rust_log: "error".to_string(),
    };

    let state = AppState {
        pool: pool.clone(),
        config,
        limiter: Arc::new(RateLimiter::in_memory(daily_limit)),
        generator: Arc::new(StubGenerator),
        quizzes: Arc::new(SqliteQuizRepository::new(pool)),
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");

    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    address
}

fn generate_body() -> serde_json::Value {
    serde_json::json!({
        "category": "Science",
        "questionCount": 5,
        "difficulty": "medium",
        "topics": "volcanoes",
        "includeExplanations": true
    })
}

#[tokio::test]
async fn unknown_path_is_404() {
    let address = spawn_app(20).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/random_path_that_does_not_exist", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn generate_quiz_works_and_is_fetchable_by_id() {
    let address = spawn_app(20).await;
    let client = reqwest::Client::new();

    let response = client
        .post(format!("{}/api/generate-quiz", address))
        .json(&generate_body())
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 200);
    let quiz: serde_json::Value = response.json().await.unwrap();

    let id = quiz["id"].as_str().expect("id present");
    assert_eq!(quiz["questions"].as_array().unwrap().len(), 5);
    assert_eq!(quiz["title"], "volcanoes Trivia Quiz");
    assert_eq!(quiz["timeLimit"], 10);
    assert_eq!(quiz["revealLimit"], 5);

    // Every generated question is well-formed on the wire.
    for q in quiz["questions"].as_array().unwrap() {
        let options = q["options"].as_array().unwrap();
        assert_eq!(options.len(), 4);
        assert!(options.contains(&q["correctAnswer"]));
    }

    // The stored record is retrievable by its opaque id.
    let fetched = client
        .get(format!("{}/api/quizzes/generated/{}", address, id))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(fetched.status().as_u16(), 200);
    let fetched: serde_json::Value = fetched.json().await.unwrap();
    assert_eq!(fetched["id"], quiz["id"]);
    assert_eq!(fetched["questions"], quiz["questions"]);
}

#[tokio::test]
async fn unknown_generated_quiz_is_404() {
    let address = spawn_app(20).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/api/quizzes/generated/nope", address))
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn generate_quiz_fails_validation_before_generation() {
    let address = spawn_app(20).await;
    let client = reqwest::Client::new();

    // Missing topics entirely.
    let response = client
        .post(format!("{}/api/generate-quiz", address))
        .json(&serde_json::json!({
            "category": "Science",
            "questionCount": 5,
            "difficulty": "medium"
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 400);

    // Question count out of bounds.
    let mut body = generate_body();
    body["questionCount"] = serde_json::json!(50);
    let response = client
        .post(format!("{}/api/generate-quiz", address))
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 400);

    // Unknown difficulty.
    let mut body = generate_body();
    body["difficulty"] = serde_json::json!("impossible");
    let response = client
        .post(format!("{}/api/generate-quiz", address))
        .json(&body)
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn generation_is_rate_limited_per_client() {
    let address = spawn_app(3).await;
    let client = reqwest::Client::new();

    for _ in 0..3 {
        let response = client
            .post(format!("{}/api/generate-quiz", address))
            .header("x-forwarded-for", "203.0.113.5")
            .json(&generate_body())
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 200);
    }

    let response = client
        .post(format!("{}/api/generate-quiz", address))
        .header("x-forwarded-for", "203.0.113.5")
        .json(&generate_body())
        .send()
        .await
        .expect("Failed to execute request");

    assert_eq!(response.status().as_u16(), 429);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["resetAt"].is_string());

    // A different client is unaffected.
    let response = client
        .post(format!("{}/api/generate-quiz", address))
        .header("x-forwarded-for", "203.0.113.6")
        .json(&generate_body())
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn limit_peek_does_not_consume_quota() {
    let address = spawn_app(5).await;
    let client = reqwest::Client::new();

    for _ in 0..2 {
        let response = client
            .get(format!("{}/api/generate-quiz/limit", address))
            .header("x-forwarded-for", "203.0.113.7")
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 200);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["limit"], 5);
        assert_eq!(body["remaining"], 5);
    }

    client
        .post(format!("{}/api/generate-quiz", address))
        .header("x-forwarded-for", "203.0.113.7")
        .json(&generate_body())
        .send()
        .await
        .expect("Failed to execute request");

    let body: serde_json::Value = client
        .get(format!("{}/api/generate-quiz/limit", address))
        .header("x-forwarded-for", "203.0.113.7")
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .unwrap();
    assert_eq!(body["remaining"], 4);
}

#[tokio::test]
async fn tracking_counts_starts_and_records_scores() {
    let address = spawn_app(20).await;
    let client = reqwest::Client::new();

    for expected in 1..=2 {
        let response = client
            .post(format!("{}/api/quiz-tracking", address))
            .header("x-forwarded-for", "203.0.113.8")
            .json(&serde_json::json!({ "quizId": "quiz-1", "action": "start" }))
            .send()
            .await
            .expect("Failed to execute request");

        assert_eq!(response.status().as_u16(), 200);
        let body: serde_json::Value = response.json().await.unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["attempts"], expected);
    }

    let response = client
        .post(format!("{}/api/quiz-tracking", address))
        .header("x-forwarded-for", "203.0.113.8")
        .json(&serde_json::json!({
            "quizId": "quiz-1",
            "action": "complete",
            "score": 7,
            "totalQuestions": 10
        }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);

    // Second client, perfect score.
    client
        .post(format!("{}/api/quiz-tracking", address))
        .header("x-forwarded-for", "203.0.113.9")
        .json(&serde_json::json!({ "quizId": "quiz-1", "action": "start" }))
        .send()
        .await
        .expect("Failed to execute request");
    client
        .post(format!("{}/api/quiz-tracking", address))
        .header("x-forwarded-for", "203.0.113.9")
        .json(&serde_json::json!({
            "quizId": "quiz-1",
            "action": "complete",
            "score": 10,
            "totalQuestions": 10
        }))
        .send()
        .await
        .expect("Failed to execute request");

    let response = client
        .get(format!("{}/api/quiz-tracking?quizId=quiz-1", address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 200);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    let stats = &body["stats"];
    assert_eq!(stats["totalAttempts"], 3);
    assert_eq!(stats["uniqueUsers"], 2);
    assert!((stats["averageScore"].as_f64().unwrap() - 85.0).abs() < 1e-9);
    assert!((stats["highestScore"].as_f64().unwrap() - 100.0).abs() < 1e-9);
    assert_eq!(stats["recentScores"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn tracking_rejects_bad_requests() {
    let address = spawn_app(20).await;
    let client = reqwest::Client::new();

    // Missing action.
    let response = client
        .post(format!("{}/api/quiz-tracking", address))
        .json(&serde_json::json!({ "quizId": "quiz-1" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 400);

    // Unknown action.
    let response = client
        .post(format!("{}/api/quiz-tracking", address))
        .json(&serde_json::json!({ "quizId": "quiz-1", "action": "pause" }))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 400);

    // Stats without a quiz id.
    let response = client
        .get(format!("{}/api/quiz-tracking", address))
        .send()
        .await
        .expect("Failed to execute request");
    assert_eq!(response.status().as_u16(), 400);
}

#[tokio::test]
async fn stats_for_unseen_quiz_are_zeroed() {
    let address = spawn_app(20).await;
    let client = reqwest::Client::new();

    let body: serde_json::Value = client
        .get(format!("{}/api/quiz-tracking?quizId=never-played", address))
        .send()
        .await
        .expect("Failed to execute request")
        .json()
        .await
        .unwrap();

    let stats = &body["stats"];
    assert_eq!(stats["totalAttempts"], 0);
    assert_eq!(stats["uniqueUsers"], 0);
    assert_eq!(stats["averageScore"].as_f64().unwrap(), 0.0);
    assert_eq!(stats["recentScores"].as_array().unwrap().len(), 0);
}
