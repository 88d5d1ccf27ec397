// src/routes.rs

use axum::{
    Router,
    http::Method,
    routing::{get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{generate, quizzes, tracking},
    state::AppState,
};

/// Assembles the main application router.
///
/// * Merges all sub-routers (generation, quizzes, tracking).
/// * Applies global middleware (Trace, CORS).
/// * Injects global state.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([axum::http::header::CONTENT_TYPE]);

    let generate_routes = Router::new()
        .route("/", post(generate::generate_quiz))
        .route("/limit", get(generate::generation_limit));

    let quiz_routes = Router::new().route("/generated/{id}", get(quizzes::get_generated_quiz));

    let tracking_routes = Router::new().route(
        "/",
        post(tracking::track_quiz).get(tracking::quiz_stats),
    );

    Router::new()
        .nest("/api/generate-quiz", generate_routes)
        .nest("/api/quizzes", quiz_routes)
        .nest("/api/quiz-tracking", tracking_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
