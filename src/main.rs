// src/main.rs

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use dotenvy::dotenv;
use sqlx::sqlite::SqlitePoolOptions;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};
use triviaforge::config::Config;
use triviaforge::generator::OpenAiGenerator;
use triviaforge::limiter::RateLimiter;
use triviaforge::repository::SqliteQuizRepository;
use triviaforge::routes;
use triviaforge::state::AppState;

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenv().ok();

    // Load configuration from environment
    let config = Config::from_env();

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    // The default SQLite URL points into ./data
    if let Err(e) = std::fs::create_dir_all("data") {
        tracing::warn!("Could not create data directory: {}", e);
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Migrations applied successfully.");

    let limiter = Arc::new(RateLimiter::in_memory(config.generation_daily_limit));
    let generator =
        Arc::new(OpenAiGenerator::new(&config).expect("Failed to build generation client"));

    // Hourly sweep of expired rate-limit records; bounds memory only.
    let sweeper = Arc::clone(&limiter);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60 * 60));
        loop {
            interval.tick().await;
            let removed = sweeper.sweep(chrono::Utc::now());
            if removed > 0 {
                tracing::debug!("Evicted {} expired rate limit records", removed);
            }
        }
    });

    // Create AppState
    let state = AppState {
        pool: pool.clone(),
        config: config.clone(),
        limiter,
        generator,
        quizzes: Arc::new(SqliteQuizRepository::new(pool)),
    };

    // Create the Axum application router
    let app = routes::create_router(state);

    // Bind to the listening address
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();

    // Start the server
    axum::serve(listener, app).await.unwrap();
}
