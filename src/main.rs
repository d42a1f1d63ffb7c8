mod config;
mod db;
mod engine;
mod judge;
mod models;
mod routes;
mod scores;
mod session;
mod vocabulary;
mod websocket;

use std::{sync::Arc, time::Instant};

use anyhow::Result;
use axum::{routing::get, Router};
use config::Config;
use dashmap::DashMap;
use judge::{HttpMatchJudge, MatchJudge};
use scores::{HighScoreStore, PgHighScoreStore};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;
use vocabulary::Vocabulary;

/// Bookkeeping for a live WebSocket session
pub struct SessionInfo {
    pub connected_at: Instant,
}

/// Application state shared across all handlers
pub struct AppState {
    pub config: Config,
    pub vocabulary: Arc<Vocabulary>,
    pub judge: Arc<dyn MatchJudge>,
    pub scores: Arc<dyn HighScoreStore>,
    /// Live sessions keyed by connection id, for observability
    pub sessions: DashMap<Uuid, SessionInfo>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "thinklink_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting ThinkLink backend server...");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Connect to database
    let db = db::create_pool(config.database_url(), config.database.max_connections).await?;
    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("./migrations").run(&db).await?;
    tracing::info!("Database migrations completed");

    // Load vocabulary
    let vocabulary = match Vocabulary::load(&config.game.vocabulary_path).await {
        Ok(vocab) => {
            tracing::info!("Vocabulary loaded successfully");
            vocab
        }
        Err(e) => {
            tracing::warn!(
                "Failed to load word list: {}. Falling back to the built-in vocabulary.",
                e
            );
            tracing::warn!(
                "Provide a word list at {} for the full word pool",
                config.game.vocabulary_path
            );
            Vocabulary::builtin()
        }
    };

    // Shared HTTP client for the match-judge service
    let http_client = reqwest::Client::builder()
        .timeout(config.judge_timeout())
        .build()?;
    let judge = HttpMatchJudge::new(http_client, &config.judge.base_url);
    tracing::info!("Match judge client initialized: {}", config.judge.base_url);

    // Create application state
    let state = Arc::new(AppState {
        config: config.clone(),
        vocabulary: Arc::new(vocabulary),
        judge: Arc::new(judge),
        scores: Arc::new(PgHighScoreStore::new(db)),
        sessions: DashMap::new(),
    });

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Serve frontend static files
    let frontend_service = ServeDir::new(&config.server.frontend_dir);

    // Build router
    let app = Router::new()
        // WebSocket endpoint
        .route("/ws", get(websocket::handle_websocket))
        // API routes
        .merge(routes::create_routes())
        .fallback_service(frontend_service)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("WebSocket endpoint: ws://{}/ws", addr);
    tracing::info!("Health check: http://{}/health", addr);
    tracing::info!("Game frontend: http://{}/", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
