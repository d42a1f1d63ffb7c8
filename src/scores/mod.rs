use async_trait::async_trait;
use sqlx::PgPool;
use tokio::sync::Mutex;

use crate::db::queries;

/// Durable home for the single high-score integer. Injected rather
/// than ambient so tests can substitute it; failures never block
/// gameplay.
#[async_trait]
pub trait HighScoreStore: Send + Sync {
    /// Load the stored high score, falling back to 0 when the store is
    /// unavailable
    async fn load(&self) -> i64;

    /// Best-effort write; errors are logged and swallowed
    async fn save(&self, score: i64);
}

/// Postgres-backed store over the shared connection pool
pub struct PgHighScoreStore {
    pool: PgPool,
}

impl PgHighScoreStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HighScoreStore for PgHighScoreStore {
    async fn load(&self) -> i64 {
        match queries::get_high_score(&self.pool).await {
            Ok(score) => score,
            Err(e) => {
                tracing::warn!("Failed to load high score, falling back to 0: {}", e);
                0
            }
        }
    }

    async fn save(&self, score: i64) {
        if let Err(e) = queries::upsert_high_score(&self.pool, score).await {
            tracing::warn!("Failed to persist high score {}: {}", score, e);
        }
    }
}

/// In-memory store, used as a substitute in tests
pub struct MemoryHighScoreStore {
    score: Mutex<i64>,
}

impl MemoryHighScoreStore {
    pub fn new(initial: i64) -> Self {
        Self {
            score: Mutex::new(initial),
        }
    }
}

#[async_trait]
impl HighScoreStore for MemoryHighScoreStore {
    async fn load(&self) -> i64 {
        *self.score.lock().await
    }

    async fn save(&self, score: i64) {
        *self.score.lock().await = score;
    }
}
