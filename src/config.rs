use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub game: GameConfig,
    pub judge: JudgeConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub frontend_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameConfig {
    pub vocabulary_path: String,
    /// Seconds between grid-growth ticks
    pub tick_interval_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JudgeConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let database = DatabaseConfig {
            url: env::var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a number")?,
        };

        let server = ServerConfig {
            host: env::var("HOST")
                .unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("PORT must be a number")?,
            frontend_dir: env::var("FRONTEND_DIR")
                .unwrap_or_else(|_| "../frontend".to_string()),
        };

        let game = GameConfig {
            vocabulary_path: env::var("VOCABULARY_PATH")
                .unwrap_or_else(|_| "./words.txt".to_string()),
            tick_interval_secs: env::var("TICK_INTERVAL_SECS")
                .unwrap_or_else(|_| "3".to_string())
                .parse()
                .unwrap_or(3),
        };

        let judge = JudgeConfig {
            base_url: env::var("JUDGE_URL")
                .unwrap_or_else(|_| "http://localhost:5000".to_string()),
            timeout_secs: env::var("JUDGE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
        };

        Ok(Config {
            database,
            server,
            game,
            judge,
        })
    }

    pub fn database_url(&self) -> &str {
        &self.database.url
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.game.tick_interval_secs)
    }

    pub fn judge_timeout(&self) -> Duration {
        Duration::from_secs(self.judge.timeout_secs)
    }
}
