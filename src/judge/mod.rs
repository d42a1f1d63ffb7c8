use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Similarity verdict returned by the matching service
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Verdict {
    pub matched: bool,
    /// Similarity in [0.0, 1.0]; awarded points are round(score * 100)
    pub score: f64,
}

/// A failed judge call is treated as a non-match for gameplay, but
/// stays distinguishable from a genuine mismatch in the logs
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("judge request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("judge returned status {0}")]
    Status(reqwest::StatusCode),
}

/// External service that scores how close the player's guess is to the
/// target word
#[async_trait]
pub trait MatchJudge: Send + Sync {
    async fn evaluate(
        &self,
        target: &str,
        input: &str,
        total_score: u32,
    ) -> Result<Verdict, JudgeError>;
}

#[derive(Serialize)]
struct CheckRequest<'a> {
    target_word: &'a str,
    user_input: &'a str,
    total_score: u32,
}

/// HTTP client for the similarity service's POST /check endpoint
pub struct HttpMatchJudge {
    http_client: reqwest::Client,
    check_url: String,
}

impl HttpMatchJudge {
    pub fn new(http_client: reqwest::Client, base_url: &str) -> Self {
        Self {
            http_client,
            check_url: format!("{}/check", base_url.trim_end_matches('/')),
        }
    }
}

#[async_trait]
impl MatchJudge for HttpMatchJudge {
    async fn evaluate(
        &self,
        target: &str,
        input: &str,
        total_score: u32,
    ) -> Result<Verdict, JudgeError> {
        let response = self
            .http_client
            .post(&self.check_url)
            .json(&CheckRequest {
                target_word: target,
                user_input: input,
                total_score,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            tracing::error!("Match judge returned non-success: {} - {}", status, error_text);
            return Err(JudgeError::Status(status));
        }

        let verdict = response.json::<Verdict>().await?;
        Ok(verdict)
    }
}
