use sqlx::{PgPool, Result};

/// Fetch the persisted high score, defaulting to 0 when no round has
/// ever been completed
pub async fn get_high_score(pool: &PgPool) -> Result<i64> {
    let row: Option<(i64,)> = sqlx::query_as("SELECT score FROM high_scores WHERE id = 1")
        .fetch_optional(pool)
        .await?;

    Ok(row.map(|(score,)| score).unwrap_or(0))
}

/// Persist a new high score. Single-row table, last write wins.
pub async fn upsert_high_score(pool: &PgPool, score: i64) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO high_scores (id, score)
        VALUES (1, $1)
        ON CONFLICT (id)
        DO UPDATE SET
            score = $1,
            updated_at = NOW()
        "#,
    )
    .bind(score)
    .execute(pool)
    .await?;

    Ok(())
}
