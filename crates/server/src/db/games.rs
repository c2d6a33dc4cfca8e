use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::types::Json;
use sqlx::PgPool;

use analysis_worker::GameRecord;
use chess_core::rules::canonical_san;
use chess_core::{GameMetadata, GameStatus};

use crate::error::AppError;

/// Row of the game list: metadata only, no moves.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub id: i64,
    pub event: Option<String>,
    pub white: String,
    pub black: String,
    pub date: Option<String>,
    pub result: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

/// Result of an upload attempt.
#[derive(Debug)]
pub enum InsertOutcome {
    Inserted(GameRecord),
    /// The owner already stored this game; carries the existing id.
    Duplicate(i64),
}

/// Canonical text identifying a game for duplicate detection. Check and
/// annotation glyphs on moves are ignored. Postgres stores its md5.
pub fn game_key(metadata: &GameMetadata, moves: &[String]) -> String {
    let moves: Vec<&str> = moves.iter().map(|m| canonical_san(m)).collect();
    [
        metadata.event.as_deref().unwrap_or("").trim(),
        metadata.white.trim(),
        metadata.black.trim(),
        metadata.date.as_deref().unwrap_or("").trim(),
        metadata.result.trim(),
        &moves.join(" "),
    ]
    .join("\u{1f}")
}

/// Store a freshly uploaded game. Moves must already be validated.
pub async fn insert_game(
    pool: &PgPool,
    owner_id: i64,
    metadata: &GameMetadata,
    moves: &[String],
) -> Result<InsertOutcome, AppError> {
    let key = game_key(metadata, moves);

    let inserted: Option<(i64, DateTime<Utc>)> = sqlx::query_as(
        r#"INSERT INTO games (owner_id, event, white, black, date, result, moves, status, game_hash)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, md5($9))
        ON CONFLICT (owner_id, game_hash) DO NOTHING
        RETURNING id, created_at"#,
    )
    .bind(owner_id)
    .bind(&metadata.event)
    .bind(&metadata.white)
    .bind(&metadata.black)
    .bind(&metadata.date)
    .bind(&metadata.result)
    .bind(Json(moves))
    .bind(GameStatus::Uploaded.as_str())
    .bind(&key)
    .fetch_optional(pool)
    .await?;

    let Some((id, created_at)) = inserted else {
        let (existing,): (i64,) =
            sqlx::query_as("SELECT id FROM games WHERE owner_id = $1 AND game_hash = md5($2)")
                .bind(owner_id)
                .bind(&key)
                .fetch_one(pool)
                .await?;
        return Ok(InsertOutcome::Duplicate(existing));
    };

    Ok(InsertOutcome::Inserted(GameRecord {
        id,
        owner_id,
        metadata: metadata.clone(),
        moves: moves.to_vec(),
        status: GameStatus::Uploaded,
        created_at,
    }))
}

/// The owner's games, newest first.
pub async fn list_games(
    pool: &PgPool,
    owner_id: i64,
    limit: i64,
) -> Result<Vec<GameSummary>, AppError> {
    let games = sqlx::query_as::<_, GameSummary>(
        r#"SELECT id, event, white, black, date, result, status, created_at
        FROM games
        WHERE owner_id = $1
        ORDER BY created_at DESC, id DESC
        LIMIT $2"#,
    )
    .bind(owner_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(games)
}
