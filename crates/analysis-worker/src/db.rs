//! Postgres-backed analysis storage

use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;

use chess_core::{GameMetadata, GameStatus, MoveAnalysis};

use crate::error::GateError;
use crate::gate::{AnalysisArtifact, AnalysisStore, GameRecord};

type GameRow = (
    i64,
    i64,
    Option<String>,
    String,
    String,
    Option<String>,
    String,
    Json<Vec<String>>,
    String,
    DateTime<Utc>,
);

type ArtifactRow = (i64, i64, i64, Json<Vec<MoveAnalysis>>, DateTime<Utc>);

const GAME_COLUMNS: &str =
    "id, owner_id, event, white, black, date, result, moves, status, created_at";

const ARTIFACT_COLUMNS: &str = "id, game_id, owner_id, moves, created_at";

fn game_from_row(row: GameRow) -> Result<GameRecord, GateError> {
    let (id, owner_id, event, white, black, date, result, Json(moves), status, created_at) = row;
    let status = status
        .parse()
        .map_err(|e: String| GateError::Database(sqlx::Error::Decode(e.into())))?;
    Ok(GameRecord {
        id,
        owner_id,
        metadata: GameMetadata {
            event,
            white,
            black,
            date,
            result,
        },
        moves,
        status,
        created_at,
    })
}

fn artifact_from_row(row: ArtifactRow) -> AnalysisArtifact {
    let (id, game_id, owner_id, Json(moves), created_at) = row;
    AnalysisArtifact {
        id,
        game_id,
        owner_id,
        moves,
        created_at,
    }
}

#[derive(Clone)]
pub struct PgAnalysisStore {
    pool: PgPool,
}

impl PgAnalysisStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Fetch a game regardless of owner (worker side, which acts for the owner).
    pub async fn find_game(&self, game_id: i64) -> Result<Option<GameRecord>, GateError> {
        let row: Option<GameRow> =
            sqlx::query_as(&format!("SELECT {GAME_COLUMNS} FROM games WHERE id = $1"))
                .bind(game_id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(game_from_row).transpose()
    }
}

impl AnalysisStore for PgAnalysisStore {
    async fn find_game_by_id_and_owner(
        &self,
        game_id: i64,
        owner_id: i64,
    ) -> Result<Option<GameRecord>, GateError> {
        let row: Option<GameRow> = sqlx::query_as(&format!(
            "SELECT {GAME_COLUMNS} FROM games WHERE id = $1 AND owner_id = $2"
        ))
        .bind(game_id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(game_from_row).transpose()
    }

    async fn find_existing_artifact_by_game(
        &self,
        game_id: i64,
    ) -> Result<Option<AnalysisArtifact>, GateError> {
        let row: Option<ArtifactRow> = sqlx::query_as(&format!(
            "SELECT {ARTIFACT_COLUMNS} FROM game_analysis WHERE game_id = $1"
        ))
        .bind(game_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(artifact_from_row))
    }

    async fn insert_artifact(
        &self,
        game_id: i64,
        owner_id: i64,
        moves: &[MoveAnalysis],
    ) -> Result<Option<AnalysisArtifact>, GateError> {
        // ON CONFLICT turns the losing side of a save race into an empty result
        let row: Option<ArtifactRow> = sqlx::query_as(&format!(
            "INSERT INTO game_analysis (game_id, owner_id, moves) VALUES ($1, $2, $3)
             ON CONFLICT (game_id) DO NOTHING
             RETURNING {ARTIFACT_COLUMNS}"
        ))
        .bind(game_id)
        .bind(owner_id)
        .bind(Json(moves))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(artifact_from_row))
    }

    async fn update_game_status(&self, game_id: i64, status: GameStatus) -> Result<(), GateError> {
        sqlx::query("UPDATE games SET status = $1, updated_at = NOW() WHERE id = $2")
            .bind(status.as_str())
            .bind(game_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
