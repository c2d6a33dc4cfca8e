//! Analysis persistence gate
//!
//! At most one analysis artifact per game. Preconditions are checked in a
//! fixed order and the first failure wins; none of them has side effects.
//! The storage layer's unique constraint on the game id settles races between
//! concurrent saves.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{error, info};

use chess_core::{GameMetadata, GameStatus, MoveAnalysis};

use crate::error::GateError;

/// A stored game as seen by its owner.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    pub id: i64,
    pub owner_id: i64,
    #[serde(flatten)]
    pub metadata: GameMetadata,
    pub moves: Vec<String>,
    pub status: GameStatus,
    pub created_at: DateTime<Utc>,
}

/// The immutable result of analysing one game.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisArtifact {
    pub id: i64,
    pub game_id: i64,
    pub owner_id: i64,
    pub moves: Vec<MoveAnalysis>,
    pub created_at: DateTime<Utc>,
}

/// Storage the gate runs against. Every method may fail with a transient
/// error, which the gate propagates unchanged.
pub trait AnalysisStore {
    fn find_game_by_id_and_owner(
        &self,
        game_id: i64,
        owner_id: i64,
    ) -> impl Future<Output = Result<Option<GameRecord>, GateError>> + Send;

    fn find_existing_artifact_by_game(
        &self,
        game_id: i64,
    ) -> impl Future<Output = Result<Option<AnalysisArtifact>, GateError>> + Send;

    /// `Ok(None)` when the storage uniqueness constraint rejected the row.
    fn insert_artifact(
        &self,
        game_id: i64,
        owner_id: i64,
        moves: &[MoveAnalysis],
    ) -> impl Future<Output = Result<Option<AnalysisArtifact>, GateError>> + Send;

    fn update_game_status(
        &self,
        game_id: i64,
        status: GameStatus,
    ) -> impl Future<Output = Result<(), GateError>> + Send;
}

/// Store an analysis for `game_id` on behalf of `owner`.
///
/// Order of checks: authenticated, well-formed payload, game owned by the
/// caller, no artifact yet. On success the game is marked analyzed after the
/// artifact is written. If that second write fails the artifact stays and
/// the error is returned.
pub async fn save_analysis<S: AnalysisStore>(
    store: &S,
    game_id: i64,
    owner: Option<i64>,
    payload: &JsonValue,
) -> Result<AnalysisArtifact, GateError> {
    let owner_id = owner.ok_or(GateError::Unauthorized)?;
    let moves = parse_payload(payload)?;

    store
        .find_game_by_id_and_owner(game_id, owner_id)
        .await?
        .ok_or(GateError::NotFound)?;

    if store.find_existing_artifact_by_game(game_id).await?.is_some() {
        return Err(GateError::Conflict);
    }

    // A concurrent save can still win between the check above and here
    let artifact = store
        .insert_artifact(game_id, owner_id, &moves)
        .await?
        .ok_or(GateError::Conflict)?;

    if let Err(e) = store.update_game_status(game_id, GameStatus::Analyzed).await {
        error!(
            game_id,
            artifact_id = artifact.id,
            error = %e,
            "Analysis stored but game status update failed"
        );
        return Err(e);
    }

    info!(game_id, owner_id, plies = artifact.moves.len(), "Analysis saved");
    Ok(artifact)
}

/// Read back the artifact for a game the caller owns.
pub async fn load_analysis<S: AnalysisStore>(
    store: &S,
    game_id: i64,
    owner: Option<i64>,
) -> Result<AnalysisArtifact, GateError> {
    let owner_id = owner.ok_or(GateError::Unauthorized)?;

    store
        .find_game_by_id_and_owner(game_id, owner_id)
        .await?
        .ok_or(GateError::NotFound)?;

    store
        .find_existing_artifact_by_game(game_id)
        .await?
        .ok_or(GateError::NotFound)
}

/// Accepts `{"moves": [MoveAnalysis, ...]}` with `moveIndex` running 0..n.
pub fn parse_payload(payload: &JsonValue) -> Result<Vec<MoveAnalysis>, GateError> {
    let items = payload
        .get("moves")
        .and_then(JsonValue::as_array)
        .ok_or_else(|| GateError::InvalidPayload("expected an object with a 'moves' array".into()))?;

    let mut moves = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let analysis: MoveAnalysis = serde_json::from_value(item.clone())
            .map_err(|e| GateError::InvalidPayload(format!("moves[{i}]: {e}")))?;
        if analysis.move_index != i {
            return Err(GateError::InvalidPayload(format!(
                "moves[{i}] has moveIndex {}",
                analysis.move_index
            )));
        }
        moves.push(analysis);
    }
    Ok(moves)
}
