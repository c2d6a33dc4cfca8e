use axum::{
    body::Bytes,
    extract::{Path, Query},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;

use analysis_worker::db::PgAnalysisStore;
use analysis_worker::gate::{self, AnalysisStore};
use analysis_worker::GateError;
use chess_core::annotation::engine_annotations;
use chess_core::rules::validate_san_line;
use chess_core::summary::AnalysisSummary;
use chess_core::GameMetadata;

use crate::auth::middleware::{AuthUser, MaybeAuthUser};
use crate::db::games::{self, InsertOutcome};
use crate::error::AppError;

const RESULTS: [&str; 4] = ["1-0", "0-1", "1/2-1/2", "*"];

#[derive(Deserialize)]
pub struct UploadGameRequest {
    #[serde(flatten)]
    pub metadata: GameMetadata,
    /// SAN move list
    pub moves: Vec<String>,
}

/// POST /api/games
pub async fn upload_game(
    Extension(pool): Extension<PgPool>,
    user: AuthUser,
    Json(body): Json<UploadGameRequest>,
) -> Result<(StatusCode, Json<JsonValue>), AppError> {
    if !RESULTS.contains(&body.metadata.result.as_str()) {
        return Err(AppError::BadRequest(format!(
            "Invalid result '{}'",
            body.metadata.result
        )));
    }
    // The analyzer treats an illegal move as fatal, so reject bad games here
    validate_san_line(&body.moves)?;

    match games::insert_game(&pool, user.id, &body.metadata, &body.moves).await? {
        InsertOutcome::Inserted(game) => {
            tracing::info!(game_id = game.id, owner_id = user.id, plies = game.moves.len(), "Game uploaded");
            Ok((StatusCode::CREATED, Json(json!(game))))
        }
        InsertOutcome::Duplicate(existing_id) => {
            tracing::info!(existing_id, owner_id = user.id, "Duplicate game upload rejected");
            Err(AppError::DuplicateGame(existing_id))
        }
    }
}

#[derive(Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

/// GET /api/games
pub async fn list_games(
    Extension(pool): Extension<PgPool>,
    Query(q): Query<LimitQuery>,
    user: AuthUser,
) -> Result<Json<JsonValue>, AppError> {
    let limit = q.limit.unwrap_or(50).clamp(1, 100);
    let games_list = games::list_games(&pool, user.id, limit).await?;

    Ok(Json(json!({
        "games": games_list,
        "total": games_list.len(),
    })))
}

/// GET /api/games/{game_id}
pub async fn get_game_by_id(
    Extension(pool): Extension<PgPool>,
    Path(game_id): Path<i64>,
    user: AuthUser,
) -> Result<Json<JsonValue>, AppError> {
    let store = PgAnalysisStore::new(pool);
    let game = store
        .find_game_by_id_and_owner(game_id, user.id)
        .await?
        .ok_or(AppError::NotFound("Game not found".into()))?;

    Ok(Json(json!(game)))
}

/// GET /api/games/{game_id}/analysis
pub async fn get_game_analysis(
    Extension(pool): Extension<PgPool>,
    Path(game_id): Path<i64>,
    user: AuthUser,
) -> Result<Json<JsonValue>, AppError> {
    let store = PgAnalysisStore::new(pool);
    let artifact = gate::load_analysis(&store, game_id, Some(user.id))
        .await
        .map_err(|e| match e {
            GateError::NotFound => AppError::NotFound("Analysis not found".into()),
            other => other.into(),
        })?;

    let summary = AnalysisSummary::from_moves(&artifact.moves);
    let annotations = engine_annotations(&artifact.moves);

    Ok(Json(json!({
        "analysis": artifact,
        "summary": summary,
        "annotations": annotations,
    })))
}

/// POST /api/games/{game_id}/analysis
///
/// Auth is resolved inside the gate so that a missing login is reported
/// before a malformed body.
pub async fn save_game_analysis(
    Extension(pool): Extension<PgPool>,
    Path(game_id): Path<i64>,
    user: MaybeAuthUser,
    body: Bytes,
) -> Result<(StatusCode, Json<JsonValue>), AppError> {
    let payload: JsonValue = serde_json::from_slice(&body).unwrap_or(JsonValue::Null);

    let store = PgAnalysisStore::new(pool);
    let artifact = gate::save_analysis(&store, game_id, user.id(), &payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "analysisId": artifact.id,
            "gameId": artifact.game_id,
        })),
    ))
}
