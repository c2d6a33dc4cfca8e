//! Core game analysis loop
//!
//! Walks a validated SAN move list ply by ply, evaluating the position before
//! and after each move and classifying the swing.

use chess_core::rules::GamePosition;
use chess_core::MoveAnalysis;
use tracing::{debug, info, warn};

use crate::analysis::{classify, evaluation_delta, is_best_move};
use crate::config::DEFAULT_DEPTH;
use crate::error::WorkerError;
use crate::evaluator::PositionEvaluator;
use crate::gate::{self, AnalysisArtifact, AnalysisStore, GameRecord};

#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    /// Fixed search depth for every position in the run
    pub depth: u32,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            depth: DEFAULT_DEPTH,
        }
    }
}

/// Analyse every ply of `moves`, in order.
///
/// An evaluation failure degrades that ply to `unknown` and the run carries
/// on. Once the session has gone down, the remaining plies are degraded
/// without asking the evaluator again. Only an illegal move fails the run:
/// callers get a complete sequence or an error, never a prefix.
pub async fn analyze_game<E: PositionEvaluator>(
    evaluator: &E,
    moves: &[String],
    options: &AnalysisOptions,
) -> Result<Vec<MoveAnalysis>, WorkerError> {
    info!(plies = moves.len(), depth = options.depth, "Starting analysis");

    let mut position = GamePosition::new();
    let mut analyses = Vec::with_capacity(moves.len());
    let mut degraded = 0usize;
    let mut session_down = false;

    for (ply, san) in moves.iter().enumerate() {
        let before = if session_down {
            None
        } else {
            Some(evaluator.evaluate(&position.fen(), options.depth).await)
        };

        // The move is applied even when the evaluation failed so the live
        // position keeps tracking the game.
        let pre_move = position.clone();
        let played = position.apply_san(san)?;

        let before = match before {
            Some(Ok(eval)) => eval,
            Some(Err(e)) => {
                warn!(ply, san = %san, error = %e, "Pre-move evaluation failed");
                session_down = e.is_session_down();
                analyses.push(MoveAnalysis::degraded(ply, san));
                degraded += 1;
                continue;
            }
            None => {
                analyses.push(MoveAnalysis::degraded(ply, san));
                degraded += 1;
                continue;
            }
        };

        let after = match evaluator.evaluate(&position.fen(), options.depth).await {
            Ok(eval) => eval,
            Err(e) => {
                warn!(ply, san = %san, error = %e, "Post-move evaluation failed");
                session_down = e.is_session_down();
                analyses.push(MoveAnalysis::degraded(ply, san));
                degraded += 1;
                continue;
            }
        };

        let best_san = before
            .best_move_uci
            .as_deref()
            .and_then(|uci| pre_move.uci_to_san(uci));
        let delta = evaluation_delta(before.evaluation_cp, after.evaluation_cp);
        let severity = classify(delta, is_best_move(&played, best_san.as_deref()));
        debug!(ply, san = %san, delta, severity = %severity, "Move classified");

        analyses.push(MoveAnalysis {
            move_index: ply,
            played_move: san.clone(),
            evaluation_after: after.pawns(),
            best_move_san: best_san,
            evaluation_delta: delta,
            severity,
            pv: after.pv,
        });
    }

    if session_down {
        warn!(plies = analyses.len(), degraded, "Engine session went down during analysis");
    }
    info!(plies = analyses.len(), degraded, "Analysis complete");
    Ok(analyses)
}

/// Analyse a stored game and save the result through the persistence gate
/// on behalf of the game's owner.
pub async fn analyze_and_save<E: PositionEvaluator, S: AnalysisStore>(
    evaluator: &E,
    store: &S,
    game: &GameRecord,
    options: &AnalysisOptions,
) -> Result<AnalysisArtifact, WorkerError> {
    let moves = analyze_game(evaluator, &game.moves, options).await?;
    let payload = serde_json::json!({ "moves": serde_json::to_value(&moves)? });
    Ok(gate::save_analysis(store, game.id, Some(game.owner_id), &payload).await?)
}
