//! Single-position evaluation on top of an engine session

use std::future::Future;

use chess_core::rules::GamePosition;
use tracing::debug;

use crate::engine::EngineSession;
use crate::error::EvaluationError;
use crate::uci::SearchAccumulator;

/// Engine verdict for one position, from White's perspective.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PositionEvaluation {
    /// Centipawns, positive = White is better. Mates are folded into
    /// `±(10000 - 10·n)`.
    pub evaluation_cp: i32,
    pub best_move_uci: Option<String>,
    pub pv: Vec<String>,
}

impl PositionEvaluation {
    pub fn pawns(&self) -> f64 {
        f64::from(self.evaluation_cp) / 100.0
    }
}

/// Anything that can score a FEN at a fixed depth.
pub trait PositionEvaluator {
    fn evaluate(
        &self,
        fen: &str,
        depth: u32,
    ) -> impl Future<Output = Result<PositionEvaluation, EvaluationError>> + Send;
}

impl PositionEvaluator for EngineSession {
    async fn evaluate(&self, fen: &str, depth: u32) -> Result<PositionEvaluation, EvaluationError> {
        let white_to_move = side_to_move(fen)?;

        let position = format!("position fen {fen}");
        let go = format!("go depth {depth}");
        let lines = self
            .request(
                &["ucinewgame", &position, &go],
                |line| line.starts_with("bestmove"),
                self.options().request_timeout,
            )
            .await?;

        let mut search = SearchAccumulator::new();
        for line in &lines {
            search.feed_raw(line);
        }
        let result = search.finish()?;

        let relative = result.score.centipawns();
        let evaluation_cp = if white_to_move { relative } else { relative.saturating_neg() };
        debug!(fen, evaluation_cp, best = ?result.best_move, "Position evaluated");

        Ok(PositionEvaluation {
            evaluation_cp,
            best_move_uci: result.best_move,
            pv: result.pv,
        })
    }
}

/// `true` when White is to move. Rejects FENs the rules engine can't load.
fn side_to_move(fen: &str) -> Result<bool, EvaluationError> {
    GamePosition::from_fen(fen)
        .map(|position| position.white_to_move())
        .map_err(|_| EvaluationError::InvalidFen(fen.to_string()))
}
