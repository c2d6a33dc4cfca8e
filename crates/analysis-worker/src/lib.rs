pub mod analysis;
pub mod analyzer;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod gate;
pub mod uci;

#[cfg(test)]
mod test_support;

pub use analyzer::{analyze_and_save, analyze_game, AnalysisOptions};
pub use engine::{EngineOptions, EnginePool, EngineSession, SessionState};
pub use error::{EngineError, EvaluationError, GateError, WorkerError};
pub use evaluator::{PositionEvaluation, PositionEvaluator};
pub use gate::{AnalysisArtifact, AnalysisStore, GameRecord};
