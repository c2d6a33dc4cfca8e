//! Worker error types

use std::time::Duration;

use thiserror::Error;

use chess_core::rules::RulesError;

/// Failures of the engine process or of the request/response exchange.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("Engine failed to start: {0}")]
    Startup(String),

    #[error("Engine is not ready")]
    NotReady,

    #[error("Engine is busy with another request")]
    Busy,

    #[error("Engine did not answer within {0:?}")]
    Timeout(Duration),

    #[error("Engine I/O error: {0}")]
    Io(String),

    #[error("Engine closed its output stream")]
    Closed,
}

/// Failure to evaluate a single position. Recoverable per ply unless the
/// session itself is gone.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvaluationError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("Engine finished the search without reporting a score")]
    MissingScore,

    #[error("Invalid FEN '{0}'")]
    InvalidFen(String),

    #[error("Malformed engine output: {0}")]
    Protocol(String),
}

/// Precondition and storage failures of the persistence gate.
#[derive(Error, Debug)]
pub enum GateError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid analysis payload: {0}")]
    InvalidPayload(String),

    #[error("Game not found")]
    NotFound,

    #[error("Analysis already exists")]
    Conflict,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl EvaluationError {
    /// The session was stopped or never became ready; no later request can succeed.
    pub fn is_session_down(&self) -> bool {
        matches!(self, EvaluationError::Engine(EngineError::NotReady))
    }
}

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    IllegalMove(#[from] RulesError),

    #[error("Game not found: {0}")]
    GameNotFound(i64),

    #[error("Persistence error: {0}")]
    Gate(#[from] GateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
