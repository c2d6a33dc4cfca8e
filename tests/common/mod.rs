#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::Utc;
use reqwest::Client;

use analysis_worker::{
    AnalysisArtifact, AnalysisStore, EvaluationError, GameRecord, GateError, PositionEvaluation,
    PositionEvaluator,
};
use chess_core::{GameMetadata, GameStatus, MoveAnalysis};

pub const BASE_URL: &str = "http://localhost:8000";

/// Build a reqwest client for tests.
pub fn client() -> Client {
    Client::new()
}

/// Generate a unique suffix based on timestamp to avoid collisions.
pub fn unique_suffix() -> String {
    let ts = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}", ts % 1_000_000_000)
}

/// Build a URL for an API endpoint.
pub fn url(path: &str) -> String {
    format!("{}{}", BASE_URL, path)
}

/// Split a space-separated SAN line.
pub fn san_line(line: &str) -> Vec<String> {
    line.split_whitespace().map(String::from).collect()
}

// ---------------------------------------------------------------------------
// Evaluator double
// ---------------------------------------------------------------------------

type Script = Box<dyn Fn(usize, &str) -> Result<PositionEvaluation, EvaluationError> + Send + Sync>;

/// Answers the `n`th evaluation call (0-based) with `script(n, fen)`.
pub struct StubEvaluator {
    script: Script,
    calls: Mutex<usize>,
}

impl StubEvaluator {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(usize, &str) -> Result<PositionEvaluation, EvaluationError> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            calls: Mutex::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

pub fn eval(evaluation_cp: i32, best_move_uci: Option<&str>) -> PositionEvaluation {
    PositionEvaluation {
        evaluation_cp,
        best_move_uci: best_move_uci.map(String::from),
        pv: best_move_uci.map(|m| vec![m.to_string()]).unwrap_or_default(),
    }
}

impl PositionEvaluator for StubEvaluator {
    async fn evaluate(&self, fen: &str, _depth: u32) -> Result<PositionEvaluation, EvaluationError> {
        let call = {
            let mut calls = self.calls.lock().unwrap();
            *calls += 1;
            *calls - 1
        };
        (self.script)(call, fen)
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryStore {
    games: Mutex<HashMap<i64, GameRecord>>,
    artifacts: Mutex<HashMap<i64, AnalysisArtifact>>,
}

impl MemoryStore {
    pub fn add_game(&self, id: i64, owner_id: i64, moves: &[String]) -> GameRecord {
        let game = GameRecord {
            id,
            owner_id,
            metadata: GameMetadata {
                white: "White".into(),
                black: "Black".into(),
                result: "*".into(),
                ..GameMetadata::default()
            },
            moves: moves.to_vec(),
            status: GameStatus::Uploaded,
            created_at: Utc::now(),
        };
        self.games.lock().unwrap().insert(id, game.clone());
        game
    }

    pub fn status(&self, id: i64) -> Option<GameStatus> {
        self.games.lock().unwrap().get(&id).map(|g| g.status)
    }

    pub fn artifact_count(&self) -> usize {
        self.artifacts.lock().unwrap().len()
    }
}

impl AnalysisStore for MemoryStore {
    async fn find_game_by_id_and_owner(
        &self,
        game_id: i64,
        owner_id: i64,
    ) -> Result<Option<GameRecord>, GateError> {
        let games = self.games.lock().unwrap();
        Ok(games.get(&game_id).filter(|g| g.owner_id == owner_id).cloned())
    }

    async fn find_existing_artifact_by_game(
        &self,
        game_id: i64,
    ) -> Result<Option<AnalysisArtifact>, GateError> {
        Ok(self.artifacts.lock().unwrap().get(&game_id).cloned())
    }

    async fn insert_artifact(
        &self,
        game_id: i64,
        owner_id: i64,
        moves: &[MoveAnalysis],
    ) -> Result<Option<AnalysisArtifact>, GateError> {
        let mut artifacts = self.artifacts.lock().unwrap();
        if artifacts.contains_key(&game_id) {
            return Ok(None);
        }
        let artifact = AnalysisArtifact {
            id: artifacts.len() as i64 + 1,
            game_id,
            owner_id,
            moves: moves.to_vec(),
            created_at: Utc::now(),
        };
        artifacts.insert(game_id, artifact.clone());
        Ok(Some(artifact))
    }

    async fn update_game_status(&self, game_id: i64, status: GameStatus) -> Result<(), GateError> {
        let mut games = self.games.lock().unwrap();
        let game = games.get_mut(&game_id).ok_or(GateError::NotFound)?;
        game.status = status;
        Ok(())
    }
}
