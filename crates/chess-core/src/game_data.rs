use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameMetadata {
    pub event: Option<String>,
    pub white: String,
    pub black: String,
    pub date: Option<String>,
    pub result: String, // "1-0", "0-1", "1/2-1/2", "*"
}

/// Lifecycle of a stored game. A game only becomes `Analyzed` as a side
/// effect of its analysis artifact being created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Uploaded,
    Analyzed,
}

impl GameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            GameStatus::Uploaded => "uploaded",
            GameStatus::Analyzed => "analyzed",
        }
    }
}

impl FromStr for GameStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uploaded" => Ok(GameStatus::Uploaded),
            "analyzed" => Ok(GameStatus::Analyzed),
            other => Err(format!("unknown game status '{other}'")),
        }
    }
}

/// Quality label for a single played move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Best,
    Good,
    Inaccuracy,
    Mistake,
    Blunder,
    /// The engine could not evaluate this ply.
    Unknown,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Best => "best",
            Severity::Good => "good",
            Severity::Inaccuracy => "inaccuracy",
            Severity::Mistake => "mistake",
            Severity::Blunder => "blunder",
            Severity::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine verdict for one ply. Evaluations are in pawns from White's side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveAnalysis {
    pub move_index: usize,
    #[serde(rename = "move")]
    pub played_move: String,
    #[serde(rename = "evaluation")]
    pub evaluation_after: f64,
    #[serde(rename = "bestMove")]
    pub best_move_san: Option<String>,
    #[serde(rename = "evalDiff")]
    pub evaluation_delta: f64,
    pub severity: Severity,
    /// Principal variation after the move, UCI notation
    #[serde(default)]
    pub pv: Vec<String>,
}

impl MoveAnalysis {
    /// Placeholder for a ply whose evaluation failed. Never reports a score.
    pub fn degraded(move_index: usize, played_move: &str) -> Self {
        Self {
            move_index,
            played_move: played_move.to_string(),
            evaluation_after: 0.0,
            best_move_san: None,
            evaluation_delta: 0.0,
            severity: Severity::Unknown,
            pv: Vec::new(),
        }
    }

    /// White plays the even plies.
    pub fn is_white(&self) -> bool {
        self.move_index % 2 == 0
    }
}
