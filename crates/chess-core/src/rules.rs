//! Rules engine boundary: move application, SAN/UCI translation and FEN
//! export, delegated to shakmaty.

use shakmaty::fen::Fen;
use shakmaty::san::{San, SanPlus};
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Position};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RulesError {
    #[error("Invalid SAN '{0}'")]
    InvalidSan(String),

    #[error("Illegal move '{san}' at ply {ply}")]
    IllegalMove { ply: usize, san: String },

    #[error("Invalid FEN '{0}'")]
    InvalidFen(String),
}

/// A live position that advances one SAN move at a time.
#[derive(Debug, Clone, Default)]
pub struct GamePosition {
    pos: Chess,
    ply: usize,
}

impl GamePosition {
    /// Standard starting position
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fen(fen: &str) -> Result<Self, RulesError> {
        let parsed: Fen = fen
            .parse()
            .map_err(|_| RulesError::InvalidFen(fen.to_string()))?;
        let pos = parsed
            .into_position::<Chess>(CastlingMode::Standard)
            .map_err(|_| RulesError::InvalidFen(fen.to_string()))?;
        Ok(Self { pos, ply: 0 })
    }

    pub fn fen(&self) -> String {
        Fen::from_position(&self.pos, EnPassantMode::Legal).to_string()
    }

    /// Number of moves applied since construction
    pub fn ply(&self) -> usize {
        self.ply
    }

    pub fn white_to_move(&self) -> bool {
        self.pos.turn() == Color::White
    }

    /// Apply a SAN move and return its canonical SAN (no check suffix).
    pub fn apply_san(&mut self, san: &str) -> Result<String, RulesError> {
        let parsed: SanPlus = canonical_san(san)
            .parse()
            .map_err(|_| RulesError::InvalidSan(san.to_string()))?;

        let mv = parsed
            .san
            .to_move(&self.pos)
            .map_err(|_| RulesError::IllegalMove {
                ply: self.ply,
                san: san.to_string(),
            })?;

        let canonical = San::from_move(&self.pos, mv).to_string();
        self.pos.play_unchecked(mv);
        self.ply += 1;
        Ok(canonical)
    }

    /// Translate a UCI move to SAN in this position. Unparseable or illegal
    /// moves yield `None`.
    pub fn uci_to_san(&self, uci: &str) -> Option<String> {
        let uci_move: UciMove = uci.parse().ok()?;
        let legal_move = uci_move.to_move(&self.pos).ok()?;
        Some(San::from_move(&self.pos, legal_move).to_string())
    }
}

/// Strip check/mate markers and move-quality glyphs (`Nf3+`, `e4!?`).
pub fn canonical_san(san: &str) -> &str {
    san.trim()
        .trim_end_matches(|c| matches!(c, '+' | '#' | '!' | '?'))
}

/// Replay a SAN move list from the start position, returning the number of
/// plies on success.
pub fn validate_san_line(moves: &[String]) -> Result<usize, RulesError> {
    let mut position = GamePosition::new();
    for san in moves {
        position.apply_san(san)?;
    }
    Ok(position.ply())
}

#[cfg(test)]
mod tests {
    use super::*;

    const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";

    #[test]
    fn test_apply_san_advances_position() {
        let mut position = GamePosition::new();
        assert!(position.white_to_move());

        assert_eq!(position.apply_san("e4").unwrap(), "e4");
        assert_eq!(position.fen(), AFTER_E4);
        assert!(!position.white_to_move());
        assert_eq!(position.ply(), 1);
    }

    #[test]
    fn test_apply_san_strips_glyphs() {
        let mut position = GamePosition::new();
        assert_eq!(position.apply_san("e4!").unwrap(), "e4");
        assert_eq!(position.apply_san("e5?!").unwrap(), "e5");
        assert_eq!(position.apply_san("Nf3").unwrap(), "Nf3");
    }

    #[test]
    fn test_illegal_move_reports_ply() {
        let mut position = GamePosition::new();
        position.apply_san("e4").unwrap();
        let err = position.apply_san("Ke7").unwrap_err();
        assert_eq!(
            err,
            RulesError::IllegalMove {
                ply: 1,
                san: "Ke7".into()
            }
        );
        // Position untouched by the failed move
        assert_eq!(position.fen(), AFTER_E4);
    }

    #[test]
    fn test_unparseable_san() {
        let mut position = GamePosition::new();
        assert!(matches!(
            position.apply_san("hello"),
            Err(RulesError::InvalidSan(_))
        ));
    }

    #[test]
    fn test_uci_to_san() {
        let position = GamePosition::new();
        assert_eq!(position.uci_to_san("g1f3").as_deref(), Some("Nf3"));
        assert_eq!(position.uci_to_san("e2e4").as_deref(), Some("e4"));
        assert_eq!(position.uci_to_san("e2e5"), None);
        assert_eq!(position.uci_to_san("zz"), None);
        assert_eq!(position.uci_to_san("(none)"), None);
    }

    #[test]
    fn test_uci_to_san_promotion() {
        let position = GamePosition::from_fen("8/P7/8/8/8/8/8/k6K w - - 0 1").unwrap();
        assert_eq!(position.uci_to_san("a7a8q").as_deref(), Some("a8=Q"));
    }

    #[test]
    fn test_invalid_fen() {
        assert!(matches!(
            GamePosition::from_fen("not a fen"),
            Err(RulesError::InvalidFen(_))
        ));
    }

    #[test]
    fn test_validate_san_line() {
        let moves: Vec<String> = ["e4", "e5", "Nf3", "Nc6", "Bb5"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(validate_san_line(&moves), Ok(5));

        let bad: Vec<String> = ["e4", "e4"].iter().map(|s| s.to_string()).collect();
        assert!(matches!(
            validate_san_line(&bad),
            Err(RulesError::IllegalMove { ply: 1, .. })
        ));
    }

    #[test]
    fn test_canonical_san() {
        assert_eq!(canonical_san("Qxf7#"), "Qxf7");
        assert_eq!(canonical_san(" Nf3+ "), "Nf3");
        assert_eq!(canonical_san("O-O"), "O-O");
    }
}
