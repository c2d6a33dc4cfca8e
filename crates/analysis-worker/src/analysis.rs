/// Move classification: pure functions only
/// (No engine or position dependencies)

use chess_core::rules::canonical_san;
use chess_core::Severity;

/// Swing thresholds in pawns
const THRESHOLD_GOOD: f64 = 0.3;
const THRESHOLD_INACCURACY: f64 = 0.8;
const THRESHOLD_MISTAKE: f64 = 1.5;

/// Severity of a move from the White-relative evaluation swing it caused.
///
/// The sign of `evaluation_delta` is ignored: a large swing is bad for
/// whoever made the move.
pub fn classify(evaluation_delta: f64, is_best: bool) -> Severity {
    if is_best {
        return Severity::Best;
    }

    let swing = evaluation_delta.abs();
    if swing < THRESHOLD_GOOD {
        Severity::Good
    } else if swing < THRESHOLD_INACCURACY {
        Severity::Inaccuracy
    } else if swing < THRESHOLD_MISTAKE {
        Severity::Mistake
    } else {
        Severity::Blunder
    }
}

/// Whether the played move is the engine's choice. A best move that could not
/// be translated to SAN never matches.
pub fn is_best_move(played: &str, best_san: Option<&str>) -> bool {
    match best_san {
        Some(best) => canonical_san(played) == canonical_san(best),
        None => false,
    }
}

/// Evaluation change across a move, both sides White-relative, in pawns.
/// Taken on integer centipawns so `0.2 -> 1.9` gives exactly `1.7`.
pub fn evaluation_delta(before_cp: i32, after_cp: i32) -> f64 {
    f64::from(after_cp - before_cp) / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_overrides_any_swing() {
        for delta in [-12.0, -1.5, 0.0, 0.29, 3.0, 99.0] {
            assert_eq!(classify(delta, true), Severity::Best);
        }
    }

    #[test]
    fn test_threshold_boundaries() {
        assert_eq!(classify(0.0, false), Severity::Good);
        assert_eq!(classify(0.29, false), Severity::Good);
        assert_eq!(classify(0.3, false), Severity::Inaccuracy);
        assert_eq!(classify(0.79, false), Severity::Inaccuracy);
        assert_eq!(classify(0.8, false), Severity::Mistake);
        assert_eq!(classify(1.49, false), Severity::Mistake);
        assert_eq!(classify(1.5, false), Severity::Blunder);
    }

    #[test]
    fn test_sign_insensitive() {
        assert_eq!(classify(-2.0, false), classify(2.0, false));
        assert_eq!(classify(-0.5, false), Severity::Inaccuracy);
        assert_eq!(classify(-1.0, false), Severity::Mistake);
    }

    #[test]
    fn test_is_best_move_ignores_suffixes() {
        assert!(is_best_move("Qxf7#", Some("Qxf7#")));
        assert!(is_best_move("Bb5+", Some("Bb5")));
        assert!(is_best_move("Nf3!", Some("Nf3")));
        assert!(!is_best_move("Nf3", Some("Nc3")));
    }

    #[test]
    fn test_untranslatable_best_is_not_best() {
        assert!(!is_best_move("e4", None));
    }

    #[test]
    fn test_delta_in_pawns() {
        assert_eq!(evaluation_delta(20, 190), 1.7);
        assert_eq!(evaluation_delta(190, 20), -1.7);
        assert_eq!(evaluation_delta(-9980, 0), 99.8);
    }
}
