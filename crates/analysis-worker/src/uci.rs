//! UCI output parsing: per-line classification plus the "most recent wins"
//! accumulation of a running search.

use crate::error::EvaluationError;

/// Centipawn value reported for a forced mate before the distance adjustment
pub const MATE_SCORE: i32 = 10_000;

/// Keywords that may follow (and so terminate) a `pv` move list
const INFO_KEYWORDS: &[&str] = &[
    "depth", "seldepth", "time", "nodes", "multipv", "score", "currmove",
    "currmovenumber", "hashfull", "nps", "tbhits", "sbhits", "cpuload",
    "string", "refutation", "currline", "wdl", "bmc",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    /// Centipawns from the side to move
    Cp(i32),
    /// Mate in N (negative = side to move gets mated)
    Mate(i32),
}

impl Score {
    /// Collapse to centipawns, side-to-move relative. Shorter mates score higher.
    pub fn centipawns(self) -> i32 {
        match self {
            Score::Cp(cp) => cp,
            // Absurd distances saturate instead of crossing zero
            Score::Mate(m) if m > 0 => MATE_SCORE.saturating_sub(m.saturating_mul(10)).max(0),
            Score::Mate(m) => (-MATE_SCORE).saturating_sub(m.saturating_mul(10)).min(0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Lower,
    Upper,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InfoLine {
    pub depth: Option<u32>,
    pub multipv: Option<u32>,
    pub score: Option<Score>,
    /// Set when the score is only a search bound, not a final value
    pub bound: Option<Bound>,
    pub pv: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UciLine {
    /// `info ...` carrying score and/or principal variation
    Info(InfoLine),
    /// Terminal `bestmove` line; `best` is `None` for `bestmove (none)`
    BestMove {
        best: Option<String>,
        ponder: Option<String>,
    },
    UciOk,
    ReadyOk,
    Other,
}

/// Classify one line of engine output.
pub fn classify_line(line: &str) -> UciLine {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    match tokens.first() {
        Some(&"info") => parse_info(&tokens[1..]),
        Some(&"bestmove") => {
            let best = tokens
                .get(1)
                .filter(|m| **m != "(none)")
                .map(|m| m.to_string());
            let ponder = match (tokens.get(2), tokens.get(3)) {
                (Some(&"ponder"), Some(m)) => Some(m.to_string()),
                _ => None,
            };
            UciLine::BestMove { best, ponder }
        }
        Some(&"uciok") => UciLine::UciOk,
        Some(&"readyok") => UciLine::ReadyOk,
        _ => UciLine::Other,
    }
}

fn parse_info(tokens: &[&str]) -> UciLine {
    let mut info = InfoLine::default();
    let mut i = 0;

    while i < tokens.len() {
        match tokens[i] {
            // Free text up to end of line
            "string" if i == 0 => return UciLine::Other,
            "string" => break,
            "depth" => {
                info.depth = tokens.get(i + 1).and_then(|v| v.parse().ok());
                i += 2;
            }
            "multipv" => {
                info.multipv = tokens.get(i + 1).and_then(|v| v.parse().ok());
                i += 2;
            }
            "score" => {
                let value = tokens.get(i + 2).and_then(|v| v.parse::<i32>().ok());
                info.score = match (tokens.get(i + 1), value) {
                    (Some(&"cp"), Some(v)) => Some(Score::Cp(v)),
                    (Some(&"mate"), Some(v)) => Some(Score::Mate(v)),
                    _ => None,
                };
                i += 3;
            }
            "lowerbound" => {
                info.bound = Some(Bound::Lower);
                i += 1;
            }
            "upperbound" => {
                info.bound = Some(Bound::Upper);
                i += 1;
            }
            "pv" => {
                info.pv = tokens[i + 1..]
                    .iter()
                    .take_while(|t| !INFO_KEYWORDS.contains(t))
                    .map(|t| t.to_string())
                    .collect();
                i += 1 + info.pv.len();
            }
            _ => i += 1,
        }
    }

    UciLine::Info(info)
}

/// Final result of one search, still side-to-move relative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResult {
    pub score: Score,
    pub best_move: Option<String>,
    pub pv: Vec<String>,
}

/// Folds a stream of engine lines into a search result. Every score and PV
/// is provisional until the `bestmove` line arrives.
#[derive(Debug, Default)]
pub struct SearchAccumulator {
    score: Option<Score>,
    pv: Vec<String>,
    best_move: Option<String>,
    finished: bool,
}

impl SearchAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, line: &UciLine) {
        match line {
            UciLine::Info(info) => {
                // Secondary lines of a multi-PV search are not the main line
                if info.multipv.is_some_and(|n| n > 1) {
                    return;
                }
                if let (Some(score), None) = (info.score, info.bound) {
                    self.score = Some(score);
                }
                if !info.pv.is_empty() {
                    self.pv = info.pv.clone();
                }
            }
            UciLine::BestMove { best, .. } => {
                self.best_move = best.clone();
                self.finished = true;
            }
            _ => {}
        }
    }

    pub fn feed_raw(&mut self, raw: &str) {
        self.feed(&classify_line(raw));
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn finish(self) -> Result<SearchResult, EvaluationError> {
        if !self.finished {
            return Err(EvaluationError::Protocol(
                "search output ended without bestmove".into(),
            ));
        }
        let score = self.score.ok_or(EvaluationError::MissingScore)?;
        Ok(SearchResult {
            score,
            best_move: self.best_move,
            pv: self.pv,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extreme_scores_do_not_overflow() {
        assert_eq!(Score::Mate(300_000_000).centipawns(), 0);
        assert_eq!(Score::Mate(-300_000_000).centipawns(), 0);
        assert_eq!(Score::Mate(i32::MIN).centipawns(), 0);
        assert_eq!(Score::Cp(i32::MIN).centipawns(), i32::MIN);

        let line = "info depth 1 score mate 300000000 pv e2e4";
        match classify_line(line) {
            UciLine::Info(info) => assert_eq!(info.score, Some(Score::Mate(300_000_000))),
            other => panic!("expected info line, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_cp() {
        let line = "info depth 20 seldepth 25 multipv 1 score cp 35 nodes 100000 pv e2e4";
        match classify_line(line) {
            UciLine::Info(info) => {
                assert_eq!(info.depth, Some(20));
                assert_eq!(info.score, Some(Score::Cp(35)));
                assert_eq!(info.bound, None);
            }
            other => panic!("expected info line, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_mate() {
        let line = "info depth 20 score mate -3 nodes 100000 pv e2e4";
        let UciLine::Info(info) = classify_line(line) else {
            panic!("expected info line");
        };
        assert_eq!(info.score, Some(Score::Mate(-3)));
    }

    #[test]
    fn test_parse_pv() {
        let line = "info depth 20 score cp 35 pv e2e4 e7e5 g1f3";
        let UciLine::Info(info) = classify_line(line) else {
            panic!("expected info line");
        };
        assert_eq!(info.pv, vec!["e2e4", "e7e5", "g1f3"]);
    }

    #[test]
    fn test_pv_stops_at_keyword() {
        let line = "info depth 9 score cp 12 pv d2d4 d7d5 bmc 0.5";
        let UciLine::Info(info) = classify_line(line) else {
            panic!("expected info line");
        };
        assert_eq!(info.pv, vec!["d2d4", "d7d5"]);
    }

    #[test]
    fn test_bound_flag() {
        let line = "info depth 14 seldepth 18 score cp 40 lowerbound nodes 5000 pv e2e4";
        let UciLine::Info(info) = classify_line(line) else {
            panic!("expected info line");
        };
        assert_eq!(info.bound, Some(Bound::Lower));
    }

    #[test]
    fn test_info_string_is_other() {
        let line = "info string NNUE evaluation using nn-1111cefa1111.nnue pv cp 10";
        assert_eq!(classify_line(line), UciLine::Other);
    }

    #[test]
    fn test_bestmove_lines() {
        assert_eq!(
            classify_line("bestmove e2e4 ponder e7e5"),
            UciLine::BestMove {
                best: Some("e2e4".into()),
                ponder: Some("e7e5".into()),
            }
        );
        assert_eq!(
            classify_line("bestmove (none)"),
            UciLine::BestMove {
                best: None,
                ponder: None
            }
        );
    }

    #[test]
    fn test_handshake_tokens() {
        assert_eq!(classify_line("uciok"), UciLine::UciOk);
        assert_eq!(classify_line("readyok"), UciLine::ReadyOk);
        assert_eq!(classify_line("id name Stockfish 17"), UciLine::Other);
    }

    #[test]
    fn test_mate_centipawns() {
        assert_eq!(Score::Mate(3).centipawns(), 9970);
        assert_eq!(Score::Mate(-2).centipawns(), -9980);
        assert_eq!(Score::Mate(0).centipawns(), -10000);
        assert_eq!(Score::Cp(-45).centipawns(), -45);
    }

    #[test]
    fn test_accumulator_most_recent_wins() {
        let mut acc = SearchAccumulator::new();
        acc.feed_raw("info depth 10 score cp 20 pv e2e4 e7e5");
        acc.feed_raw("info depth 12 score cp 55 upperbound pv d2d4");
        acc.feed_raw("info depth 12 score cp 31 pv g1f3 d7d5 d2d4");
        acc.feed_raw("info depth 13 currmove b1c3 currmovenumber 4");
        assert!(!acc.is_finished());
        acc.feed_raw("bestmove g1f3 ponder d7d5");

        let result = acc.finish().unwrap();
        assert_eq!(result.score, Score::Cp(31));
        assert_eq!(result.pv, vec!["g1f3", "d7d5", "d2d4"]);
        assert_eq!(result.best_move.as_deref(), Some("g1f3"));
    }

    #[test]
    fn test_accumulator_ignores_secondary_multipv() {
        let mut acc = SearchAccumulator::new();
        acc.feed_raw("info depth 10 multipv 1 score cp 20 pv e2e4");
        acc.feed_raw("info depth 10 multipv 2 score cp -80 pv a2a3");
        acc.feed_raw("bestmove e2e4");
        let result = acc.finish().unwrap();
        assert_eq!(result.score, Score::Cp(20));
        assert_eq!(result.pv, vec!["e2e4"]);
    }

    #[test]
    fn test_accumulator_requires_bestmove_and_score() {
        let mut unfinished = SearchAccumulator::new();
        unfinished.feed_raw("info depth 3 score cp 10 pv e2e4");
        assert!(matches!(
            unfinished.finish(),
            Err(EvaluationError::Protocol(_))
        ));

        let mut only_bounds = SearchAccumulator::new();
        only_bounds.feed_raw("info depth 3 score cp 10 lowerbound pv e2e4");
        only_bounds.feed_raw("bestmove e2e4");
        assert_eq!(only_bounds.finish(), Err(EvaluationError::MissingScore));
    }
}
