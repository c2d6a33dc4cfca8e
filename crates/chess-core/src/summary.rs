//! Per-side review summary derived from a finished analysis.

use serde::{Deserialize, Serialize};

use crate::game_data::{MoveAnalysis, Severity};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SideSummary {
    pub best: u32,
    pub good: u32,
    pub inaccuracy: u32,
    pub mistake: u32,
    pub blunder: u32,
    pub unknown: u32,
    /// `None` when no move of this side could be evaluated
    pub accuracy: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub white: SideSummary,
    pub black: SideSummary,
}

impl AnalysisSummary {
    pub fn from_moves(moves: &[MoveAnalysis]) -> Self {
        let mut white = SideTally::default();
        let mut black = SideTally::default();

        for mv in moves {
            let tally = if mv.is_white() { &mut white } else { &mut black };
            tally.record(mv);
        }

        Self {
            white: white.finish(),
            black: black.finish(),
        }
    }
}

#[derive(Default)]
struct SideTally {
    summary: SideSummary,
    total_loss_cp: f64,
    evaluated: u32,
}

impl SideTally {
    fn record(&mut self, mv: &MoveAnalysis) {
        let s = &mut self.summary;
        match mv.severity {
            Severity::Best => s.best += 1,
            Severity::Good => s.good += 1,
            Severity::Inaccuracy => s.inaccuracy += 1,
            Severity::Mistake => s.mistake += 1,
            Severity::Blunder => s.blunder += 1,
            Severity::Unknown => {
                s.unknown += 1;
                return;
            }
        }
        self.total_loss_cp += mv.evaluation_delta.abs() * 100.0;
        self.evaluated += 1;
    }

    fn finish(mut self) -> SideSummary {
        if self.evaluated > 0 {
            self.summary.accuracy = Some(accuracy(self.total_loss_cp, self.evaluated));
        }
        self.summary
    }
}

/// Accuracy in percent from the average centipawn swing.
pub fn accuracy(total_loss_cp: f64, move_count: u32) -> f64 {
    if move_count == 0 {
        return 100.0;
    }
    let acpl = total_loss_cp / move_count as f64;
    let accuracy = 100.0 * (1.0 / (1.0 + acpl / 100.0)).sqrt();
    let rounded = (accuracy * 10.0).round() / 10.0;
    rounded.clamp(0.0, 100.0)
}
