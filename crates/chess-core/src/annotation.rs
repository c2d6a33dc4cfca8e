//! Engine annotations: a read-only display overlay derived from an analysis.
//! Nothing here is persisted.

use serde::{Deserialize, Serialize};

use crate::game_data::{MoveAnalysis, Severity};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveSymbol {
    #[serde(rename = "!")]
    Good,
    #[serde(rename = "?")]
    Mistake,
    #[serde(rename = "??")]
    Blunder,
    #[serde(rename = "?!")]
    Dubious,
}

impl MoveSymbol {
    fn for_severity(severity: Severity) -> Option<Self> {
        match severity {
            Severity::Best => Some(MoveSymbol::Good),
            Severity::Inaccuracy => Some(MoveSymbol::Dubious),
            Severity::Mistake => Some(MoveSymbol::Mistake),
            Severity::Blunder => Some(MoveSymbol::Blunder),
            Severity::Good | Severity::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Annotation {
    pub move_index: usize,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub symbols: Vec<MoveSymbol>,
}

/// Build the engine overlay for an analysis. Plies without a verdict worth
/// showing (`good`, `unknown`) get no annotation.
pub fn engine_annotations(moves: &[MoveAnalysis]) -> Vec<Annotation> {
    moves
        .iter()
        .filter_map(|mv| {
            let symbol = MoveSymbol::for_severity(mv.severity)?;
            let comment = match (&mv.best_move_san, mv.severity) {
                (Some(best), Severity::Inaccuracy | Severity::Mistake | Severity::Blunder) => {
                    format!("{}. Best was {best}.", capitalize(mv.severity.as_str()))
                }
                _ => format!("{}.", capitalize(mv.severity.as_str())),
            };
            Some(Annotation {
                move_index: mv.move_index,
                comment,
                symbols: vec![symbol],
            })
        })
        .collect()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
