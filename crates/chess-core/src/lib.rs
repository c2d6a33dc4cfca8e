pub mod annotation;
pub mod game_data;
pub mod rules;
pub mod summary;

pub use game_data::{GameMetadata, GameStatus, MoveAnalysis, Severity};
