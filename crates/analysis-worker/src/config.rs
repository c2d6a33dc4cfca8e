//! Worker configuration from environment variables

use std::env;
use std::time::Duration;

use crate::engine::EngineOptions;
use crate::error::WorkerError;

pub const DEFAULT_DEPTH: u32 = 14;
pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Clone, Debug)]
pub struct WorkerConfig {
    /// Database connection URL, only needed when analysing stored games
    pub database_url: Option<String>,

    /// Path to Stockfish binary
    pub stockfish_path: String,

    /// Fixed search depth per position
    pub depth: u32,

    /// Per-request engine timeout
    pub engine_timeout: Duration,

    /// Stockfish `Threads` option
    pub engine_threads: u32,

    /// Stockfish `Hash` option in MB
    pub engine_hash_mb: u32,

    /// Number of engine sessions for batch runs (one game per session)
    pub sessions: usize,
}

impl WorkerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, WorkerError> {
        let stockfish_path = env::var("STOCKFISH_PATH")
            .unwrap_or_else(|_| "/usr/local/bin/stockfish".to_string());

        let depth = parse_var("ANALYSIS_DEPTH", DEFAULT_DEPTH)?;
        if depth == 0 {
            return Err(WorkerError::Config("ANALYSIS_DEPTH must be at least 1".into()));
        }

        let timeout_ms = parse_var("ENGINE_TIMEOUT_MS", DEFAULT_TIMEOUT_MS)?;
        let engine_threads = parse_var("ENGINE_THREADS", 1)?;
        let engine_hash_mb = parse_var("ENGINE_HASH_MB", 256)?;
        let sessions = parse_var("WORKER_SESSIONS", num_cpus::get())?.max(1);

        Ok(Self {
            database_url: env::var("DATABASE_URL").ok(),
            stockfish_path,
            depth,
            engine_timeout: Duration::from_millis(timeout_ms),
            engine_threads,
            engine_hash_mb,
            sessions,
        })
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            request_timeout: self.engine_timeout,
            threads: self.engine_threads,
            hash_mb: self.engine_hash_mb,
            ..EngineOptions::default()
        }
    }
}

/// Read an optional numeric variable. Unset means default; garbage is an error.
fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, WorkerError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| WorkerError::Config(format!("{name} must be a number, got '{raw}'"))),
        Err(_) => Ok(default),
    }
}
