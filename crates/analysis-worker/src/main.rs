//! Game analysis worker
//!
//! `--moves "e4 e5 Nf3"` analyses a move list and prints the result as JSON.
//! `--game-ids 1,2,3` analyses stored games through an engine pool and saves
//! each analysis on behalf of the game's owner.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use analysis_worker::config::WorkerConfig;
use analysis_worker::db::PgAnalysisStore;
use analysis_worker::{
    analyze_and_save, analyze_game, AnalysisOptions, EnginePool, EngineSession, GateError,
    WorkerError,
};
use chess_core::summary::AnalysisSummary;

enum Mode {
    Moves(Vec<String>),
    GameIds(Vec<i64>),
}

/// Parse `--moves` / `--game-ids` from CLI args
fn parse_mode() -> Option<Mode> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        let Some(value) = args.get(i + 1) else {
            continue;
        };
        match args[i].as_str() {
            "--moves" => {
                let moves: Vec<String> = value.split_whitespace().map(String::from).collect();
                return Some(Mode::Moves(moves));
            }
            "--game-ids" => {
                let ids: Vec<i64> = value
                    .split(',')
                    .filter_map(|s| s.trim().parse().ok())
                    .collect();
                if !ids.is_empty() {
                    return Some(Mode::GameIds(ids));
                }
            }
            _ => {}
        }
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Load .env file for local dev
    let _ = dotenvy::dotenv();

    let config = WorkerConfig::from_env()?;
    info!(
        stockfish_path = %config.stockfish_path,
        depth = config.depth,
        timeout_ms = config.engine_timeout.as_millis() as u64,
        "Worker config loaded"
    );

    match parse_mode() {
        Some(Mode::Moves(moves)) => analyze_moves(&config, moves).await,
        Some(Mode::GameIds(ids)) => analyze_stored(&config, ids).await,
        None => anyhow::bail!("usage: analysis-worker --moves \"e4 e5 ...\" | --game-ids 1,2,3"),
    }
}

async fn analyze_moves(config: &WorkerConfig, moves: Vec<String>) -> anyhow::Result<()> {
    chess_core::rules::validate_san_line(&moves).context("Move list is not a legal game")?;

    let session = EngineSession::launch(&config.stockfish_path, config.engine_options()).await?;
    let options = AnalysisOptions {
        depth: config.depth,
    };
    let result = analyze_game(&session, &moves, &options).await;
    session.stop().await;

    let analyses = result?;
    let summary = AnalysisSummary::from_moves(&analyses);
    let output = serde_json::json!({ "moves": analyses, "summary": summary });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

async fn analyze_stored(config: &WorkerConfig, game_ids: Vec<i64>) -> anyhow::Result<()> {
    let database_url = config
        .database_url
        .as_deref()
        .ok_or_else(|| WorkerError::Config("DATABASE_URL is required for --game-ids".into()))?;

    let workers = config.sessions.min(game_ids.len()).max(1);
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(workers as u32 + 2) // headroom for overlapping saves
        .acquire_timeout(std::time::Duration::from_secs(10))
        .connect(database_url)
        .await?;
    let store = PgAnalysisStore::new(pool);
    info!(workers, "Database connection pool established");

    // One session per concurrent game; a session never serves two games at once
    let engines = Arc::new(
        EnginePool::launch(&config.stockfish_path, &config.engine_options(), workers).await?,
    );
    let semaphore = Arc::new(Semaphore::new(workers));
    let options = AnalysisOptions {
        depth: config.depth,
    };

    let mut handles = Vec::with_capacity(game_ids.len());
    for (i, game_id) in game_ids.iter().copied().enumerate() {
        let permit = semaphore.clone().acquire_owned().await?;
        let engine = engines.slot(i);
        let store = store.clone();
        let options = options.clone();
        let stockfish_path = config.stockfish_path.clone();
        let engine_options = config.engine_options();

        handles.push(tokio::spawn(async move {
            let _permit = permit; // Hold until done
            let mut session = engine.lock().await;
            if !session.is_ready() {
                // An earlier game lost this slot's engine
                warn!(game_id, "Engine session down, relaunching");
                *session = EngineSession::launch(&stockfish_path, engine_options).await?;
            }

            let game = match store.find_game(game_id).await {
                Ok(Some(game)) => game,
                Ok(None) => return Err(WorkerError::GameNotFound(game_id)),
                Err(e) => return Err(e.into()),
            };
            analyze_and_save(&*session, &store, &game, &options).await
        }));
    }

    let mut saved = 0u32;
    let mut failed = 0u32;
    for (game_id, handle) in game_ids.iter().zip(handles) {
        match handle.await {
            Ok(Ok(artifact)) => {
                info!(game_id, artifact_id = artifact.id, "Analysis complete");
                saved += 1;
            }
            Ok(Err(WorkerError::Gate(GateError::Conflict))) => {
                warn!(game_id, "Game already analysed, skipping");
            }
            Ok(Err(e)) => {
                error!(game_id, error = %e, "Analysis failed");
                failed += 1;
            }
            Err(e) => {
                error!(game_id, error = %e, "Analysis task panicked");
                failed += 1;
            }
        }
    }

    info!("Shutting down engine sessions");
    engines.shutdown().await;
    info!(saved, failed, total = game_ids.len(), "Batch finished");

    if failed > 0 {
        anyhow::bail!("{failed} of {} games failed", game_ids.len());
    }
    Ok(())
}
