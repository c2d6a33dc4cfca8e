//! Test doubles: a scripted UCI engine over an in-memory pipe and a scripted evaluator.

use std::sync::Mutex;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

use crate::engine::{EngineOptions, EngineSession};
use crate::error::EvaluationError;
use crate::evaluator::{PositionEvaluation, PositionEvaluator};

/// Reply marker that makes the fake engine hang up its output stream.
pub const CLOSE: &str = "__close__";

/// Replies a well-behaved engine gives to handshake commands.
pub fn standard_reply(cmd: &str) -> Vec<String> {
    match cmd {
        "uci" => vec![
            "id name FakeFish".into(),
            "option name Threads type spin default 1 min 1 max 512".into(),
            "uciok".into(),
        ],
        "isready" => vec!["readyok".into()],
        _ => Vec::new(),
    }
}

/// A session whose engine is a task answering each command line with
/// `respond(cmd)`. Returning [`CLOSE`] closes the engine's output.
pub fn fake_session<F>(mut respond: F, options: EngineOptions) -> EngineSession
where
    F: FnMut(&str) -> Vec<String> + Send + 'static,
{
    let (ours, theirs) = tokio::io::duplex(64 * 1024);
    let (our_read, our_write) = tokio::io::split(ours);
    let (their_read, mut their_write) = tokio::io::split(theirs);

    tokio::spawn(async move {
        let mut commands = BufReader::new(their_read).lines();
        while let Ok(Some(cmd)) = commands.next_line().await {
            let cmd = cmd.trim().to_string();
            if cmd == "quit" {
                break;
            }
            for reply in respond(&cmd) {
                if reply == CLOSE {
                    let _ = their_write.shutdown().await;
                    return;
                }
                if their_write
                    .write_all(format!("{reply}\n").as_bytes())
                    .await
                    .is_err()
                {
                    return;
                }
            }
        }
    });

    EngineSession::from_io(our_read, our_write, options)
}

/// Reply function for an engine that evaluates every position the same way.
pub fn fixed_search(info: &'static str, bestmove: &'static str) -> impl FnMut(&str) -> Vec<String> + Send + 'static {
    move |cmd: &str| {
        if cmd.starts_with("go") {
            vec![info.to_string(), format!("bestmove {bestmove}")]
        } else {
            standard_reply(cmd)
        }
    }
}

type Script = Box<dyn Fn(usize) -> Result<PositionEvaluation, EvaluationError> + Send + Sync>;

/// Evaluator answering the `n`th call (0-based) with `script(n)`, recording
/// every FEN and depth it was asked for.
pub struct ScriptedEvaluator {
    script: Script,
    log: Mutex<Vec<(String, u32)>>,
}

impl ScriptedEvaluator {
    pub fn new<F>(script: F) -> Self
    where
        F: Fn(usize) -> Result<PositionEvaluation, EvaluationError> + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn constant(evaluation_cp: i32, best_move_uci: Option<&'static str>) -> Self {
        Self::new(move |_| Ok(Self::eval(evaluation_cp, best_move_uci)))
    }

    pub fn eval(evaluation_cp: i32, best_move_uci: Option<&str>) -> PositionEvaluation {
        PositionEvaluation {
            evaluation_cp,
            best_move_uci: best_move_uci.map(String::from),
            pv: best_move_uci.map(|m| vec![m.to_string()]).unwrap_or_default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.log.lock().unwrap().len()
    }

    pub fn fens(&self) -> Vec<String> {
        self.log.lock().unwrap().iter().map(|(fen, _)| fen.clone()).collect()
    }

    pub fn depths(&self) -> Vec<u32> {
        self.log.lock().unwrap().iter().map(|(_, depth)| *depth).collect()
    }
}

impl PositionEvaluator for ScriptedEvaluator {
    async fn evaluate(&self, fen: &str, depth: u32) -> Result<PositionEvaluation, EvaluationError> {
        let call = {
            let mut log = self.log.lock().unwrap();
            log.push((fen.to_string(), depth));
            log.len() - 1
        };
        (self.script)(call)
    }
}
