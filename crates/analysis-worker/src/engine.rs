//! UCI engine session (async I/O)
//!
//! One session owns one engine process and correlates requests with the
//! engine's single output stream. The protocol carries no request ids, so a
//! session serves exactly one request at a time:
//!
//! `Idle -> AwaitingHandshake -> Ready -> AwaitingResponse -> Ready`, and any
//! state can move to `Stopped`.

use std::process::Stdio;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, Command};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::error::EngineError;

type LineReader = Lines<BufReader<Box<dyn AsyncRead + Send + Unpin>>>;
type LineWriter = Box<dyn AsyncWrite + Send + Unpin>;

#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Default deadline for a single request
    pub request_timeout: Duration,
    /// Deadline for the whole `uci`/`isready` handshake
    pub handshake_timeout: Duration,
    /// How long to wait for the engine to wind down after `stop`
    pub cancel_grace: Duration,
    pub threads: u32,
    pub hash_mb: u32,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            handshake_timeout: Duration::from_secs(10),
            cancel_grace: Duration::from_secs(2),
            threads: 1,
            hash_mb: 256,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    AwaitingHandshake,
    Ready,
    AwaitingResponse,
    Stopped,
}

/// Both ends of the engine's text stream plus the process, if we own one.
struct Channel {
    writer: LineWriter,
    lines: LineReader,
    process: Option<Child>,
}

impl Channel {
    async fn send(&mut self, cmd: &str) -> Result<(), EngineError> {
        debug!(cmd, "SF <");
        self.writer
            .write_all(format!("{cmd}\n").as_bytes())
            .await
            .map_err(|e| EngineError::Io(format!("Failed to write to engine: {e}")))?;
        self.writer
            .flush()
            .await
            .map_err(|e| EngineError::Io(format!("Failed to flush engine stdin: {e}")))?;
        Ok(())
    }

    /// Read until `matcher` accepts a line. Returns every non-empty line
    /// read, the matching one last.
    async fn collect_until<F>(&mut self, matcher: &F) -> Result<Vec<String>, EngineError>
    where
        F: Fn(&str) -> bool + Sync,
    {
        let mut collected = Vec::new();
        loop {
            let line = self
                .lines
                .next_line()
                .await
                .map_err(|e| EngineError::Io(format!("Failed to read from engine: {e}")))?
                .ok_or(EngineError::Closed)?;
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            debug!(line = trimmed, "SF >");
            let done = matcher(trimmed);
            collected.push(trimmed.to_string());
            if done {
                return Ok(collected);
            }
        }
    }

    /// Ask the engine to quit, then make sure the process is gone.
    async fn shutdown(&mut self) {
        let _ = self.send("quit").await;
        if let Some(mut process) = self.process.take() {
            if tokio::time::timeout(Duration::from_millis(500), process.wait())
                .await
                .is_err()
            {
                let _ = process.kill().await;
            }
        }
    }

    async fn kill(&mut self) {
        if let Some(mut process) = self.process.take() {
            let _ = process.kill().await;
        }
    }
}

/// A single UCI engine, started explicitly and stopped explicitly.
pub struct EngineSession {
    state: StdMutex<SessionState>,
    channel: Mutex<Channel>,
    shutdown: watch::Sender<bool>,
    options: EngineOptions,
}

impl EngineSession {
    /// Wrap an arbitrary byte stream pair speaking UCI.
    pub fn from_io<R, W>(reader: R, writer: W, options: EngineOptions) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(reader);
        let (shutdown, _) = watch::channel(false);
        Self {
            state: StdMutex::new(SessionState::Idle),
            channel: Mutex::new(Channel {
                writer: Box::new(writer),
                lines: BufReader::new(reader).lines(),
                process: None,
            }),
            shutdown,
            options,
        }
    }

    /// Spawn an engine process. The session is `Idle` until `start` succeeds.
    pub fn spawn(path: &str, options: EngineOptions) -> Result<Self, EngineError> {
        let mut process = Command::new(path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| EngineError::Startup(format!("Failed to spawn {path}: {e}")))?;

        let stdin = process
            .stdin
            .take()
            .ok_or_else(|| EngineError::Startup("Engine stdin unavailable".into()))?;
        let stdout = process
            .stdout
            .take()
            .ok_or_else(|| EngineError::Startup("Engine stdout unavailable".into()))?;

        let mut session = Self::from_io(stdout, stdin, options);
        session.channel.get_mut().process = Some(process);
        Ok(session)
    }

    /// Spawn and handshake in one step. On failure nothing is left running.
    pub async fn launch(path: &str, options: EngineOptions) -> Result<Self, EngineError> {
        let session = Self::spawn(path, options)?;
        session.start().await?;
        Ok(session)
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn state(&self) -> SessionState {
        *self.lock_state()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == SessionState::Ready
    }

    /// Run the `uci`/`isready` handshake. Any failure stops the session so a
    /// half-initialised engine is never handed out.
    pub async fn start(&self) -> Result<(), EngineError> {
        {
            let mut state = self.lock_state();
            match *state {
                SessionState::Idle => *state = SessionState::AwaitingHandshake,
                SessionState::Ready => return Ok(()),
                SessionState::AwaitingHandshake | SessionState::AwaitingResponse => {
                    return Err(EngineError::Busy)
                }
                SessionState::Stopped => {
                    return Err(EngineError::Startup("session already stopped".into()))
                }
            }
        }

        let mut channel = self.channel.lock().await;
        let deadline = self.options.handshake_timeout;
        let outcome = self
            .guarded(async {
                tokio::time::timeout(deadline, self.handshake(&mut channel))
                    .await
                    .unwrap_or(Err(EngineError::Timeout(deadline)))
            })
            .await;

        match outcome {
            Ok(()) => {
                let mut state = self.lock_state();
                if *state == SessionState::AwaitingHandshake {
                    *state = SessionState::Ready;
                }
                drop(state);
                info!("Engine ready");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Engine handshake failed");
                self.set_state(SessionState::Stopped);
                self.shutdown.send_replace(true);
                channel.kill().await;
                Err(match e {
                    EngineError::Startup(msg) => EngineError::Startup(msg),
                    other => EngineError::Startup(other.to_string()),
                })
            }
        }
    }

    async fn handshake(&self, channel: &mut Channel) -> Result<(), EngineError> {
        channel.send("uci").await?;
        channel.collect_until(&|line: &str| line == "uciok").await?;

        channel
            .send(&format!("setoption name Threads value {}", self.options.threads))
            .await?;
        channel
            .send(&format!("setoption name Hash value {}", self.options.hash_mb))
            .await?;
        channel.send("isready").await?;
        channel.collect_until(&|line: &str| line == "readyok").await?;
        Ok(())
    }

    /// Send `commands` and collect output until a line satisfies `matcher`.
    ///
    /// Fails with `Busy` while another request is in flight and with
    /// `NotReady` before the handshake or after `stop`. On timeout the search
    /// is cancelled with `stop` and its trailing output drained, so nothing
    /// leaks into the next request.
    pub async fn request<F>(
        &self,
        commands: &[&str],
        matcher: F,
        timeout: Duration,
    ) -> Result<Vec<String>, EngineError>
    where
        F: Fn(&str) -> bool + Sync,
    {
        let flight = self.begin_request()?;
        let mut channel = self.channel.lock().await;

        let outcome = self
            .guarded(async {
                for cmd in commands {
                    channel.send(cmd).await?;
                }
                tokio::time::timeout(timeout, channel.collect_until(&matcher))
                    .await
                    .unwrap_or(Err(EngineError::Timeout(timeout)))
            })
            .await;

        match &outcome {
            Err(EngineError::Timeout(_)) => {
                warn!(?timeout, "Engine request timed out, cancelling search");
                self.cancel(&mut channel, &matcher).await;
            }
            Err(EngineError::Io(_) | EngineError::Closed) => {
                warn!("Engine stream broken, stopping session");
                self.tear_down(&mut channel).await;
            }
            _ => {}
        }

        drop(channel);
        flight.settle();
        outcome
    }

    /// Stop the engine. Pending and future requests fail with `NotReady`.
    pub async fn stop(&self) {
        self.set_state(SessionState::Stopped);
        self.shutdown.send_replace(true);
        let mut channel = self.channel.lock().await;
        channel.shutdown().await;
        info!("Engine session stopped");
    }

    /// Resolve `fut` unless the session is stopped first.
    async fn guarded<T, Fut>(&self, fut: Fut) -> Result<T, EngineError>
    where
        Fut: std::future::Future<Output = Result<T, EngineError>>,
    {
        let mut stopped = self.shutdown.subscribe();
        tokio::select! {
            result = fut => result,
            _ = stopped.wait_for(|s| *s) => Err(EngineError::NotReady),
        }
    }

    async fn cancel<F>(&self, channel: &mut Channel, matcher: &F)
    where
        F: Fn(&str) -> bool + Sync,
    {
        if channel.send("stop").await.is_err() {
            self.tear_down(channel).await;
            return;
        }
        match tokio::time::timeout(self.options.cancel_grace, channel.collect_until(matcher)).await
        {
            Ok(Ok(discarded)) => debug!(lines = discarded.len(), "Drained cancelled search"),
            _ => {
                warn!("Engine ignored stop, tearing session down");
                self.tear_down(channel).await;
            }
        }
    }

    async fn tear_down(&self, channel: &mut Channel) {
        self.set_state(SessionState::Stopped);
        self.shutdown.send_replace(true);
        channel.kill().await;
    }

    fn begin_request(&self) -> Result<InFlight<'_>, EngineError> {
        let mut state = self.lock_state();
        match *state {
            SessionState::Ready => {
                *state = SessionState::AwaitingResponse;
                Ok(InFlight {
                    session: self,
                    settled: false,
                })
            }
            SessionState::AwaitingResponse => Err(EngineError::Busy),
            _ => Err(EngineError::NotReady),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, next: SessionState) {
        *self.lock_state() = next;
    }
}

impl Drop for EngineSession {
    fn drop(&mut self) {
        // Best-effort synchronous kill in drop
        if let Some(process) = self.channel.get_mut().process.as_mut() {
            let _ = process.start_kill();
        }
    }
}

/// Marks one request in flight. Dropping it unsettled (the caller abandoned
/// the request mid-exchange) leaves unread output in the stream, so the
/// session is stopped instead of returned to `Ready`.
struct InFlight<'a> {
    session: &'a EngineSession,
    settled: bool,
}

impl InFlight<'_> {
    fn settle(mut self) {
        self.settled = true;
        let mut state = self.session.lock_state();
        if *state == SessionState::AwaitingResponse {
            *state = SessionState::Ready;
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        self.session.set_state(SessionState::Stopped);
        self.session.shutdown.send_replace(true);
        if let Ok(mut channel) = self.session.channel.try_lock() {
            if let Some(process) = channel.process.as_mut() {
                let _ = process.start_kill();
            }
        }
    }
}

/// Fixed set of sessions, one per concurrency slot. A slot is locked for the
/// duration of one game so two games never share a session.
pub struct EnginePool {
    slots: Vec<Arc<Mutex<EngineSession>>>,
}

impl EnginePool {
    pub async fn launch(path: &str, options: &EngineOptions, size: usize) -> Result<Self, EngineError> {
        let mut slots = Vec::with_capacity(size);
        for slot in 0..size {
            match EngineSession::launch(path, options.clone()).await {
                Ok(session) => {
                    info!(slot, "Engine session ready");
                    slots.push(Arc::new(Mutex::new(session)));
                }
                Err(e) => {
                    let pool = Self { slots };
                    pool.shutdown().await;
                    return Err(e);
                }
            }
        }
        Ok(Self { slots })
    }

    /// Session for the `n`th job, round-robin over slots.
    pub fn slot(&self, n: usize) -> Arc<Mutex<EngineSession>> {
        self.slots[n % self.slots.len()].clone()
    }

    pub async fn shutdown(&self) {
        for slot in &self.slots {
            slot.lock().await.stop().await;
        }
    }
}
