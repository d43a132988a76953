//! Result sinks and the background worker that feeds them.
//!
//! The engine never awaits persistence. Each session gets a
//! [`PersistenceQueue`]; a worker task drains it in order and logs failures.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::PersistenceError;
use crate::model::{AnswerRecord, SessionDescriptor, SessionResult};
use crate::traits::ResultSink;

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

#[derive(Debug)]
enum SinkCommand {
    Create(SessionDescriptor),
    Answer(Box<AnswerRecord>),
    Finalize(Box<SessionResult>),
}

/// Sending half of a session's persistence worker. Sends never block and
/// never fail the caller.
#[derive(Debug, Clone)]
pub struct PersistenceQueue {
    tx: mpsc::UnboundedSender<SinkCommand>,
}

impl PersistenceQueue {
    pub fn create(&self, session: SessionDescriptor) {
        self.send(SinkCommand::Create(session));
    }

    pub fn answer(&self, record: AnswerRecord) {
        self.send(SinkCommand::Answer(Box::new(record)));
    }

    pub fn finalize(&self, result: SessionResult) {
        self.send(SinkCommand::Finalize(Box::new(result)));
    }

    fn send(&self, command: SinkCommand) {
        if self.tx.send(command).is_err() {
            tracing::warn!("persistence worker is gone; dropping write");
        }
    }
}

/// Spawn a worker that applies queued writes to `sink` in order.
///
/// The worker exits once every [`PersistenceQueue`] clone is dropped and the
/// queue is drained. If creating the session fails, later writes for it are
/// skipped.
pub fn spawn_worker(sink: Arc<dyn ResultSink>) -> (PersistenceQueue, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(async move {
        let mut remote_id: Option<String> = None;
        while let Some(command) = rx.recv().await {
            match command {
                SinkCommand::Create(session) => match sink.create_session(&session).await {
                    Ok(id) => remote_id = Some(id),
                    Err(e) => {
                        tracing::warn!(session = %session.session_id, "failed to create session record: {e}");
                    }
                },
                SinkCommand::Answer(record) => {
                    let Some(id) = remote_id.as_deref() else {
                        tracing::debug!("no session record; skipping answer");
                        continue;
                    };
                    if let Err(e) = sink.record_answer(id, &record).await {
                        tracing::warn!(remote_id = id, "failed to record answer: {e}");
                    }
                }
                SinkCommand::Finalize(result) => {
                    let Some(id) = remote_id.as_deref() else {
                        tracing::debug!("no session record; skipping result");
                        continue;
                    };
                    if let Err(e) = sink.finalize(id, &result).await {
                        tracing::warn!(remote_id = id, "failed to finalize session: {e}");
                    }
                }
            }
        }
    });
    (PersistenceQueue { tx }, handle)
}

// ---------------------------------------------------------------------------
// In-memory sink
// ---------------------------------------------------------------------------

/// Everything a [`MemorySink`] has received.
#[derive(Debug, Clone, Default)]
pub struct MemoryContents {
    pub sessions: Vec<SessionDescriptor>,
    pub answers: Vec<(String, AnswerRecord)>,
    pub results: Vec<SessionResult>,
}

/// Keeps writes in memory. Used by tests and as the default sink.
#[derive(Debug, Default)]
pub struct MemorySink {
    contents: Mutex<MemoryContents>,
    reject: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that rejects every write.
    pub fn rejecting() -> Self {
        Self {
            contents: Mutex::default(),
            reject: true,
        }
    }

    pub fn contents(&self) -> MemoryContents {
        self.contents
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut MemoryContents) -> T) -> Result<T, PersistenceError> {
        if self.reject {
            return Err(PersistenceError::Rejected("memory sink is read-only".into()));
        }
        let mut contents = self
            .contents
            .lock()
            .map_err(|_| PersistenceError::Rejected("memory sink lock poisoned".into()))?;
        Ok(f(&mut contents))
    }
}

#[async_trait]
impl ResultSink for MemorySink {
    async fn create_session(
        &self,
        session: &SessionDescriptor,
    ) -> Result<String, PersistenceError> {
        self.with(|c| {
            c.sessions.push(session.clone());
            session.session_id.to_string()
        })
    }

    async fn record_answer(
        &self,
        remote_id: &str,
        answer: &AnswerRecord,
    ) -> Result<(), PersistenceError> {
        self.with(|c| c.answers.push((remote_id.to_string(), answer.clone())))
    }

    async fn finalize(
        &self,
        _remote_id: &str,
        result: &SessionResult,
    ) -> Result<(), PersistenceError> {
        self.with(|c| c.results.push(result.clone()))
    }
}

// ---------------------------------------------------------------------------
// JSON lines sink
// ---------------------------------------------------------------------------

/// One line of a results file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum JsonlRecord {
    SessionCreated {
        remote_id: String,
        session: SessionDescriptor,
    },
    Answer {
        remote_id: String,
        answer: AnswerRecord,
    },
    Finalized {
        remote_id: String,
        result: SessionResult,
    },
}

/// Appends every write as one JSON line.
#[derive(Debug)]
pub struct JsonlSink {
    path: PathBuf,
    lock: tokio::sync::Mutex<()>,
}

impl JsonlSink {
    pub const FILE_NAME: &'static str = "results.jsonl";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Sink writing `results.jsonl` inside `dir`.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(Self::FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn append(&self, record: &JsonlRecord) -> Result<(), PersistenceError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.lock.lock().await;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl ResultSink for JsonlSink {
    async fn create_session(
        &self,
        session: &SessionDescriptor,
    ) -> Result<String, PersistenceError> {
        let remote_id = session.session_id.to_string();
        self.append(&JsonlRecord::SessionCreated {
            remote_id: remote_id.clone(),
            session: session.clone(),
        })
        .await?;
        Ok(remote_id)
    }

    async fn record_answer(
        &self,
        remote_id: &str,
        answer: &AnswerRecord,
    ) -> Result<(), PersistenceError> {
        self.append(&JsonlRecord::Answer {
            remote_id: remote_id.to_string(),
            answer: answer.clone(),
        })
        .await
    }

    async fn finalize(&self, remote_id: &str, result: &SessionResult) -> Result<(), PersistenceError> {
        self.append(&JsonlRecord::Finalized {
            remote_id: remote_id.to_string(),
            result: result.clone(),
        })
        .await
    }
}

/// Read every finalized result from a results file. A missing file has no
/// results; malformed lines are skipped with a warning.
pub fn load_results(path: &Path) -> Result<Vec<SessionResult>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read results file: {}", path.display()))?;

    let mut results = Vec::new();
    for (n, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<JsonlRecord>(line) {
            Ok(JsonlRecord::Finalized { result, .. }) => results.push(result),
            Ok(_) => {}
            Err(e) => tracing::warn!("{}:{}: skipping malformed line: {}", path.display(), n + 1, e),
        }
    }
    Ok(results)
}

// ---------------------------------------------------------------------------
// Logging sink
// ---------------------------------------------------------------------------

/// Writes a summary of every event to the log.
#[derive(Debug, Default)]
pub struct LogSink;

#[async_trait]
impl ResultSink for LogSink {
    async fn create_session(
        &self,
        session: &SessionDescriptor,
    ) -> Result<String, PersistenceError> {
        tracing::info!(
            session = %session.session_id,
            variant = %session.variant,
            items = session.item_count,
            "session created"
        );
        Ok(session.session_id.to_string())
    }

    async fn record_answer(
        &self,
        remote_id: &str,
        answer: &AnswerRecord,
    ) -> Result<(), PersistenceError> {
        tracing::info!(
            session = remote_id,
            item = %answer.event.item_id,
            correct = answer.correct,
            points = answer.points_awarded,
            "answer recorded"
        );
        Ok(())
    }

    async fn finalize(&self, remote_id: &str, result: &SessionResult) -> Result<(), PersistenceError> {
        tracing::info!(
            session = remote_id,
            reason = %result.end_reason,
            score = result.final_score,
            level = result.level,
            "session finalized"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Fan-out sink
// ---------------------------------------------------------------------------

/// Delivers every write to several sinks concurrently.
///
/// Each inner sink keeps its own id for the session. A write succeeds if at
/// least one inner sink accepted it; individual failures are logged.
pub struct FanoutSink {
    sinks: Vec<Arc<dyn ResultSink>>,
    ids: Mutex<HashMap<String, Vec<Option<String>>>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn ResultSink>>) -> Self {
        Self {
            sinks,
            ids: Mutex::default(),
        }
    }

    fn inner_ids(&self, remote_id: &str) -> Result<Vec<Option<String>>, PersistenceError> {
        let ids = self
            .ids
            .lock()
            .map_err(|_| PersistenceError::Rejected("fanout lock poisoned".into()))?;
        ids.get(remote_id)
            .cloned()
            .ok_or_else(|| PersistenceError::Rejected(format!("unknown session {remote_id}")))
    }

    fn settle(outcomes: Vec<Result<(), PersistenceError>>) -> Result<(), PersistenceError> {
        let total = outcomes.len();
        let mut failures = 0;
        let mut last = None;
        for outcome in outcomes {
            if let Err(e) = outcome {
                tracing::warn!("sink write failed: {e}");
                failures += 1;
                last = Some(e);
            }
        }
        match last {
            Some(e) if failures == total => Err(e),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl ResultSink for FanoutSink {
    async fn create_session(
        &self,
        session: &SessionDescriptor,
    ) -> Result<String, PersistenceError> {
        let outcomes = join_all(self.sinks.iter().map(|s| s.create_session(session))).await;
        let mut inner = Vec::with_capacity(outcomes.len());
        let mut last_error = None;
        for outcome in outcomes {
            match outcome {
                Ok(id) => inner.push(Some(id)),
                Err(e) => {
                    tracing::warn!("sink failed to create session: {e}");
                    inner.push(None);
                    last_error = Some(e);
                }
            }
        }
        if inner.iter().all(Option::is_none) {
            return Err(last_error
                .unwrap_or_else(|| PersistenceError::Rejected("no sinks configured".into())));
        }

        let remote_id = session.session_id.to_string();
        self.ids
            .lock()
            .map_err(|_| PersistenceError::Rejected("fanout lock poisoned".into()))?
            .insert(remote_id.clone(), inner);
        Ok(remote_id)
    }

    async fn record_answer(
        &self,
        remote_id: &str,
        answer: &AnswerRecord,
    ) -> Result<(), PersistenceError> {
        let ids = self.inner_ids(remote_id)?;
        let writes = self
            .sinks
            .iter()
            .zip(&ids)
            .filter_map(|(sink, id)| id.as_deref().map(|id| sink.record_answer(id, answer)));
        Self::settle(join_all(writes).await)
    }

    async fn finalize(&self, remote_id: &str, result: &SessionResult) -> Result<(), PersistenceError> {
        let ids = self.inner_ids(remote_id)?;
        let writes = self
            .sinks
            .iter()
            .zip(&ids)
            .filter_map(|(sink, id)| id.as_deref().map(|id| sink.finalize(id, result)));
        let outcome = Self::settle(join_all(writes).await);
        if let Ok(mut map) = self.ids.lock() {
            map.remove(remote_id);
        }
        outcome
    }
}
