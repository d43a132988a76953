//! Async engine: one actor task per session.
//!
//! The actor owns the [`Session`] and is the only thing that mutates it.
//! Answers, pause/resume and abandon arrive over a command channel; clock
//! expiries come from a `sleep_until` on the session's live deadline; item
//! batches come from a fetch future polled alongside both. Every wake-up is
//! applied to the session one at a time, so an answer and a timeout racing
//! for the same item can only ever score once.
//!
//! Front ends observe the session through a `watch` channel of
//! [`SessionSnapshot`]s and collect the [`SessionResult`] with
//! [`SessionHandle::wait`]. Dropping the handle abandons the session.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use uuid::Uuid;

use crate::clock::ClockTicket;
use crate::content::procedural_sources;
use crate::error::{EngineError, GenerationError};
use crate::item::Item;
use crate::model::{Answer, Phase, SessionConfig, SessionResult};
use crate::session::{Session, SessionSnapshot, Step, StepStatus};
use crate::sink::{spawn_worker, PersistenceQueue};
use crate::traits::{ContentSource, ResultSink};

const COMMAND_BUFFER: usize = 32;

type Reply<T> = oneshot::Sender<Result<T, EngineError>>;

enum Command {
    Submit(Answer, Reply<Step>),
    Abandon(Reply<Step>),
    Pause(Reply<bool>),
    Resume(Reply<bool>),
}

/// Starts sessions against a set of registered content sources.
pub struct AssessmentEngine {
    sources: HashMap<String, Arc<dyn ContentSource>>,
    sink: Arc<dyn ResultSink>,
}

impl AssessmentEngine {
    /// An engine with every procedural source registered.
    pub fn new(sink: Arc<dyn ResultSink>) -> Self {
        let mut engine = Self {
            sources: HashMap::new(),
            sink,
        };
        for source in procedural_sources() {
            engine.register(source);
        }
        engine
    }

    /// Register a source under its own name, replacing any previous one.
    pub fn register(&mut self, source: Arc<dyn ContentSource>) {
        self.sources.insert(source.name().to_string(), source);
    }

    pub fn with_source(mut self, source: Arc<dyn ContentSource>) -> Self {
        self.register(source);
        self
    }

    pub fn source_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Fetch the first batch and start a session.
    ///
    /// Fails without creating anything if the source is unknown, the config
    /// is invalid, or the first batch cannot be produced.
    pub async fn start(&self, config: SessionConfig) -> Result<SessionHandle, EngineError> {
        let source = self
            .sources
            .get(&config.content_source)
            .cloned()
            .ok_or_else(|| EngineError::UnknownContentSource(config.content_source.clone()))?;

        let mut session = Session::new(Uuid::new_v4(), config)?;
        let request = session.batch_request();
        let items = source.next(&request).await?;
        if items.is_empty() {
            return Err(GenerationError::MalformedOutput(format!(
                "content source '{}' returned no items",
                source.name()
            ))
            .into());
        }

        let (persistence, worker) = spawn_worker(Arc::clone(&self.sink));
        persistence.create(session.descriptor());

        let now = Instant::now();
        let step = session.start(items, now)?;
        tracing::debug!(session = %session.id(), source = source.name(), "actor starting");

        let id = session.id();
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (snapshot_tx, snapshot_rx) = watch::channel(session.snapshot(now));
        let (result_tx, result_rx) = oneshot::channel();

        let mut actor = Actor {
            session,
            source,
            commands: command_rx,
            snapshots: snapshot_tx,
            persistence: Some(persistence),
            result: Some(result_tx),
        };
        actor.apply(step);
        tokio::spawn(actor.run());

        Ok(SessionHandle {
            id,
            commands: command_tx,
            snapshots: snapshot_rx,
            result: result_rx,
            worker,
        })
    }
}

/// Front-end side of a running session.
pub struct SessionHandle {
    id: Uuid,
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<SessionSnapshot>,
    result: oneshot::Receiver<SessionResult>,
    worker: JoinHandle<()>,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Latest published snapshot.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// A receiver that wakes on every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    pub async fn submit(&self, answer: Answer) -> Result<Step, EngineError> {
        self.request(|reply| Command::Submit(answer, reply)).await
    }

    pub async fn abandon(&self) -> Result<Step, EngineError> {
        self.request(Command::Abandon).await
    }

    /// Returns `false` if the session was already paused.
    pub async fn pause(&self) -> Result<bool, EngineError> {
        self.request(Command::Pause).await
    }

    /// Returns `false` if the session was not paused.
    pub async fn resume(&self) -> Result<bool, EngineError> {
        self.request(Command::Resume).await
    }

    /// Wait for the session to complete, then for its writes to land.
    pub async fn wait(self) -> Result<SessionResult, EngineError> {
        let SessionHandle {
            commands,
            result,
            worker,
            ..
        } = self;
        let result = result.await.map_err(|_| EngineError::SessionClosed)?;
        drop(commands);
        if let Err(e) = worker.await {
            tracing::warn!("persistence worker failed: {e}");
        }
        Ok(result)
    }

    async fn request<T>(
        &self,
        command: impl FnOnce(Reply<T>) -> Command,
    ) -> Result<T, EngineError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(command(tx))
            .await
            .map_err(|_| EngineError::SessionClosed)?;
        rx.await.map_err(|_| EngineError::SessionClosed)?
    }
}

enum Wake {
    Command(Option<Command>),
    Batch(Result<Vec<Item>, GenerationError>),
    Deadline(ClockTicket),
}

struct Actor {
    session: Session,
    source: Arc<dyn ContentSource>,
    commands: mpsc::Receiver<Command>,
    snapshots: watch::Sender<SessionSnapshot>,
    persistence: Option<PersistenceQueue>,
    result: Option<oneshot::Sender<SessionResult>>,
}

impl Actor {
    async fn run(mut self) {
        let mut fetch: Option<BoxFuture<'static, Result<Vec<Item>, GenerationError>>> = None;

        loop {
            let wake = if self.session.phase() == Phase::Complete {
                // Late calls still get an answer until the handle goes away.
                Wake::Command(self.commands.recv().await)
            } else {
                if self.session.is_awaiting_batch() && fetch.is_none() {
                    let source = Arc::clone(&self.source);
                    let request = self.session.batch_request();
                    tracing::debug!(batch = request.batch_index, count = request.count, "fetching batch");
                    fetch = Some(async move { source.next(&request).await }.boxed());
                }
                let deadline = self.session.deadline();

                tokio::select! {
                    biased;
                    command = self.commands.recv() => Wake::Command(command),
                    items = async {
                        match fetch.as_mut() {
                            Some(pending) => pending.await,
                            None => std::future::pending().await,
                        }
                    } => Wake::Batch(items),
                    ticket = async {
                        match deadline {
                            Some((at, ticket)) => {
                                sleep_until(at).await;
                                ticket
                            }
                            None => std::future::pending().await,
                        }
                    } => Wake::Deadline(ticket),
                }
            };

            let now = Instant::now();
            match wake {
                Wake::Command(Some(command)) => self.handle(command, now),
                Wake::Command(None) => {
                    if self.session.phase() == Phase::Active {
                        tracing::info!(session = %self.session.id(), "handle dropped; abandoning session");
                        if let Ok(step) = self.session.abandon(now) {
                            self.apply(step);
                        }
                    }
                    break;
                }
                Wake::Batch(Ok(items)) => {
                    fetch = None;
                    let step = self.session.extend(items, now);
                    self.apply(step);
                    self.publish(now);
                }
                Wake::Batch(Err(e)) => {
                    fetch = None;
                    tracing::warn!(session = %self.session.id(), "batch fetch failed: {e}");
                    let step = self.session.batch_failed(now);
                    self.apply(step);
                    self.publish(now);
                }
                Wake::Deadline(ticket) => {
                    match self.session.timeout(ticket, now) {
                        Ok(step) => self.apply(step),
                        Err(e) => tracing::warn!("timeout rejected: {e}"),
                    }
                    self.publish(now);
                }
            }
        }
    }

    fn handle(&mut self, command: Command, now: Instant) {
        match command {
            Command::Submit(answer, reply) => {
                let outcome = self.session.submit(answer, now);
                if let Ok(step) = &outcome {
                    self.apply(step.clone());
                }
                self.publish(now);
                let _ = reply.send(outcome);
            }
            Command::Abandon(reply) => {
                let outcome = self.session.abandon(now);
                if let Ok(step) = &outcome {
                    if step.status == StepStatus::Completed {
                        tracing::info!(session = %self.session.id(), "session abandoned");
                    }
                    self.apply(step.clone());
                }
                self.publish(now);
                let _ = reply.send(outcome);
            }
            Command::Pause(reply) => {
                let outcome = self.session.pause(now);
                self.publish(now);
                let _ = reply.send(outcome);
            }
            Command::Resume(reply) => {
                let outcome = self.session.resume(now);
                self.publish(now);
                let _ = reply.send(outcome);
            }
        }
    }

    /// Queue a step's writes and deliver the result once the session ends.
    fn apply(&mut self, step: Step) {
        if let Some(queue) = &self.persistence {
            for record in step.records {
                queue.answer(record);
            }
        }
        if step.status != StepStatus::Completed {
            return;
        }
        let Some(result) = self.session.result().cloned() else {
            return;
        };
        tracing::debug!(session = %result.session_id, "finalizing");
        // Finalize is the last write; dropping the queue lets the worker exit.
        if let Some(queue) = self.persistence.take() {
            queue.finalize(result.clone());
        }
        if let Some(tx) = self.result.take() {
            let _ = tx.send(result);
        }
    }

    fn publish(&self, now: Instant) {
        self.snapshots.send_replace(self.session.snapshot(now));
    }
}
