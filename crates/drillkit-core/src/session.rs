//! The session state machine.
//!
//! [`Session`] is synchronous and owns everything one session mutates: the
//! items, the single live [`Clock`] countdown, the stopwatches, and the
//! [`ScoreState`]. Every transition takes the current instant explicitly,
//! which keeps it testable without a runtime. The async
//! [`engine`](crate::engine) wraps it in a task that feeds it commands,
//! deadlines, and fetched batches one at a time.

use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use uuid::Uuid;

use crate::clock::{Clock, ClockScope, ClockTicket, Stopwatch};
use crate::error::EngineError;
use crate::item::{Item, ItemId, ItemKind};
use crate::model::{
    Answer, AnswerEvent, AnswerRecord, EndReason, ItemBreakdown, ItemFlow, Phase, SessionConfig,
    SessionDescriptor, SessionResult, Variant,
};
use crate::scoring::{ScoreState, ScoringPolicy};
use crate::traits::BatchRequest;

/// What a transition did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// Nothing changed: stale ticket, duplicate answer, or a late call
    /// after completion.
    Ignored,
    /// The session is still active with an item open.
    Continue,
    /// The cursor ran past the fetched items; the next batch is needed.
    AwaitingBatch,
    /// The session just completed.
    Completed,
}

/// Outcome of one transition, with the answers it scored.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub status: StepStatus,
    pub records: Vec<AnswerRecord>,
}

impl Step {
    fn new(status: StepStatus, records: Vec<AnswerRecord>) -> Self {
        Self { status, records }
    }

    fn ignored() -> Self {
        Self::new(StepStatus::Ignored, Vec::new())
    }

    pub fn is_ignored(&self) -> bool {
        self.status == StepStatus::Ignored
    }
}

/// Per-item bookkeeping for the result breakdown.
#[derive(Debug, Clone, Default)]
struct Slot {
    attempts: u32,
    correct: bool,
    timed_out: bool,
    elapsed: Duration,
    solved: bool,
}

/// Read-only view of a session for front ends.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub variant: Variant,
    pub phase: Phase,
    /// Items that accept an answer right now: the current item of a
    /// sequential session, or every unsolved item of the open group.
    pub open_items: Vec<Item>,
    /// Time left on the live countdown when the snapshot was taken.
    pub remaining: Option<Duration>,
    /// When the live countdown fires; `None` while paused or untimed.
    pub deadline: Option<Instant>,
    pub clock_scope: Option<ClockScope>,
    pub score: ScoreState,
    /// Answers recorded so far, timeouts included.
    pub answered: usize,
    /// Items the session intends to present.
    pub planned: usize,
    pub paused: bool,
    pub awaiting_batch: bool,
    pub end_reason: Option<EndReason>,
}

impl SessionSnapshot {
    pub fn current_item(&self) -> Option<&Item> {
        self.open_items.first()
    }

    /// Remaining time as of `now`, for redrawing a countdown between updates.
    pub fn remaining_at(&self, now: Instant) -> Option<Duration> {
        match self.deadline {
            Some(at) => Some(at.saturating_duration_since(now)),
            None => self.remaining,
        }
    }
}

/// One assessment session.
#[derive(Debug)]
pub struct Session {
    id: Uuid,
    config: SessionConfig,
    policy: ScoringPolicy,
    phase: Phase,
    items: Vec<Item>,
    slots: Vec<Slot>,
    /// Sequential cursor into `items`.
    cursor: usize,
    /// Items presented so far (sequential).
    presented: usize,
    planned: usize,
    score: ScoreState,
    records: Vec<AnswerRecord>,
    clock: Clock,
    /// Time on the current item, or since the previous answer on a board.
    item_watch: Stopwatch,
    session_watch: Stopwatch,
    paused: bool,
    awaiting_batch: bool,
    batches: u32,
    started_at: Option<DateTime<Utc>>,
    result: Option<SessionResult>,
}

impl Session {
    pub fn new(id: Uuid, config: SessionConfig) -> Result<Self, EngineError> {
        config.validate().map_err(EngineError::InvalidConfig)?;
        let policy = config.scoring.clone().starting_at(config.start_level);
        Ok(Self {
            id,
            policy,
            phase: Phase::Idle,
            items: Vec::new(),
            slots: Vec::new(),
            cursor: 0,
            presented: 0,
            planned: 0,
            score: ScoreState::new(config.start_level),
            records: Vec::new(),
            clock: Clock::new(),
            item_watch: Stopwatch::new(),
            session_watch: Stopwatch::new(),
            paused: false,
            awaiting_batch: false,
            batches: 0,
            started_at: None,
            result: None,
            config,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn score(&self) -> &ScoreState {
        &self.score
    }

    pub fn records(&self) -> &[AnswerRecord] {
        &self.records
    }

    pub fn result(&self) -> Option<&SessionResult> {
        self.result.as_ref()
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn is_awaiting_batch(&self) -> bool {
        self.awaiting_batch
    }

    fn flow(&self) -> ItemFlow {
        self.config.variant.flow()
    }

    fn invalid(&self, operation: &'static str) -> EngineError {
        EngineError::InvalidTransition {
            operation,
            phase: self.phase,
        }
    }

    pub fn descriptor(&self) -> SessionDescriptor {
        SessionDescriptor {
            session_id: self.id,
            variant: self.config.variant,
            item_count: self.config.item_count,
            difficulty: self.config.difficulty,
            subject: self.config.subject.clone(),
            created_at: Utc::now(),
        }
    }

    /// The batch this session needs next: the first batch while idle, the
    /// following one while awaiting.
    pub fn batch_request(&self) -> BatchRequest {
        let count = match (self.phase, self.config.batch_size) {
            (Phase::Idle, Some(size)) => size.min(self.config.item_count),
            (Phase::Idle, None) => self.config.item_count,
            (_, Some(size)) => size.min(self.planned.saturating_sub(self.items.len())),
            (_, None) => 0,
        };
        BatchRequest {
            session_id: self.id,
            variant: self.config.variant,
            count,
            level: self.score.level,
            difficulty: self.config.difficulty,
            subject: self.config.subject.clone(),
            seed: self.config.seed,
            batch_index: self.batches,
        }
    }

    /// When the live countdown fires, if one is running.
    pub fn deadline(&self) -> Option<(Instant, ClockTicket)> {
        match self.phase {
            Phase::Active => self.clock.deadline(),
            _ => None,
        }
    }

    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        match self.phase {
            Phase::Active => self.clock.remaining(now),
            _ => None,
        }
    }

    fn open_group(&self) -> Option<u32> {
        self.items
            .iter()
            .zip(&self.slots)
            .filter(|(_, slot)| !slot.solved)
            .map(|(item, _)| item.group)
            .min()
    }

    /// Items that accept an answer right now.
    pub fn open_items(&self) -> Vec<&Item> {
        if self.phase != Phase::Active || self.awaiting_batch {
            return Vec::new();
        }
        match self.flow() {
            ItemFlow::Sequential => self.items.get(self.cursor).into_iter().collect(),
            ItemFlow::OpenBoard => match self.open_group() {
                Some(group) => self
                    .items
                    .iter()
                    .zip(&self.slots)
                    .filter(|(item, slot)| !slot.solved && item.group == group)
                    .map(|(item, _)| item)
                    .collect(),
                None => Vec::new(),
            },
        }
    }

    pub fn current_item(&self) -> Option<&Item> {
        self.open_items().into_iter().next()
    }

    pub fn snapshot(&self, now: Instant) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id,
            variant: self.config.variant,
            phase: self.phase,
            open_items: self.open_items().into_iter().cloned().collect(),
            remaining: self.remaining(now),
            deadline: self.deadline().map(|(at, _)| at),
            clock_scope: match self.phase {
                Phase::Active => self.clock.scope(),
                _ => None,
            },
            score: self.score.clone(),
            answered: self.records.len(),
            planned: self.planned,
            paused: self.paused,
            awaiting_batch: self.awaiting_batch,
            end_reason: self.result.as_ref().map(|r| r.end_reason),
        }
    }

    /// Take in the first batch and become active.
    ///
    /// Without batching a sequential session plans `min(item_count, items)`;
    /// with batching it plans `item_count` and fetches the rest as it goes.
    /// An open board plans every item it was given.
    pub fn start(&mut self, mut items: Vec<Item>, now: Instant) -> Result<Step, EngineError> {
        if self.phase != Phase::Idle {
            return Err(self.invalid("start"));
        }
        self.phase = Phase::Active;
        self.started_at = Some(Utc::now());
        self.session_watch.restart(now);
        self.batches = 1;

        self.planned = match (self.flow(), self.config.batch_size) {
            (ItemFlow::Sequential, Some(_)) => self.config.item_count,
            (ItemFlow::Sequential, None) => items.len().min(self.config.item_count),
            (ItemFlow::OpenBoard, _) => items.len(),
        };
        items.truncate(self.planned);
        self.intake(items);

        if let Some(budget) = self.config.per_session_budget {
            self.clock.arm(ClockScope::Session, budget, now);
        }
        tracing::info!(
            session = %self.id,
            variant = %self.config.variant,
            items = self.items.len(),
            planned = self.planned,
            "session started"
        );

        if self.items.is_empty() {
            self.finish(EndReason::ContentExhausted, now);
            return Ok(Step::new(StepStatus::Completed, Vec::new()));
        }
        let status = match self.flow() {
            ItemFlow::Sequential => self.advance(now),
            ItemFlow::OpenBoard => {
                self.item_watch.restart(now);
                StepStatus::Continue
            }
        };
        Ok(Step::new(status, Vec::new()))
    }

    /// Apply a user answer.
    pub fn submit(&mut self, answer: Answer, now: Instant) -> Result<Step, EngineError> {
        match self.phase {
            Phase::Idle => return Err(self.invalid("submit")),
            Phase::Complete => return Ok(Step::ignored()),
            Phase::Active => {}
        }
        if self.awaiting_batch {
            return Ok(Step::ignored());
        }
        Ok(match self.flow() {
            ItemFlow::Sequential => self.submit_sequential(answer, now),
            ItemFlow::OpenBoard => self.submit_open(answer, now),
        })
    }

    fn submit_sequential(&mut self, answer: Answer, now: Instant) -> Step {
        let index = self.cursor;
        let Some(item) = self.items.get(index) else {
            return Step::ignored();
        };
        if answer.item_id.is_some_and(|id| id != item.id) {
            tracing::debug!(session = %self.id, current = %item.id, "answer for a closed item ignored");
            return Step::ignored();
        }

        if self.clock.scope() == Some(ClockScope::Item) {
            self.clock.cancel();
        }
        let record = self.score_answer(index, answer.value, false, now);
        self.records.push(record.clone());
        self.cursor += 1;
        let status = self.advance(now);
        Step::new(status, vec![record])
    }

    fn submit_open(&mut self, answer: Answer, now: Instant) -> Step {
        let Some(group) = self.open_group() else {
            return Step::ignored();
        };
        let target = self
            .items
            .iter()
            .zip(&self.slots)
            .position(|(item, slot)| {
                !slot.solved
                    && item.group == group
                    && match answer.item_id {
                        Some(id) => id == item.id,
                        None => item.addresses(&answer.value),
                    }
            });
        let Some(index) = target else {
            tracing::debug!(session = %self.id, value = %answer.value, "answer addresses no open item");
            return Step::ignored();
        };

        let mut record = self.score_answer(index, answer.value, false, now);
        self.item_watch.restart(now);
        if self.paused {
            self.item_watch.pause(now);
        }

        if record.correct {
            self.slots[index].solved = true;
            self.fill_solved_cell(index);
            if self.open_group() != Some(group) {
                let (state, bonus) = self.policy.complete_group(&self.score);
                self.score = state;
                record.points_awarded += bonus;
                record.score_after = self.score.clone();
                tracing::info!(session = %self.id, group, bonus, "group completed");
            }
        }
        self.records.push(record.clone());

        let status = if self.open_group().is_none() {
            self.finish(EndReason::Finished, now);
            StepStatus::Completed
        } else {
            StepStatus::Continue
        };
        Step::new(status, vec![record])
    }

    /// Write a solved sudoku cell into the board every cell of its puzzle
    /// shows, so prompts reflect the current fill state.
    fn fill_solved_cell(&mut self, index: usize) {
        let item = &self.items[index];
        let ItemKind::GridCell {
            row, col, solution, ..
        } = item.kind
        else {
            return;
        };
        let group = item.group;
        for item in self.items.iter_mut().filter(|i| i.group == group) {
            if let ItemKind::GridCell { givens, .. } = &mut item.kind {
                givens[row][col] = solution;
            }
        }
    }

    /// Handle an expired countdown. Only the live ticket has any effect.
    ///
    /// An item expiry scores the open item as a timeout and moves on. A
    /// session expiry scores the item on screen (sequential only) the same
    /// way and then completes.
    pub fn timeout(&mut self, ticket: ClockTicket, now: Instant) -> Result<Step, EngineError> {
        match self.phase {
            Phase::Idle => return Err(self.invalid("timeout")),
            Phase::Complete => return Ok(Step::ignored()),
            Phase::Active => {}
        }
        if !self.clock.expire(ticket) {
            tracing::debug!(session = %self.id, "stale timeout ignored");
            return Ok(Step::ignored());
        }

        let item_open = self.flow() == ItemFlow::Sequential
            && !self.awaiting_batch
            && self.cursor < self.items.len();
        let mut records = Vec::new();
        if item_open {
            let record = self.score_answer(self.cursor, String::new(), true, now);
            self.records.push(record.clone());
            self.cursor += 1;
            records.push(record);
        }

        let status = match ticket.scope() {
            ClockScope::Item => self.advance(now),
            ClockScope::Session => {
                self.finish(EndReason::TimeExpired, now);
                StepStatus::Completed
            }
        };
        Ok(Step::new(status, records))
    }

    /// Leave early. The in-flight item is not scored.
    pub fn abandon(&mut self, now: Instant) -> Result<Step, EngineError> {
        match self.phase {
            Phase::Idle => Err(self.invalid("abandon")),
            Phase::Complete => Ok(Step::ignored()),
            Phase::Active => {
                self.finish(EndReason::Abandoned, now);
                Ok(Step::new(StepStatus::Completed, Vec::new()))
            }
        }
    }

    /// Freeze the live countdown and the stopwatches. Returns whether
    /// anything changed.
    pub fn pause(&mut self, now: Instant) -> Result<bool, EngineError> {
        match self.phase {
            Phase::Idle => Err(self.invalid("pause")),
            Phase::Complete => Ok(false),
            Phase::Active if self.paused => Ok(false),
            Phase::Active => {
                self.clock.pause(now);
                self.item_watch.pause(now);
                self.session_watch.pause(now);
                self.paused = true;
                tracing::debug!(session = %self.id, "paused");
                Ok(true)
            }
        }
    }

    pub fn resume(&mut self, now: Instant) -> Result<bool, EngineError> {
        match self.phase {
            Phase::Idle => Err(self.invalid("resume")),
            Phase::Complete => Ok(false),
            Phase::Active if !self.paused => Ok(false),
            Phase::Active => {
                self.clock.resume(now);
                self.item_watch.resume(now);
                self.session_watch.resume(now);
                self.paused = false;
                tracing::debug!(session = %self.id, "resumed");
                Ok(true)
            }
        }
    }

    /// Take in the batch the session was waiting for. An empty batch ends
    /// the session with [`EndReason::ContentExhausted`].
    pub fn extend(&mut self, mut items: Vec<Item>, now: Instant) -> Step {
        if self.phase != Phase::Active || !self.awaiting_batch {
            return Step::ignored();
        }
        self.awaiting_batch = false;
        self.batches += 1;
        if items.is_empty() {
            tracing::warn!(session = %self.id, "content source returned an empty batch");
            self.finish(EndReason::ContentExhausted, now);
            return Step::new(StepStatus::Completed, Vec::new());
        }
        items.truncate(self.planned.saturating_sub(self.items.len()));
        self.intake(items);
        let status = self.advance(now);
        Step::new(status, Vec::new())
    }

    /// The batch the session was waiting for could not be fetched.
    pub fn batch_failed(&mut self, now: Instant) -> Step {
        if self.phase != Phase::Active || !self.awaiting_batch {
            return Step::ignored();
        }
        self.finish(EndReason::ContentExhausted, now);
        Step::new(StepStatus::Completed, Vec::new())
    }

    fn intake(&mut self, items: Vec<Item>) {
        for mut item in items {
            item.id = ItemId(self.items.len() as u32 + 1);
            self.items.push(item);
            self.slots.push(Slot::default());
        }
    }

    /// Present the item under the cursor, ask for more, or finish.
    fn advance(&mut self, now: Instant) -> StepStatus {
        if self.clock.scope() == Some(ClockScope::Item) {
            self.clock.cancel();
        }

        if self.cursor < self.items.len() {
            self.presented = self.cursor + 1;
            self.item_watch.restart(now);
            if let Some(budget) = self.config.per_item_budget {
                self.clock.arm(ClockScope::Item, budget, now);
            }
            if self.paused {
                self.item_watch.pause(now);
                self.clock.pause(now);
            }
            StepStatus::Continue
        } else if self.cursor >= self.planned {
            self.finish(EndReason::Finished, now);
            StepStatus::Completed
        } else {
            self.awaiting_batch = true;
            tracing::debug!(session = %self.id, batch = self.batches, "awaiting next batch");
            StepStatus::AwaitingBatch
        }
    }

    fn score_answer(
        &mut self,
        index: usize,
        value: String,
        timed_out: bool,
        now: Instant,
    ) -> AnswerRecord {
        let elapsed = self.item_watch.elapsed(now);
        let event = AnswerEvent {
            item_id: self.items[index].id,
            value,
            timed_out,
            elapsed,
            timestamp: Utc::now(),
        };
        let scored = self.policy.apply(&self.score, &event, &self.items[index]);
        self.score = scored.state;

        let slot = &mut self.slots[index];
        slot.attempts += 1;
        slot.elapsed += elapsed;
        slot.timed_out = timed_out;
        slot.correct |= scored.correct;

        tracing::debug!(
            session = %self.id,
            item = %event.item_id,
            correct = scored.correct,
            timed_out,
            points = scored.awarded,
            "answer scored"
        );
        AnswerRecord {
            event,
            correct: scored.correct,
            points_awarded: scored.awarded,
            score_after: self.score.clone(),
        }
    }

    /// Cancel the clock, stop time, and build the result from the score
    /// already applied.
    fn finish(&mut self, reason: EndReason, now: Instant) {
        self.clock.cancel();
        self.item_watch.pause(now);
        self.session_watch.pause(now);
        self.awaiting_batch = false;
        self.phase = Phase::Complete;

        let shown = match self.flow() {
            ItemFlow::Sequential => self.presented.min(self.items.len()),
            ItemFlow::OpenBoard => self.items.len(),
        };
        let per_item_breakdown = self.items[..shown]
            .iter()
            .zip(&self.slots)
            .map(|(item, slot)| ItemBreakdown {
                item_id: item.id,
                group: item.group,
                prompt: item.prompt(),
                expected: item.expected(),
                attempts: slot.attempts,
                correct: slot.correct,
                timed_out: slot.timed_out,
                elapsed: slot.elapsed,
            })
            .collect();

        let finished_at = Utc::now();
        let result = SessionResult {
            session_id: self.id,
            variant: self.config.variant,
            end_reason: reason,
            final_score: self.score.points,
            level: self.score.level,
            correct_count: self.score.correct_count,
            total_count: self.score.total_count,
            best_streak: self.score.best_streak,
            accuracy: self.score.accuracy(),
            total_elapsed: self.session_watch.elapsed(now),
            per_item_breakdown,
            started_at: self.started_at.unwrap_or(finished_at),
            finished_at,
        };
        tracing::info!(
            session = %self.id,
            reason = %reason,
            score = result.final_score,
            accuracy = result.accuracy,
            "session complete"
        );
        self.result = Some(result);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{ItemKind, Operator};
    use crate::presets;

    const SECOND: Duration = Duration::from_secs(1);

    fn sum(lhs: i64, rhs: i64) -> Item {
        Item::new(ItemKind::Arithmetic {
            lhs,
            op: Operator::Add,
            rhs,
        })
    }

    /// `n` items; item `i` (1-based) has answer `2 * i`.
    fn sums(n: i64) -> Vec<Item> {
        (1..=n).map(|i| sum(i, i)).collect()
    }

    fn config(variant: Variant, items: usize) -> SessionConfig {
        let mut config = presets::config(variant);
        config.item_count = items;
        config.batch_size = None;
        config
    }

    fn session(config: SessionConfig) -> Session {
        Session::new(Uuid::new_v4(), config).unwrap()
    }

    fn cell(row: usize, col: usize, solution: u8, group: u32) -> Item {
        Item::new(ItemKind::GridCell {
            row,
            col,
            solution,
            givens: [[0; 4]; 4],
        })
        .with_group(group)
    }

    #[test]
    fn correct_arithmetic_answer_scores_base_plus_level_bonus() {
        let t0 = Instant::now();
        let mut s = session(config(Variant::Arithmetic, 3));
        s.start(vec![sum(7, 5), sum(1, 1), sum(2, 2)], t0).unwrap();

        let step = s.submit(Answer::new("12"), t0 + SECOND).unwrap();
        assert_eq!(step.status, StepStatus::Continue);
        let record = &step.records[0];
        assert!(record.correct);
        // base 10 + streak 0 * 1 + level 1 * 5
        assert_eq!(record.points_awarded, 15);
        assert_eq!(s.score().points, 15);
        assert_eq!(s.score().streak, 1);
        assert_eq!(record.event.elapsed, SECOND);
    }

    #[test]
    fn streak_counts_consecutive_corrects_and_resets() {
        let t0 = Instant::now();
        let mut s = session(config(Variant::Quiz, 5));
        s.start(sums(5), t0).unwrap();
        for i in 1..=3 {
            s.submit(Answer::new((2 * i).to_string()), t0).unwrap();
            assert_eq!(s.score().streak, i as u32);
        }
        s.submit(Answer::new("nope"), t0).unwrap();
        assert_eq!(s.score().streak, 0);
        assert_eq!(s.score().best_streak, 3);
        assert!(s.score().streak <= s.score().correct_count);
    }

    #[test]
    fn duplicate_submit_is_a_no_op() {
        let t0 = Instant::now();
        let mut s = session(config(Variant::Quiz, 3));
        s.start(sums(3), t0).unwrap();
        let first = s.current_item().unwrap().id;
        assert_eq!(first, ItemId(1));

        let step = s.submit(Answer::for_item(first, "2"), t0).unwrap();
        assert_eq!(step.status, StepStatus::Continue);
        let again = s.submit(Answer::for_item(first, "2"), t0).unwrap();
        assert!(again.is_ignored());
        assert_eq!(s.score().total_count, 1);
        assert_eq!(s.score().points, 10);
        assert_eq!(s.current_item().unwrap().id, ItemId(2));
    }

    #[test]
    fn item_timeout_scores_empty_answer_and_rearms() {
        let t0 = Instant::now();
        let mut s = session(config(Variant::Challenge, 3));
        s.start(sums(3), t0).unwrap();
        s.submit(Answer::new("2"), t0).unwrap();
        assert_eq!(s.score().streak, 1);

        let (deadline, ticket) = s.deadline().unwrap();
        assert_eq!(deadline, t0 + 30 * SECOND);
        let step = s.timeout(ticket, deadline).unwrap();
        assert_eq!(step.status, StepStatus::Continue);
        let record = &step.records[0];
        assert_eq!(record.event.value, "");
        assert!(record.event.timed_out);
        assert!(!record.correct);
        assert_eq!(s.score().streak, 0);
        assert_eq!(s.current_item().unwrap().id, ItemId(3));

        let (next_deadline, next_ticket) = s.deadline().unwrap();
        assert_ne!(next_ticket, ticket);
        assert_eq!(next_deadline, deadline + 30 * SECOND);
        assert!(s.timeout(ticket, next_deadline).unwrap().is_ignored());
    }

    #[test]
    fn answer_beats_timeout_in_the_same_tick() {
        let t0 = Instant::now();
        let mut s = session(config(Variant::Challenge, 2));
        s.start(sums(2), t0).unwrap();
        let (deadline, ticket) = s.deadline().unwrap();

        s.submit(Answer::new("2"), deadline).unwrap();
        assert!(s.timeout(ticket, deadline).unwrap().is_ignored());
        assert_eq!(s.records().len(), 1);
        assert!(s.records()[0].correct);
        assert!(!s.records()[0].event.timed_out);
    }

    #[test]
    fn session_expiry_completes_with_time_expired() {
        let t0 = Instant::now();
        let mut s = session(config(Variant::Arithmetic, 5));
        s.start(sums(5), t0).unwrap();
        s.submit(Answer::new("2"), t0 + 10 * SECOND).unwrap();

        let (deadline, ticket) = s.deadline().unwrap();
        assert_eq!(deadline, t0 + 60 * SECOND);
        let step = s.timeout(ticket, deadline).unwrap();
        assert_eq!(step.status, StepStatus::Completed);
        assert!(step.records[0].event.timed_out);

        let result = s.result().unwrap();
        assert_eq!(result.end_reason, EndReason::TimeExpired);
        assert_eq!(result.total_count, 2);
        assert_eq!(result.correct_count, 1);
        assert_eq!(result.total_elapsed, 60 * SECOND);
        assert_eq!(result.per_item_breakdown.len(), 2);
        assert!(s.deadline().is_none());
    }

    #[test]
    fn every_item_answered_finishes() {
        let t0 = Instant::now();
        let mut s = session(config(Variant::Quiz, 2));
        s.start(sums(5), t0).unwrap();
        s.submit(Answer::new("2"), t0).unwrap();
        let step = s.submit(Answer::new("5"), t0 + 3 * SECOND).unwrap();
        assert_eq!(step.status, StepStatus::Completed);

        let result = s.result().unwrap();
        assert_eq!(result.end_reason, EndReason::Finished);
        assert_eq!(result.final_score, s.score().points);
        assert_eq!(result.accuracy, 0.5);
        assert_eq!(result.per_item_breakdown[1].expected, "4");
        assert!(!result.per_item_breakdown[1].correct);
    }

    #[test]
    fn abandon_keeps_partial_score_and_closes() {
        let t0 = Instant::now();
        let mut s = session(config(Variant::Quiz, 3));
        assert!(matches!(
            s.submit(Answer::new("2"), t0),
            Err(EngineError::InvalidTransition {
                operation: "submit",
                phase: Phase::Idle
            })
        ));
        assert!(s.abandon(t0).is_err());

        s.start(sums(3), t0).unwrap();
        s.submit(Answer::new("2"), t0).unwrap();
        let step = s.abandon(t0 + SECOND).unwrap();
        assert_eq!(step.status, StepStatus::Completed);

        let result = s.result().unwrap().clone();
        assert_eq!(result.end_reason, EndReason::Abandoned);
        assert_eq!(result.total_count, 1);
        assert_eq!(result.final_score, 10);
        // The in-flight item is listed but was never scored.
        assert_eq!(result.per_item_breakdown[1].attempts, 0);

        assert!(s.submit(Answer::new("4"), t0).unwrap().is_ignored());
        assert!(s.abandon(t0).unwrap().is_ignored());
        assert!(s.start(sums(1), t0).is_err());
        assert_eq!(s.result().unwrap(), &result);
    }

    #[test]
    fn sudoku_board_completes_with_group_bonus() {
        let t0 = Instant::now();
        let mut s = session(presets::config(Variant::Sudoku));
        s.start(
            vec![cell(0, 1, 2, 0), cell(1, 0, 3, 0), cell(2, 2, 4, 1)],
            t0,
        )
        .unwrap();
        assert_eq!(s.open_items().len(), 2);

        let miss = s.submit(Answer::new("0,1,3"), t0).unwrap();
        assert!(!miss.records[0].correct);
        assert_eq!(s.score().group_mistakes, 1);
        assert_eq!(s.open_items().len(), 2);

        s.submit(Answer::new("0,1,2"), t0).unwrap();
        let closing = s.submit(Answer::new("1,0,3"), t0).unwrap();
        assert_eq!(closing.status, StepStatus::Continue);
        // max(100 - 1 * 10, 20) * level 1
        assert_eq!(closing.records[0].points_awarded, 90);
        assert_eq!(s.score().level, 2);
        assert_eq!(s.open_items().len(), 1);

        let last = s.submit(Answer::new("2,2,4"), t0 + 5 * SECOND).unwrap();
        assert_eq!(last.status, StepStatus::Completed);
        assert_eq!(last.records[0].points_awarded, 200);

        let result = s.result().unwrap();
        assert_eq!(result.end_reason, EndReason::Finished);
        assert_eq!(result.final_score, 290);
        assert_eq!(result.level, 3);
        assert_eq!(result.per_item_breakdown[0].attempts, 2);
    }

    #[test]
    fn solved_cells_show_on_the_open_board() {
        let t0 = Instant::now();
        let mut s = session(presets::config(Variant::Sudoku));
        s.start(
            vec![cell(0, 1, 2, 0), cell(1, 0, 3, 0), cell(2, 2, 4, 1)],
            t0,
        )
        .unwrap();

        s.submit(Answer::new("0,1,2"), t0).unwrap();
        let open = s.open_items();
        assert_eq!(open.len(), 1);
        let ItemKind::GridCell { givens, .. } = &open[0].kind else {
            panic!("expected a grid cell");
        };
        assert_eq!(givens[0][1], 2);
        assert_eq!(givens[1][0], 0);
        assert!(open[0].prompt().contains(". 2 . ."));

        // The next puzzle keeps its own board.
        let ItemKind::GridCell { givens, .. } = &s.items[2].kind else {
            panic!("expected a grid cell");
        };
        assert_eq!(givens[0][1], 0);
    }

    #[test]
    fn scramble_batches_are_requested_at_the_reached_level() {
        let t0 = Instant::now();
        let mut s = session(presets::config(Variant::Scramble));
        let first = s.batch_request();
        assert_eq!((first.count, first.level), (3, 1));

        s.start(sums(3), t0).unwrap();
        for i in 1..=3 {
            s.submit(Answer::new((2 * i).to_string()), t0).unwrap();
        }
        assert!(s.is_awaiting_batch());
        let next = s.batch_request();
        assert_eq!(next.level, 2);
        assert_eq!(next.count, 3);
        assert_eq!(next.batch_index, 1);
    }

    #[test]
    fn solved_cell_ignores_repeat_answers() {
        let t0 = Instant::now();
        let mut s = session(presets::config(Variant::Sudoku));
        s.start(vec![cell(0, 0, 1, 0), cell(0, 1, 2, 0)], t0).unwrap();
        s.submit(Answer::new("0,0,1"), t0).unwrap();
        assert!(s.submit(Answer::new("0,0,1"), t0).unwrap().is_ignored());
        assert!(s.submit(Answer::new("3,3,3"), t0).unwrap().is_ignored());
        assert_eq!(s.score().total_count, 1);
    }

    #[test]
    fn memory_miss_keeps_pair_open() {
        let t0 = Instant::now();
        let pair = |a: usize, b: usize| {
            Item::new(ItemKind::MatchPair {
                concept: format!("{a}{b}"),
                positions: (a, b),
                deck_size: 4,
            })
        };
        let mut s = session(presets::config(Variant::Memory));
        s.start(vec![pair(0, 2), pair(1, 3)], t0).unwrap();

        let miss = s.submit(Answer::new("0,1"), t0).unwrap();
        assert!(!miss.records[0].correct);
        assert_eq!(s.open_items().len(), 2);

        let hit = s.submit(Answer::new("2,0"), t0).unwrap();
        assert_eq!(hit.records[0].points_awarded, 20);
        let done = s.submit(Answer::new("1,3"), t0).unwrap();
        // base 20 + streak 1 * 5
        assert_eq!(done.records[0].points_awarded, 25);
        assert_eq!(done.status, StepStatus::Completed);

        let result = s.result().unwrap();
        assert_eq!(result.correct_count, 2);
        assert_eq!(result.total_count, 3);
    }

    #[test]
    fn batches_are_requested_as_the_cursor_runs_out() {
        let t0 = Instant::now();
        let mut cfg = presets::config(Variant::Arithmetic);
        cfg.item_count = 4;
        cfg.batch_size = Some(2);
        let mut s = session(cfg);

        let first = s.batch_request();
        assert_eq!((first.count, first.batch_index), (2, 0));
        s.start(sums(2), t0).unwrap();
        s.submit(Answer::new("2"), t0).unwrap();
        let step = s.submit(Answer::new("4"), t0).unwrap();
        assert_eq!(step.status, StepStatus::AwaitingBatch);
        assert!(s.is_awaiting_batch());
        assert!(s.current_item().is_none());
        assert!(s.submit(Answer::new("2"), t0).unwrap().is_ignored());
        // The session clock keeps running while a batch is fetched.
        assert!(s.deadline().is_some());

        let next = s.batch_request();
        assert_eq!((next.count, next.batch_index), (2, 1));
        let step = s.extend(sums(3), t0);
        assert_eq!(step.status, StepStatus::Continue);
        assert_eq!(s.current_item().unwrap().id, ItemId(3));

        s.submit(Answer::new("2"), t0).unwrap();
        let done = s.submit(Answer::new("4"), t0).unwrap();
        assert_eq!(done.status, StepStatus::Completed);
        assert_eq!(s.result().unwrap().total_count, 4);
    }

    #[test]
    fn empty_or_failed_batch_exhausts_content() {
        let t0 = Instant::now();
        let mut cfg = presets::config(Variant::Arithmetic);
        cfg.item_count = 4;
        cfg.batch_size = Some(2);

        let mut s = session(cfg.clone());
        s.start(sums(2), t0).unwrap();
        s.submit(Answer::new("2"), t0).unwrap();
        s.submit(Answer::new("4"), t0).unwrap();
        assert_eq!(s.extend(Vec::new(), t0).status, StepStatus::Completed);
        assert_eq!(
            s.result().unwrap().end_reason,
            EndReason::ContentExhausted
        );

        let mut s = session(cfg);
        s.start(sums(2), t0).unwrap();
        assert!(s.batch_failed(t0).is_ignored());
        s.submit(Answer::new("2"), t0).unwrap();
        s.submit(Answer::new("4"), t0).unwrap();
        assert_eq!(s.batch_failed(t0).status, StepStatus::Completed);
        assert_eq!(s.result().unwrap().total_count, 2);
    }

    #[test]
    fn pause_freezes_clock_and_elapsed_time() {
        let t0 = Instant::now();
        let mut s = session(config(Variant::Challenge, 3));
        s.start(sums(3), t0).unwrap();

        assert!(s.pause(t0 + 10 * SECOND).unwrap());
        assert!(!s.pause(t0 + 11 * SECOND).unwrap());
        assert!(s.deadline().is_none());
        assert_eq!(s.remaining(t0 + 100 * SECOND), Some(20 * SECOND));

        // Answers are accepted while paused; the next item starts frozen.
        let step = s.submit(Answer::new("2"), t0 + 50 * SECOND).unwrap();
        assert_eq!(step.records[0].event.elapsed, 10 * SECOND);
        assert!(s.deadline().is_none());
        assert_eq!(s.remaining(t0 + 55 * SECOND), Some(30 * SECOND));

        assert!(s.resume(t0 + 60 * SECOND).unwrap());
        let (deadline, _) = s.deadline().unwrap();
        assert_eq!(deadline, t0 + 90 * SECOND);

        s.abandon(t0 + 70 * SECOND).unwrap();
        assert_eq!(s.result().unwrap().total_elapsed, 20 * SECOND);
    }

    #[test]
    fn accuracy_stays_in_range_and_counts_timeouts() {
        let t0 = Instant::now();
        let mut s = session(config(Variant::Periodic, 4));
        s.start(sums(4), t0).unwrap();
        s.submit(Answer::new("2"), t0).unwrap();
        let (_, ticket) = s.deadline().unwrap();
        s.timeout(ticket, t0 + 15 * SECOND).unwrap();
        s.submit(Answer::new("0"), t0 + 16 * SECOND).unwrap();
        s.submit(Answer::new("8"), t0 + 17 * SECOND).unwrap();

        let result = s.result().unwrap();
        assert_eq!(result.total_count, 4);
        assert_eq!(result.correct_count, 2);
        assert!((0.0..=1.0).contains(&result.accuracy));
        assert!(result.per_item_breakdown[1].timed_out);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut cfg = presets::config(Variant::Challenge);
        cfg.per_session_budget = Some(SECOND);
        assert!(matches!(
            Session::new(Uuid::new_v4(), cfg),
            Err(EngineError::InvalidConfig(_))
        ));
    }

    #[test]
    fn empty_start_exhausts_content() {
        let t0 = Instant::now();
        let mut s = session(config(Variant::Quiz, 3));
        let step = s.start(Vec::new(), t0).unwrap();
        assert_eq!(step.status, StepStatus::Completed);
        assert_eq!(
            s.result().unwrap().end_reason,
            EndReason::ContentExhausted
        );
    }

    #[test]
    fn snapshot_reflects_progress() {
        let t0 = Instant::now();
        let mut s = session(config(Variant::Challenge, 2));
        let idle = s.snapshot(t0);
        assert_eq!(idle.phase, Phase::Idle);
        assert!(idle.current_item().is_none());

        s.start(sums(2), t0).unwrap();
        s.submit(Answer::new("2"), t0 + 5 * SECOND).unwrap();
        let snap = s.snapshot(t0 + 10 * SECOND);
        assert_eq!(snap.phase, Phase::Active);
        assert_eq!(snap.answered, 1);
        assert_eq!(snap.planned, 2);
        assert_eq!(snap.clock_scope, Some(ClockScope::Item));
        assert_eq!(snap.remaining, Some(25 * SECOND));
        assert_eq!(snap.current_item().unwrap().id, ItemId(2));
    }
}
