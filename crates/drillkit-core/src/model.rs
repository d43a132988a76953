//! Core data model types for drillkit.
//!
//! Session configuration, answers, and the immutable result a finished
//! session hands to its result sink.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::item::ItemId;
use crate::scoring::{ScoreState, ScoringPolicy};

/// The assessment modes the engine serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Quiz,
    Challenge,
    Arithmetic,
    Memory,
    Sudoku,
    Typing,
    Scramble,
    Periodic,
}

impl Variant {
    pub const ALL: [Variant; 8] = [
        Variant::Quiz,
        Variant::Challenge,
        Variant::Arithmetic,
        Variant::Memory,
        Variant::Sudoku,
        Variant::Typing,
        Variant::Scramble,
        Variant::Periodic,
    ];

    /// How answers map onto items for this variant.
    pub fn flow(self) -> ItemFlow {
        match self {
            Variant::Memory | Variant::Sudoku => ItemFlow::OpenBoard,
            _ => ItemFlow::Sequential,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Variant::Quiz => "quiz",
            Variant::Challenge => "challenge",
            Variant::Arithmetic => "arithmetic",
            Variant::Memory => "memory",
            Variant::Sudoku => "sudoku",
            Variant::Typing => "typing",
            Variant::Scramble => "scramble",
            Variant::Periodic => "periodic",
        };
        f.write_str(name)
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "quiz" => Ok(Variant::Quiz),
            "challenge" => Ok(Variant::Challenge),
            "arithmetic" | "math" => Ok(Variant::Arithmetic),
            "memory" | "memory-match" => Ok(Variant::Memory),
            "sudoku" => Ok(Variant::Sudoku),
            "typing" => Ok(Variant::Typing),
            "scramble" | "word-scramble" => Ok(Variant::Scramble),
            "periodic" | "periodic-table" => Ok(Variant::Periodic),
            other => Err(format!("unknown variant: {other}")),
        }
    }
}

/// How a session walks its items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemFlow {
    /// One item at a time; every answer or timeout advances the cursor.
    Sequential,
    /// Every unsolved item of the current group is open at once; answers are
    /// routed to the item they address and only correct answers solve it.
    OpenBoard,
}

/// Requested difficulty for generated content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl FromStr for Difficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(format!("unknown difficulty: {other}")),
        }
    }
}

/// Session lifecycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Active,
    Complete,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Active => write!(f, "active"),
            Phase::Complete => write!(f, "complete"),
        }
    }
}

/// Everything a session needs to run. Immutable once the session starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub variant: Variant,
    /// Name of the registered content source to draw items from.
    pub content_source: String,
    /// Items to present (sequential) or rounds to request (open board).
    pub item_count: usize,
    #[serde(default)]
    pub per_item_budget: Option<Duration>,
    #[serde(default)]
    pub per_session_budget: Option<Duration>,
    /// Level the session starts at.
    #[serde(default = "default_level")]
    pub start_level: u32,
    #[serde(default)]
    pub difficulty: Difficulty,
    /// Topic for generated questions.
    #[serde(default)]
    pub subject: Option<String>,
    /// Fixed seed for reproducible content. `None` draws from entropy.
    #[serde(default)]
    pub seed: Option<u64>,
    /// Fetch items in batches of this size. `None` fetches everything up front.
    #[serde(default)]
    pub batch_size: Option<usize>,
    pub scoring: ScoringPolicy,
}

fn default_level() -> u32 {
    1
}

impl SessionConfig {
    /// Check the config for combinations the engine cannot run.
    pub fn validate(&self) -> Result<(), String> {
        if self.item_count == 0 {
            return Err("item_count must be at least 1".into());
        }
        if self.per_item_budget.is_some() && self.per_session_budget.is_some() {
            return Err("set either a per-item or a per-session budget, not both".into());
        }
        if self.per_item_budget.is_some_and(|d| d.is_zero())
            || self.per_session_budget.is_some_and(|d| d.is_zero())
        {
            return Err("time budgets must be non-zero".into());
        }
        if self.variant.flow() == ItemFlow::OpenBoard {
            if self.per_item_budget.is_some() {
                return Err(format!("{} has no per-item clock", self.variant));
            }
            if self.batch_size.is_some() {
                return Err(format!("{} boards are fetched whole", self.variant));
            }
        }
        if self.batch_size == Some(0) {
            return Err("batch_size must be at least 1".into());
        }
        if self.start_level == 0 || self.start_level > self.scoring.level.max_level {
            return Err(format!(
                "start_level must be between 1 and {}",
                self.scoring.level.max_level
            ));
        }
        Ok(())
    }
}

/// A user's answer to the open item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// The item this answer is meant for. When set and not currently open,
    /// the answer is ignored, which makes a repeated submit harmless.
    #[serde(default)]
    pub item_id: Option<ItemId>,
    pub value: String,
}

impl Answer {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            item_id: None,
            value: value.into(),
        }
    }

    pub fn for_item(item_id: ItemId, value: impl Into<String>) -> Self {
        Self {
            item_id: Some(item_id),
            value: value.into(),
        }
    }
}

/// One recorded answer. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerEvent {
    pub item_id: ItemId,
    /// Submitted value; empty on timeout.
    pub value: String,
    /// Set when the clock, not the user, produced this event.
    pub timed_out: bool,
    /// Active time since the item was presented (or since the previous
    /// answer on an open board).
    pub elapsed: Duration,
    pub timestamp: DateTime<Utc>,
}

/// An answer after scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerRecord {
    pub event: AnswerEvent,
    pub correct: bool,
    pub points_awarded: u64,
    /// Score right after this answer was applied.
    pub score_after: ScoreState,
}

/// Why a session reached `Complete`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Every item was answered or solved.
    Finished,
    /// The per-session clock ran out.
    TimeExpired,
    /// The user left early.
    Abandoned,
    /// The content source could not supply the next batch.
    ContentExhausted,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndReason::Finished => write!(f, "finished"),
            EndReason::TimeExpired => write!(f, "time expired"),
            EndReason::Abandoned => write!(f, "abandoned"),
            EndReason::ContentExhausted => write!(f, "content exhausted"),
        }
    }
}

/// Per-item line of a session result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemBreakdown {
    pub item_id: ItemId,
    pub group: u32,
    pub prompt: String,
    pub expected: String,
    pub attempts: u32,
    pub correct: bool,
    pub timed_out: bool,
    pub elapsed: Duration,
}

/// The write-once summary of a finished session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub session_id: Uuid,
    pub variant: Variant,
    pub end_reason: EndReason,
    pub final_score: u64,
    pub level: u32,
    pub correct_count: u32,
    pub total_count: u32,
    pub best_streak: u32,
    pub accuracy: f64,
    pub total_elapsed: Duration,
    pub per_item_breakdown: Vec<ItemBreakdown>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// What a result sink learns when a session is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDescriptor {
    pub session_id: Uuid,
    pub variant: Variant,
    pub item_count: usize,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub subject: Option<String>,
    pub created_at: DateTime<Utc>,
}
