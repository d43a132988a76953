//! Points, streaks, and level progression.
//!
//! Everything here is a pure function of the previous [`ScoreState`]. The
//! session assigns the returned state only after the whole update has been
//! computed, so a score is never half-applied.

use serde::{Deserialize, Serialize};

use crate::item::Item;
use crate::model::AnswerEvent;

/// Running score of one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreState {
    pub points: u64,
    /// Consecutive correct answers since the last miss.
    pub streak: u32,
    pub best_streak: u32,
    /// Never decreases within a session.
    pub level: u32,
    pub correct_count: u32,
    pub total_count: u32,
    pub groups_completed: u32,
    /// Misses inside the group currently open.
    pub group_mistakes: u32,
}

impl ScoreState {
    pub fn new(start_level: u32) -> Self {
        Self {
            points: 0,
            streak: 0,
            best_streak: 0,
            level: start_level.max(1),
            correct_count: 0,
            total_count: 0,
            groups_completed: 0,
            group_mistakes: 0,
        }
    }

    /// `correct_count / total_count`, or 0 before the first answer.
    pub fn accuracy(&self) -> f64 {
        if self.total_count == 0 {
            0.0
        } else {
            self.correct_count as f64 / self.total_count as f64
        }
    }
}

/// What a level threshold counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LevelBasis {
    #[default]
    CorrectAnswers,
    CompletedGroups,
}

/// Fixed thresholds that step the level up.
///
/// `thresholds[i]` is the count at which the `(i + 1)`-th level-up happens,
/// relative to the session's start level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelRule {
    #[serde(default)]
    pub thresholds: Vec<u32>,
    #[serde(default = "default_max_level")]
    pub max_level: u32,
    #[serde(default)]
    pub basis: LevelBasis,
}

fn default_max_level() -> u32 {
    1
}

impl LevelRule {
    /// A level-up every `step` counts, up to `max_level`.
    pub fn every(step: u32, max_level: u32, basis: LevelBasis) -> Self {
        let step = step.max(1);
        Self {
            thresholds: (1..max_level.max(1)).map(|n| n * step).collect(),
            max_level: max_level.max(1),
            basis,
        }
    }

    /// A single level for the whole session.
    pub fn flat() -> Self {
        Self {
            thresholds: Vec::new(),
            max_level: 1,
            basis: LevelBasis::CorrectAnswers,
        }
    }

    /// Level reached from `start_level` after `count` units of progress.
    pub fn level_for(&self, start_level: u32, count: u32) -> u32 {
        let crossed = self.thresholds.iter().filter(|&&t| count >= t).count() as u32;
        start_level.saturating_add(crossed).min(self.max_level)
    }

    fn progress(&self, state: &ScoreState) -> u32 {
        match self.basis {
            LevelBasis::CorrectAnswers => state.correct_count,
            LevelBasis::CompletedGroups => state.groups_completed,
        }
    }
}

/// Bonus paid when every item of a group (e.g. a sudoku board) is solved:
/// `max(base - mistakes * mistake_penalty, floor) * level`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBonus {
    pub base: u64,
    pub mistake_penalty: u64,
    pub floor: u64,
}

impl GroupBonus {
    pub fn points(&self, mistakes: u32, level: u32) -> u64 {
        let raw = self
            .base
            .saturating_sub(self.mistake_penalty.saturating_mul(mistakes as u64));
        raw.max(self.floor).saturating_mul(level as u64)
    }
}

/// Per-variant scoring weights and pacing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoringPolicy {
    /// Points for any correct answer.
    #[serde(default)]
    pub base: u64,
    /// Extra points per answer already in the streak.
    #[serde(default)]
    pub streak_bonus: u64,
    /// Extra points per current level.
    #[serde(default)]
    pub level_bonus: u64,
    pub level: LevelRule,
    #[serde(default)]
    pub group_bonus: Option<GroupBonus>,
    /// Level the session started at; thresholds count from here.
    #[serde(skip)]
    start_level: u32,
}

/// Outcome of scoring one answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scored {
    pub state: ScoreState,
    pub correct: bool,
    pub awarded: u64,
}

impl ScoringPolicy {
    pub fn new(base: u64, streak_bonus: u64, level_bonus: u64, level: LevelRule) -> Self {
        Self {
            base,
            streak_bonus,
            level_bonus,
            level,
            group_bonus: None,
            start_level: 1,
        }
    }

    pub fn with_group_bonus(mut self, bonus: GroupBonus) -> Self {
        self.group_bonus = Some(bonus);
        self
    }

    /// Pin the level thresholds to the session's start level.
    pub fn starting_at(mut self, start_level: u32) -> Self {
        self.start_level = start_level.max(1);
        self
    }

    /// Score one answer event against its item.
    ///
    /// A timed-out event is incorrect regardless of its value.
    pub fn apply(&self, state: &ScoreState, event: &AnswerEvent, item: &Item) -> Scored {
        let correct = !event.timed_out && item.is_correct(&event.value);
        self.apply_outcome(state, correct)
    }

    /// Score a known outcome. Points use the streak and level from before
    /// this answer.
    pub fn apply_outcome(&self, state: &ScoreState, correct: bool) -> Scored {
        let mut next = state.clone();
        next.total_count = next.total_count.saturating_add(1);

        let awarded = if correct {
            let awarded = self
                .base
                .saturating_add(self.streak_bonus.saturating_mul(state.streak as u64))
                .saturating_add(self.level_bonus.saturating_mul(state.level as u64));
            next.points = next.points.saturating_add(awarded);
            next.streak = next.streak.saturating_add(1);
            next.best_streak = next.best_streak.max(next.streak);
            next.correct_count = next.correct_count.saturating_add(1);
            if self.level.basis == LevelBasis::CorrectAnswers {
                next.level = self.next_level(&next);
            }
            awarded
        } else {
            next.streak = 0;
            next.group_mistakes = next.group_mistakes.saturating_add(1);
            0
        };

        Scored {
            state: next,
            correct,
            awarded,
        }
    }

    /// Close the open group: pay the group bonus at the current level and
    /// reset the group's mistake count.
    pub fn complete_group(&self, state: &ScoreState) -> (ScoreState, u64) {
        let mut next = state.clone();
        let awarded = self
            .group_bonus
            .as_ref()
            .map(|bonus| bonus.points(state.group_mistakes, state.level))
            .unwrap_or(0);
        next.points = next.points.saturating_add(awarded);
        next.groups_completed = next.groups_completed.saturating_add(1);
        next.group_mistakes = 0;
        if self.level.basis == LevelBasis::CompletedGroups {
            next.level = self.next_level(&next);
        }
        (next, awarded)
    }

    fn next_level(&self, state: &ScoreState) -> u32 {
        let computed = self
            .level
            .level_for(self.start_level.max(1), self.level.progress(state));
        computed.max(state.level)
    }
}
