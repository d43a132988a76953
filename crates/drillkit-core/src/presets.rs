//! Built-in session configurations per variant, and the overrides a config
//! file may apply on top of them.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::{Difficulty, SessionConfig, Variant};
use crate::scoring::{GroupBonus, LevelBasis, LevelRule, ScoringPolicy};

fn secs(n: u64) -> Option<Duration> {
    Some(Duration::from_secs(n))
}

/// The default configuration for `variant`.
pub fn config(variant: Variant) -> SessionConfig {
    let base = SessionConfig {
        variant,
        content_source: default_source(variant).to_string(),
        item_count: 10,
        per_item_budget: None,
        per_session_budget: None,
        start_level: 1,
        difficulty: Difficulty::Medium,
        subject: None,
        seed: None,
        batch_size: None,
        scoring: ScoringPolicy::new(10, 0, 0, LevelRule::flat()),
    };

    match variant {
        Variant::Quiz => base,
        Variant::Challenge => SessionConfig {
            per_item_budget: secs(30),
            scoring: ScoringPolicy::new(10, 2, 0, LevelRule::every(3, 5, LevelBasis::CorrectAnswers)),
            ..base
        },
        Variant::Arithmetic => SessionConfig {
            item_count: 50,
            per_session_budget: secs(60),
            batch_size: Some(5),
            scoring: ScoringPolicy::new(10, 1, 5, LevelRule::every(5, 10, LevelBasis::CorrectAnswers)),
            ..base
        },
        Variant::Memory => SessionConfig {
            item_count: 8,
            per_session_budget: secs(120),
            scoring: ScoringPolicy::new(20, 5, 0, LevelRule::every(4, 3, LevelBasis::CorrectAnswers)),
            ..base
        },
        Variant::Sudoku => SessionConfig {
            item_count: 1,
            per_session_budget: secs(300),
            scoring: ScoringPolicy::new(0, 0, 0, LevelRule::every(1, 10, LevelBasis::CompletedGroups))
                .with_group_bonus(GroupBonus {
                    base: 100,
                    mistake_penalty: 10,
                    floor: 20,
                }),
            ..base
        },
        Variant::Typing => SessionConfig {
            item_count: 40,
            per_session_budget: secs(60),
            scoring: ScoringPolicy::new(1, 0, 0, LevelRule::every(10, 5, LevelBasis::CorrectAnswers)),
            ..base
        },
        Variant::Scramble => SessionConfig {
            per_item_budget: secs(30),
            batch_size: Some(3),
            scoring: ScoringPolicy::new(10, 2, 0, LevelRule::every(3, 5, LevelBasis::CorrectAnswers)),
            ..base
        },
        Variant::Periodic => SessionConfig {
            per_item_budget: secs(15),
            scoring: ScoringPolicy::new(10, 1, 0, LevelRule::every(5, 3, LevelBasis::CorrectAnswers)),
            ..base
        },
    }
}

/// Registered content source a variant draws from by default.
pub fn default_source(variant: Variant) -> &'static str {
    match variant {
        Variant::Quiz | Variant::Challenge => "remote",
        Variant::Arithmetic => "arithmetic",
        Variant::Memory => "memory",
        Variant::Sudoku => "sudoku",
        Variant::Typing => "typing",
        Variant::Scramble => "scramble",
        Variant::Periodic => "periodic",
    }
}

/// Per-variant settings from a `[variants.<name>]` table.
///
/// Setting one clock clears the other; `0` turns the clock off.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VariantOverrides {
    #[serde(default)]
    pub item_count: Option<usize>,
    #[serde(default)]
    pub per_item_secs: Option<u64>,
    #[serde(default)]
    pub per_session_secs: Option<u64>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub start_level: Option<u32>,
    #[serde(default)]
    pub content_source: Option<String>,
    #[serde(default)]
    pub batch_size: Option<usize>,
    #[serde(default)]
    pub base_points: Option<u64>,
    #[serde(default)]
    pub streak_bonus: Option<u64>,
    #[serde(default)]
    pub level_bonus: Option<u64>,
    #[serde(default)]
    pub level: Option<LevelRule>,
}

impl VariantOverrides {
    pub fn apply(&self, config: &mut SessionConfig) {
        if let Some(n) = self.item_count {
            config.item_count = n;
        }
        if let Some(n) = self.per_item_secs {
            config.per_item_budget = (n > 0).then(|| Duration::from_secs(n));
            config.per_session_budget = None;
        }
        if let Some(n) = self.per_session_secs {
            config.per_session_budget = (n > 0).then(|| Duration::from_secs(n));
            config.per_item_budget = None;
        }
        if let Some(d) = self.difficulty {
            config.difficulty = d;
        }
        if let Some(level) = self.start_level {
            config.start_level = level;
        }
        if let Some(source) = &self.content_source {
            config.content_source = source.clone();
        }
        if let Some(size) = self.batch_size {
            config.batch_size = Some(size);
        }
        if let Some(points) = self.base_points {
            config.scoring.base = points;
        }
        if let Some(points) = self.streak_bonus {
            config.scoring.streak_bonus = points;
        }
        if let Some(points) = self.level_bonus {
            config.scoring.level_bonus = points;
        }
        if let Some(rule) = &self.level {
            config.scoring.level = rule.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ItemFlow;

    #[test]
    fn preset_clocks() {
        assert_eq!(config(Variant::Challenge).per_item_budget, secs(30));
        assert_eq!(config(Variant::Arithmetic).per_session_budget, secs(60));
        assert_eq!(config(Variant::Periodic).per_item_budget, secs(15));
        assert!(config(Variant::Quiz).per_item_budget.is_none());
        assert!(config(Variant::Quiz).per_session_budget.is_none());
    }

    #[test]
    fn open_board_presets_have_no_item_clock_or_batches() {
        for variant in Variant::ALL {
            let preset = config(variant);
            if variant.flow() == ItemFlow::OpenBoard {
                assert!(preset.per_item_budget.is_none());
                assert!(preset.batch_size.is_none());
            }
        }
    }

    #[test]
    fn sudoku_pays_group_bonus() {
        let preset = config(Variant::Sudoku);
        let bonus = preset.scoring.group_bonus.unwrap();
        assert_eq!(bonus.points(0, 1), 100);
        assert_eq!(bonus.points(12, 2), 40);
    }

    #[test]
    fn overrides_switch_clock_kind() {
        let mut preset = config(Variant::Challenge);
        let overrides: VariantOverrides = toml::from_str(
            r#"
item_count = 5
per_session_secs = 90
streak_bonus = 4
"#,
        )
        .unwrap();
        overrides.apply(&mut preset);
        assert_eq!(preset.item_count, 5);
        assert_eq!(preset.per_session_budget, secs(90));
        assert!(preset.per_item_budget.is_none());
        assert_eq!(preset.scoring.streak_bonus, 4);
        preset.validate().unwrap();
    }

    #[test]
    fn zero_seconds_turns_the_clock_off() {
        let mut preset = config(Variant::Scramble);
        VariantOverrides {
            per_item_secs: Some(0),
            ..Default::default()
        }
        .apply(&mut preset);
        assert!(preset.per_item_budget.is_none());
        assert!(preset.per_session_budget.is_none());
    }

    #[test]
    fn unknown_override_key_is_rejected() {
        let parsed: Result<VariantOverrides, _> = toml::from_str("itemcount = 3");
        assert!(parsed.is_err());
    }
}
