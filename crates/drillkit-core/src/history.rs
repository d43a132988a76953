//! Aggregate statistics over finalized session results.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::model::{EndReason, SessionResult, Variant};

/// Totals for one variant across every recorded session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantSummary {
    pub variant: Variant,
    pub sessions: usize,
    /// Sessions that ran to their natural end (not abandoned).
    pub completed: usize,
    pub best_score: u64,
    pub mean_accuracy: f64,
    pub highest_level: u32,
    pub best_streak: u32,
    pub total_time: Duration,
}

/// Summaries per variant, in [`Variant::ALL`] order. Variants with no
/// sessions are left out.
pub fn summarize(results: &[SessionResult]) -> Vec<VariantSummary> {
    let mut grouped: BTreeMap<Variant, Vec<&SessionResult>> = BTreeMap::new();
    for result in results {
        grouped.entry(result.variant).or_default().push(result);
    }

    grouped
        .into_iter()
        .map(|(variant, group)| {
            let sessions = group.len();
            let accuracy_sum: f64 = group.iter().map(|r| r.accuracy).sum();
            VariantSummary {
                variant,
                sessions,
                completed: group
                    .iter()
                    .filter(|r| r.end_reason != EndReason::Abandoned)
                    .count(),
                best_score: group.iter().map(|r| r.final_score).max().unwrap_or(0),
                mean_accuracy: accuracy_sum / sessions as f64,
                highest_level: group.iter().map(|r| r.level).max().unwrap_or(0),
                best_streak: group.iter().map(|r| r.best_streak).max().unwrap_or(0),
                total_time: group.iter().map(|r| r.total_elapsed).sum(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn result(variant: Variant, score: u64, accuracy: f64, level: u32, reason: EndReason) -> SessionResult {
        SessionResult {
            session_id: Uuid::new_v4(),
            variant,
            end_reason: reason,
            final_score: score,
            level,
            correct_count: 0,
            total_count: 0,
            best_streak: level,
            accuracy,
            total_elapsed: Duration::from_secs(30),
            per_item_breakdown: vec![],
            started_at: Utc::now(),
            finished_at: Utc::now(),
        }
    }

    #[test]
    fn empty_history() {
        assert!(summarize(&[]).is_empty());
    }

    #[test]
    fn groups_by_variant_in_catalogue_order() {
        let results = vec![
            result(Variant::Typing, 40, 0.9, 2, EndReason::TimeExpired),
            result(Variant::Quiz, 70, 0.7, 1, EndReason::Finished),
            result(Variant::Quiz, 90, 0.9, 1, EndReason::Abandoned),
        ];
        let summary = summarize(&results);
        assert_eq!(summary.len(), 2);

        let quiz = &summary[0];
        assert_eq!(quiz.variant, Variant::Quiz);
        assert_eq!(quiz.sessions, 2);
        assert_eq!(quiz.completed, 1);
        assert_eq!(quiz.best_score, 90);
        assert!((quiz.mean_accuracy - 0.8).abs() < 1e-9);
        assert_eq!(quiz.total_time, Duration::from_secs(60));

        let typing = &summary[1];
        assert_eq!(typing.variant, Variant::Typing);
        assert_eq!(typing.highest_level, 2);
    }
}
