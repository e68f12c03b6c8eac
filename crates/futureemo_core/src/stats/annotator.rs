//! Per-annotator quality figures.
//!
//! # Invariants
//! - Agreement is only measured against items whose current consensus is
//!   `Resolved`.
//! - Gaps longer than the session threshold are work breaks and are dropped
//!   before averaging.
//! - Output is sorted by `total_labels` descending, then by name.

use crate::model::category::Category;
use crate::model::item::Consensus;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Gaps above this many seconds are treated as session breaks.
pub const DEFAULT_SESSION_GAP_SECONDS: u64 = 3600;

/// Minimum surviving gaps needed to report an average.
const MIN_GAPS_FOR_AVERAGE: usize = 2;

/// One non-abstain label joined with its item's consensus at query time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatorLabel {
    pub annotator_name: String,
    pub value: Category,
    pub item_consensus: Consensus,
    /// Unix epoch milliseconds.
    pub submitted_at: i64,
}

/// Quality figures for one annotator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotatorStats {
    pub annotator_name: String,
    pub total_labels: u32,
    pub agreement_count: u32,
    pub disagreement_count: u32,
    /// `disagreement / (agreement + disagreement)`.
    pub disagreement_rate: Option<f64>,
    /// Mean gap between successive submissions after dropping breaks.
    pub avg_gap_seconds: Option<f64>,
}

/// Computes per-annotator quality figures.
pub fn annotator_stats(labels: &[AnnotatorLabel], session_gap_seconds: u64) -> Vec<AnnotatorStats> {
    let mut by_annotator: BTreeMap<&str, Vec<&AnnotatorLabel>> = BTreeMap::new();
    for label in labels {
        by_annotator
            .entry(label.annotator_name.as_str())
            .or_default()
            .push(label);
    }

    let mut stats: Vec<AnnotatorStats> = by_annotator
        .into_iter()
        .map(|(name, mut history)| {
            history.sort_by_key(|label| label.submitted_at);
            summarize(name, &history, session_gap_seconds)
        })
        .collect();

    stats.sort_by(|left, right| right.total_labels.cmp(&left.total_labels));
    stats
}

fn summarize(name: &str, history: &[&AnnotatorLabel], session_gap_seconds: u64) -> AnnotatorStats {
    let mut agreement_count = 0_u32;
    let mut disagreement_count = 0_u32;
    for label in history {
        if let Consensus::Resolved(resolved) = label.item_consensus {
            if label.value == resolved {
                agreement_count += 1;
            } else {
                disagreement_count += 1;
            }
        }
    }

    let judged = agreement_count + disagreement_count;
    let disagreement_rate = if judged > 0 {
        Some(f64::from(disagreement_count) / f64::from(judged))
    } else {
        None
    };

    let timestamps: Vec<i64> = history.iter().map(|label| label.submitted_at).collect();

    AnnotatorStats {
        annotator_name: name.to_string(),
        total_labels: history.len() as u32,
        agreement_count,
        disagreement_count,
        disagreement_rate,
        avg_gap_seconds: average_gap_seconds(&timestamps, session_gap_seconds),
    }
}

/// Averages successive gaps of sorted millisecond timestamps, in seconds.
///
/// Gaps strictly greater than `session_gap_seconds` are dropped. Returns
/// `None` when fewer than two gaps remain.
pub fn average_gap_seconds(sorted_timestamps_ms: &[i64], session_gap_seconds: u64) -> Option<f64> {
    let threshold = session_gap_seconds as f64;
    let gaps: Vec<f64> = sorted_timestamps_ms
        .windows(2)
        .map(|pair| (pair[1] - pair[0]) as f64 / 1000.0)
        .filter(|gap| *gap <= threshold)
        .collect();

    if gaps.len() < MIN_GAPS_FOR_AVERAGE {
        return None;
    }
    Some(gaps.iter().sum::<f64>() / gaps.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::{annotator_stats, average_gap_seconds, AnnotatorLabel, DEFAULT_SESSION_GAP_SECONDS};
    use crate::model::category::Category::{self, Fear, Hope};
    use crate::model::item::Consensus;

    fn label(name: &str, value: Category, consensus: Consensus, at_seconds: i64) -> AnnotatorLabel {
        AnnotatorLabel {
            annotator_name: name.to_string(),
            value,
            item_consensus: consensus,
            submitted_at: at_seconds * 1000,
        }
    }

    #[test]
    fn session_breaks_are_dropped_from_gap_average() {
        let timestamps = [0, 10_000, 30_000, 5_030_000, 5_060_000];
        assert_eq!(
            average_gap_seconds(&timestamps, DEFAULT_SESSION_GAP_SECONDS),
            Some(20.0)
        );
    }

    #[test]
    fn gap_equal_to_threshold_is_kept() {
        let timestamps = [0, 3_600_000, 3_610_000];
        assert_eq!(average_gap_seconds(&timestamps, 3600), Some(1805.0));
    }

    #[test]
    fn fewer_than_two_surviving_gaps_is_unset() {
        assert_eq!(average_gap_seconds(&[], 3600), None);
        assert_eq!(average_gap_seconds(&[0], 3600), None);
        assert_eq!(average_gap_seconds(&[0, 5_000], 3600), None);
        assert_eq!(average_gap_seconds(&[0, 5_000, 9_000_000], 3600), None);
    }

    #[test]
    fn agreement_only_counts_resolved_items() {
        let labels = vec![
            label("ana", Hope, Consensus::Resolved(Hope), 0),
            label("ana", Fear, Consensus::Resolved(Hope), 10),
            label("ana", Fear, Consensus::Open, 20),
            label("ana", Hope, Consensus::NeedsReview, 30),
        ];
        let stats = annotator_stats(&labels, DEFAULT_SESSION_GAP_SECONDS);
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].total_labels, 4);
        assert_eq!(stats[0].agreement_count, 1);
        assert_eq!(stats[0].disagreement_count, 1);
        assert_eq!(stats[0].disagreement_rate, Some(0.5));
        assert_eq!(stats[0].avg_gap_seconds, Some(10.0));
    }

    #[test]
    fn rate_is_unset_without_resolved_items() {
        let labels = vec![label("bo", Hope, Consensus::Open, 0)];
        let stats = annotator_stats(&labels, DEFAULT_SESSION_GAP_SECONDS);
        assert_eq!(stats[0].disagreement_rate, None);
        assert_eq!(stats[0].avg_gap_seconds, None);
    }

    #[test]
    fn history_is_sorted_before_measuring_gaps() {
        let labels = vec![
            label("cy", Hope, Consensus::Open, 30),
            label("cy", Hope, Consensus::Open, 0),
            label("cy", Hope, Consensus::Open, 10),
        ];
        let stats = annotator_stats(&labels, DEFAULT_SESSION_GAP_SECONDS);
        assert_eq!(stats[0].avg_gap_seconds, Some(15.0));
    }

    #[test]
    fn output_is_sorted_by_volume_then_name() {
        let labels = vec![
            label("zed", Hope, Consensus::Open, 0),
            label("amy", Hope, Consensus::Open, 0),
            label("max", Hope, Consensus::Open, 0),
            label("max", Fear, Consensus::Open, 5),
        ];
        let names: Vec<String> = annotator_stats(&labels, DEFAULT_SESSION_GAP_SECONDS)
            .into_iter()
            .map(|stats| stats.annotator_name)
            .collect();
        assert_eq!(names, vec!["max", "amy", "zed"]);
    }
}
