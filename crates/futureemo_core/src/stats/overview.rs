//! Corpus progress counts and unanimity summary.

use crate::model::category::Category;
use serde::{Deserialize, Serialize};

/// Unanimity over items with at least two non-abstain labels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnanimitySummary {
    /// Items where every label is the same category.
    pub agreement_count: u32,
    /// Items with at least two distinct categories.
    pub disagreement_count: u32,
    pub agreement_rate: Option<f64>,
}

/// Progress counts over the whole corpus.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverviewStats {
    pub total_items: u32,
    /// All stored labels, abstentions included.
    pub total_labels: u32,
    pub items_with_any_label: u32,
    pub items_with_multiple_labels: u32,
    pub open_items: u32,
    pub resolved_items: u32,
    pub needs_review_items: u32,
    pub unanimity: UnanimitySummary,
}

/// Counts unanimous versus split items among those with two or more labels.
pub fn unanimity_summary<L>(items: &[L]) -> UnanimitySummary
where
    L: AsRef<[Category]>,
{
    let mut agreement_count = 0_u32;
    let mut disagreement_count = 0_u32;
    for labels in items {
        let labels = labels.as_ref();
        let Some((first, rest)) = labels.split_first() else {
            continue;
        };
        if rest.is_empty() {
            continue;
        }
        if rest.iter().all(|label| label == first) {
            agreement_count += 1;
        } else {
            disagreement_count += 1;
        }
    }

    let judged = agreement_count + disagreement_count;
    UnanimitySummary {
        agreement_count,
        disagreement_count,
        agreement_rate: if judged > 0 {
            Some(f64::from(agreement_count) / f64::from(judged))
        } else {
            None
        },
    }
}
