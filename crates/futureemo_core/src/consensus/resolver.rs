//! Plurality resolver with escalation on ties.
//!
//! Rules by label count `n`:
//! - `n < 2`: open.
//! - `n == 2`: resolved when both labels agree, otherwise open and waiting
//!   for a third opinion.
//! - `n >= 3`: resolved to the unique plurality category; a tie for the top
//!   count escalates to `NeedsReview`.

use crate::model::category::Category;
use crate::model::item::Consensus;
use crate::stats::fleiss::category_counts;

/// Smallest number of non-abstain labels that can resolve an item.
pub const MIN_LABELS_FOR_CONSENSUS: usize = 2;

/// Resolves the consensus outcome for one item.
///
/// `labels` is the item's non-abstain history in submission order. Abstain
/// labels must already be filtered out by the caller.
pub fn resolve(labels: &[Category]) -> Consensus {
    match labels {
        [] | [_] => Consensus::Open,
        [first, second] => {
            if first == second {
                Consensus::Resolved(*first)
            } else {
                Consensus::Open
            }
        }
        _ => {
            let counts = category_counts(labels);
            let max_votes = counts.iter().copied().max().unwrap_or(0);
            let mut leaders = Category::ALL
                .iter()
                .copied()
                .filter(|category| counts[category.index()] == max_votes);

            match (leaders.next(), leaders.next()) {
                (Some(leader), None) => Consensus::Resolved(leader),
                _ => Consensus::NeedsReview,
            }
        }
    }
}
