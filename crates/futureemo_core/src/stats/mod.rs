//! Read-only agreement statistics over stored labels.
//!
//! # Responsibility
//! - Provide the shared Fleiss' Kappa kernel.
//! - Compute item-level agreement, corpus-level reliability, per-annotator
//!   quality and overview counts.
//!
//! # Invariants
//! - Abstain labels never enter any computation here.
//! - "Not enough data" is `None`, never an error and never NaN.

pub mod annotator;
pub mod corpus;
pub mod fleiss;
pub mod item_agreement;
pub mod overview;

use crate::model::category::{Category, LabelValue};

/// Drops abstain labels, keeping substantive categories in input order.
pub fn substantive_labels<'a, I>(values: I) -> Vec<Category>
where
    I: IntoIterator<Item = &'a LabelValue>,
{
    values
        .into_iter()
        .filter_map(|value| value.category())
        .collect()
}

/// Rounds half toward positive infinity to `decimals` places.
pub(crate) fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10_f64.powi(decimals);
    (value * factor + 0.5).floor() / factor
}

#[cfg(test)]
mod tests {
    use super::{round_to, substantive_labels};
    use crate::model::category::{Category, LabelValue};

    #[test]
    fn substantive_labels_drops_skip() {
        let values = [
            LabelValue::Skip,
            LabelValue::Category(Category::Hope),
            LabelValue::Skip,
            LabelValue::Category(Category::Neutral),
        ];
        assert_eq!(
            substantive_labels(&values),
            vec![Category::Hope, Category::Neutral]
        );
    }

    #[test]
    fn round_to_matches_half_up_rounding() {
        assert_eq!(round_to(-1.0 / 3.0, 3), -0.333);
        assert_eq!(round_to(0.6665, 2), 0.67);
        assert_eq!(round_to(2.5, 0), 3.0);
        assert_eq!(round_to(-2.5, 0), -2.0);
    }
}
