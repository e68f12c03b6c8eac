//! Single-item agreement diagnostics.
//!
//! This is a local, one-subject kappa computed from the item's own label
//! proportions. It is not the corpus-wide kappa.

use crate::model::category::Category;
use crate::stats::fleiss::{category_counts, fleiss_components, CategoryCounts};
use crate::stats::round_to;
use serde::{Deserialize, Serialize};

/// Agreement figures for one item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ItemAgreement {
    /// Non-abstain labels considered.
    pub rater_count: u32,
    /// Share of labels held by the most common category, `0..=100`.
    pub agreement_pct: Option<u32>,
    /// Most common category; ties go to the earliest category in
    /// enumeration order.
    pub majority_label: Option<Category>,
    /// Single-item Fleiss' Kappa in `[-1, 1]`, 3 decimals.
    pub kappa: Option<f64>,
}

impl ItemAgreement {
    fn empty() -> Self {
        Self {
            rater_count: 0,
            agreement_pct: None,
            majority_label: None,
            kappa: None,
        }
    }
}

/// Computes agreement figures for one item's non-abstain labels.
pub fn item_agreement(labels: &[Category]) -> ItemAgreement {
    let counts = category_counts(labels);
    let n: u32 = counts.iter().sum();
    if n == 0 {
        return ItemAgreement::empty();
    }

    let max_count = counts.iter().copied().max().unwrap_or(0);
    let majority_label = Category::ALL
        .iter()
        .copied()
        .find(|category| counts[category.index()] == max_count);

    if n == 1 {
        return ItemAgreement {
            rater_count: 1,
            agreement_pct: Some(100),
            majority_label,
            kappa: None,
        };
    }

    let agreement_pct = round_to(100.0 * f64::from(max_count) / f64::from(n), 0) as u32;

    ItemAgreement {
        rater_count: n,
        agreement_pct: Some(agreement_pct),
        majority_label,
        kappa: single_item_kappa(counts),
    }
}

fn single_item_kappa(counts: CategoryCounts) -> Option<f64> {
    let components = fleiss_components(&[counts])?;
    if components.p_bar_e >= 1.0 {
        return Some(1.0);
    }
    if components.p_bar_e <= 0.0 {
        return Some(0.0);
    }
    let kappa = (components.p_bar - components.p_bar_e) / (1.0 - components.p_bar_e);
    Some(round_to(kappa.clamp(-1.0, 1.0), 3))
}
