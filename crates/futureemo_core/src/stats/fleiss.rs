//! Fleiss' Kappa kernel shared by item-level and corpus-level reliability.
//!
//! For subjects `i` with `n_i >= 2` raters and per-category counts `c_ij`:
//! - `P_i = (sum_j c_ij^2 - n_i) / (n_i * (n_i - 1))`
//! - `P_bar = mean_i(P_i)`, unweighted by `n_i`
//! - `p_j = sum_i c_ij / sum_i n_i`, `P_bar_e = sum_j p_j^2`
//!
//! Callers decide how degenerate `P_bar_e` values map to a kappa.

use crate::model::category::Category;

/// Per-category counts for one subject, indexed by `Category::index()`.
pub type CategoryCounts = [u32; 4];

/// Intermediate Fleiss terms over a set of subjects.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FleissComponents {
    /// Number of subjects that contributed (those with at least two raters).
    pub subjects: usize,
    /// Total category assignments across contributing subjects.
    pub assignments: u64,
    /// Mean observed agreement.
    pub p_bar: f64,
    /// Expected agreement by chance.
    pub p_bar_e: f64,
    /// Share of all assignments per category, indexed by `Category::index()`.
    pub proportions: [f64; 4],
}

/// Builds category counts for one subject.
pub fn category_counts(labels: &[Category]) -> CategoryCounts {
    let mut counts = [0_u32; 4];
    for label in labels {
        counts[label.index()] += 1;
    }
    counts
}

/// Observed agreement `P_i` for one subject, `None` below two raters.
pub fn subject_agreement(counts: &CategoryCounts) -> Option<f64> {
    let n: u64 = counts.iter().map(|count| u64::from(*count)).sum();
    if n < 2 {
        return None;
    }
    let sum_squares: u64 = counts
        .iter()
        .map(|count| u64::from(*count) * u64::from(*count))
        .sum();
    Some((sum_squares - n) as f64 / (n * (n - 1)) as f64)
}

/// Computes Fleiss terms over subjects with at least two raters.
///
/// Subjects with fewer than two raters are ignored. Returns `None` when no
/// subject qualifies.
pub fn fleiss_components(subjects: &[CategoryCounts]) -> Option<FleissComponents> {
    let mut contributing = 0_usize;
    let mut sum_p_i = 0.0_f64;
    let mut totals = [0_u64; 4];

    for counts in subjects {
        let Some(p_i) = subject_agreement(counts) else {
            continue;
        };
        contributing += 1;
        sum_p_i += p_i;
        for (total, count) in totals.iter_mut().zip(counts.iter()) {
            *total += u64::from(*count);
        }
    }

    if contributing == 0 {
        return None;
    }

    let assignments: u64 = totals.iter().sum();
    let mut proportions = [0.0_f64; 4];
    for (share, total) in proportions.iter_mut().zip(totals.iter()) {
        *share = *total as f64 / assignments as f64;
    }
    let p_bar_e = proportions.iter().map(|share| share * share).sum();

    Some(FleissComponents {
        subjects: contributing,
        assignments,
        p_bar: sum_p_i / contributing as f64,
        p_bar_e,
        proportions,
    })
}

/// Raw `(P_bar - P_bar_e) / (1 - P_bar_e)`, `None` when `P_bar_e >= 1`.
pub fn raw_kappa(components: &FleissComponents) -> Option<f64> {
    if components.p_bar_e < 1.0 {
        Some((components.p_bar - components.p_bar_e) / (1.0 - components.p_bar_e))
    } else {
        None
    }
}
