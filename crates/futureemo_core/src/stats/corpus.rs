//! Corpus-wide Fleiss' Kappa with variable raters per item.
//!
//! # Invariants
//! - Only items with at least two non-abstain labels qualify.
//! - An empty corpus is a valid "no data" result, never an error or NaN.
//! - Interpretation bands are inclusive on the lower edge.

use crate::model::category::Category;
use crate::stats::fleiss::{category_counts, fleiss_components, raw_kappa, CategoryCounts};
use crate::stats::round_to;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Landis & Koch style interpretation of a kappa value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KappaBand {
    /// Below zero: worse than chance.
    Poor,
    /// `[0.00, 0.20)`
    Slight,
    /// `[0.20, 0.40)`
    Fair,
    /// `[0.40, 0.60)`
    Moderate,
    /// `[0.60, 0.80)`
    Substantial,
    /// `>= 0.80`
    #[serde(rename = "Almost Perfect")]
    AlmostPerfect,
}

impl KappaBand {
    pub fn from_kappa(kappa: f64) -> Self {
        if kappa < 0.0 {
            Self::Poor
        } else if kappa < 0.20 {
            Self::Slight
        } else if kappa < 0.40 {
            Self::Fair
        } else if kappa < 0.60 {
            Self::Moderate
        } else if kappa < 0.80 {
            Self::Substantial
        } else {
            Self::AlmostPerfect
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Poor => "Poor",
            Self::Slight => "Slight",
            Self::Fair => "Fair",
            Self::Moderate => "Moderate",
            Self::Substantial => "Substantial",
            Self::AlmostPerfect => "Almost Perfect",
        }
    }
}

impl Display for KappaBand {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Share of all assignments that went to one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryShare {
    pub category: Category,
    /// Rounded percentage, `0..=100`.
    pub percent: u32,
}

/// Corpus-wide reliability report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorpusReliability {
    pub kappa: Option<f64>,
    pub interpretation: Option<KappaBand>,
    /// Mean observed agreement, 3 decimals.
    pub p_bar: Option<f64>,
    /// Expected agreement by chance, 3 decimals.
    pub p_bar_e: Option<f64>,
    /// Qualifying items.
    pub total_items: usize,
    /// Mean non-abstain raters per qualifying item, 1 decimal.
    pub mean_raters_per_item: Option<f64>,
    /// Observed categories, sorted by name.
    pub categories: Vec<Category>,
    /// One entry per observed category, same order as `categories`.
    pub category_distribution: Vec<CategoryShare>,
}

impl CorpusReliability {
    /// Result for a corpus with no qualifying items.
    pub fn no_data() -> Self {
        Self {
            kappa: None,
            interpretation: None,
            p_bar: None,
            p_bar_e: None,
            total_items: 0,
            mean_raters_per_item: None,
            categories: Vec::new(),
            category_distribution: Vec::new(),
        }
    }

    pub fn has_data(&self) -> bool {
        self.total_items > 0
    }
}

/// Computes corpus reliability over per-item non-abstain label lists.
///
/// Items with fewer than two labels are skipped.
pub fn corpus_reliability<L>(items: &[L]) -> CorpusReliability
where
    L: AsRef<[Category]>,
{
    let subjects: Vec<CategoryCounts> = items
        .iter()
        .map(|labels| labels.as_ref())
        .filter(|labels| labels.len() >= 2)
        .map(category_counts)
        .collect();

    let Some(components) = fleiss_components(&subjects) else {
        return CorpusReliability::no_data();
    };

    let kappa = match raw_kappa(&components) {
        Some(kappa) => Some(round_to(kappa, 3)),
        None if components.p_bar == 1.0 => Some(1.0),
        None => None,
    };

    let mut categories: Vec<Category> = Category::ALL
        .iter()
        .copied()
        .filter(|category| components.proportions[category.index()] > 0.0)
        .collect();
    categories.sort_by_key(|category| category.as_str());

    let category_distribution = categories
        .iter()
        .map(|category| CategoryShare {
            category: *category,
            percent: round_to(components.proportions[category.index()] * 100.0, 0) as u32,
        })
        .collect();

    CorpusReliability {
        kappa,
        interpretation: kappa.map(KappaBand::from_kappa),
        p_bar: Some(round_to(components.p_bar, 3)),
        p_bar_e: Some(round_to(components.p_bar_e, 3)),
        total_items: components.subjects,
        mean_raters_per_item: Some(round_to(
            components.assignments as f64 / components.subjects as f64,
            1,
        )),
        categories,
        category_distribution,
    }
}

#[cfg(test)]
mod tests {
    use super::{corpus_reliability, CategoryShare, CorpusReliability, KappaBand};
    use crate::model::category::Category::{self, Determination, Fear, Hope, Neutral};

    #[test]
    fn empty_corpus_is_no_data() {
        let empty: Vec<Vec<Category>> = Vec::new();
        assert_eq!(corpus_reliability(&empty), CorpusReliability::no_data());
    }

    #[test]
    fn single_label_items_do_not_qualify() {
        let report = corpus_reliability(&[vec![Hope], vec![Fear]]);
        assert!(!report.has_data());
        assert_eq!(report.kappa, None);
        assert!(report.categories.is_empty());
    }

    #[test]
    fn mixed_corpus_matches_hand_computation() {
        let report = corpus_reliability(&[
            vec![Hope, Hope],
            vec![Hope, Fear],
            vec![Fear, Fear],
            vec![Neutral],
        ]);
        assert_eq!(report.total_items, 3);
        assert_eq!(report.p_bar, Some(0.667));
        assert_eq!(report.p_bar_e, Some(0.5));
        assert_eq!(report.kappa, Some(0.333));
        assert_eq!(report.interpretation, Some(KappaBand::Fair));
        assert_eq!(report.mean_raters_per_item, Some(2.0));
        assert_eq!(report.categories, vec![Fear, Hope]);
        assert_eq!(
            report.category_distribution,
            vec![
                CategoryShare {
                    category: Fear,
                    percent: 50
                },
                CategoryShare {
                    category: Hope,
                    percent: 50
                },
            ]
        );
    }

    #[test]
    fn single_category_corpus_is_perfect_agreement() {
        let report = corpus_reliability(&[vec![Hope, Hope], vec![Hope, Hope, Hope]]);
        assert_eq!(report.p_bar_e, Some(1.0));
        assert_eq!(report.kappa, Some(1.0));
        assert_eq!(report.interpretation, Some(KappaBand::AlmostPerfect));
        assert_eq!(report.mean_raters_per_item, Some(2.5));
    }

    #[test]
    fn systematic_disagreement_is_poor() {
        let report = corpus_reliability(&[vec![Hope, Fear], vec![Determination, Neutral]]);
        assert_eq!(report.p_bar, Some(0.0));
        assert_eq!(report.kappa, Some(-0.333));
        assert_eq!(report.interpretation, Some(KappaBand::Poor));
    }

    #[test]
    fn band_edges_are_inclusive_on_the_lower_bound() {
        assert_eq!(KappaBand::from_kappa(-0.001), KappaBand::Poor);
        assert_eq!(KappaBand::from_kappa(0.0), KappaBand::Slight);
        assert_eq!(KappaBand::from_kappa(0.2), KappaBand::Fair);
        assert_eq!(KappaBand::from_kappa(0.4), KappaBand::Moderate);
        assert_eq!(KappaBand::from_kappa(0.6), KappaBand::Substantial);
        assert_eq!(KappaBand::from_kappa(0.8), KappaBand::AlmostPerfect);
        assert_eq!(KappaBand::from_kappa(0.799), KappaBand::Substantial);
    }

    #[test]
    fn band_labels_serialize_as_display_names() {
        assert_eq!(
            serde_json::to_string(&KappaBand::AlmostPerfect).unwrap(),
            "\"Almost Perfect\""
        );
        assert_eq!(KappaBand::AlmostPerfect.to_string(), "Almost Perfect");
    }
}
