//! Read-side use-cases: item detail and agreement statistics.
//!
//! # Responsibility
//! - Assemble per-item detail views with their agreement figures.
//! - Run the corpus, annotator and overview calculators over repository
//!   read models.
//!
//! # Invariants
//! - Nothing here writes.
//! - Abstain labels appear in detail listings but never in any statistic.

use crate::model::item::{Item, ItemId};
use crate::model::label::Label;
use crate::repo::item_repo::{ItemListQuery, ItemRepository};
use crate::repo::label_repo::LabelRepository;
use crate::repo::RepoError;
use crate::service::validation::{parse_item_id, ValidationError};
use crate::stats::annotator::{annotator_stats, AnnotatorStats};
use crate::stats::corpus::{corpus_reliability, CorpusReliability};
use crate::stats::item_agreement::{item_agreement, ItemAgreement};
use crate::stats::overview::{unanimity_summary, OverviewStats};
use crate::stats::substantive_labels;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// One item with every label and its agreement figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDetail {
    pub item: Item,
    /// Submission order, abstentions included.
    pub labels: Vec<Label>,
    /// Distinct annotator names, sorted.
    pub annotators: Vec<String>,
    pub agreement: ItemAgreement,
}

impl ItemDetail {
    fn build(item: Item, labels: Vec<Label>) -> Self {
        let annotators: BTreeSet<&str> = labels
            .iter()
            .map(|label| label.annotator_name.as_str())
            .collect();
        let annotators = annotators.into_iter().map(str::to_string).collect();
        let agreement = item_agreement(&substantive_labels(labels.iter().map(|label| &label.value)));
        Self {
            item,
            labels,
            annotators,
            agreement,
        }
    }

    /// Label value given by `annotator_name`, if any.
    pub fn label_by(&self, annotator_name: &str) -> Option<&Label> {
        self.labels
            .iter()
            .find(|label| label.annotator_name == annotator_name)
    }
}

/// Errors from read-side use-cases.
#[derive(Debug)]
pub enum ReviewServiceError {
    Validation(ValidationError),
    ItemNotFound(ItemId),
    Repo(RepoError),
}

impl Display for ReviewServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::ItemNotFound(id) => write!(f, "item not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ReviewServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::ItemNotFound(_) => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<ValidationError> for ReviewServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ReviewServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::ItemNotFound(id) => Self::ItemNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Read-side facade over the item and label repositories.
pub struct ReviewService<I: ItemRepository, L: LabelRepository> {
    items: I,
    labels: L,
}

impl<I: ItemRepository, L: LabelRepository> ReviewService<I, L> {
    pub fn new(items: I, labels: L) -> Self {
        Self { items, labels }
    }

    /// Detail view of one item.
    pub fn get_item_detail(&self, item_id: &str) -> Result<ItemDetail, ReviewServiceError> {
        let id = parse_item_id(item_id)?;
        let snapshot = self
            .items
            .get_item_snapshot(id)?
            .ok_or(ReviewServiceError::ItemNotFound(id))?;
        Ok(ItemDetail::build(snapshot.item, snapshot.labels))
    }

    /// Detail views of items matching `query`, newest first.
    pub fn list_item_details(
        &self,
        query: &ItemListQuery,
    ) -> Result<Vec<ItemDetail>, ReviewServiceError> {
        let items = self.items.list_items(query)?;
        let mut details = Vec::with_capacity(items.len());
        for item in items {
            // Items are never deleted, so a missing snapshot is a real error.
            let snapshot = self
                .items
                .get_item_snapshot(item.uuid)?
                .ok_or(ReviewServiceError::ItemNotFound(item.uuid))?;
            details.push(ItemDetail::build(snapshot.item, snapshot.labels));
        }
        Ok(details)
    }

    /// Corpus-wide Fleiss' Kappa over items with two or more labels.
    pub fn corpus_reliability(&self) -> Result<CorpusReliability, ReviewServiceError> {
        let histories = self.labels.item_histories(2)?;
        Ok(corpus_reliability(&histories))
    }

    /// Per-annotator quality figures.
    pub fn annotator_stats(
        &self,
        session_gap_seconds: u64,
    ) -> Result<Vec<AnnotatorStats>, ReviewServiceError> {
        let labels = self.labels.annotator_labels()?;
        Ok(annotator_stats(&labels, session_gap_seconds))
    }

    /// Corpus progress counts and unanimity.
    pub fn overview(&self) -> Result<OverviewStats, ReviewServiceError> {
        let counts = self.items.item_counts()?;
        let total_labels = self.labels.count_labels()?;
        let histories = self.labels.item_histories(2)?;
        Ok(OverviewStats {
            total_items: counts.total,
            total_labels,
            items_with_any_label: counts.with_any_label,
            items_with_multiple_labels: counts.with_multiple_labels,
            open_items: counts.open,
            resolved_items: counts.resolved,
            needs_review_items: counts.needs_review,
            unanimity: unanimity_summary(&histories),
        })
    }
}
