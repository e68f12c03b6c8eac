//! Tabular label reports.
//!
//! # Responsibility
//! - Render the per-item label report consumed by downstream analysis.
//!
//! # Invariants
//! - Only items with at least one non-abstain label are exported.
//! - Row order is newest item first.

pub mod csv;

use crate::repo::item_repo::{ItemListQuery, ItemRepository};
use crate::repo::label_repo::LabelRepository;
use crate::service::review_service::{ReviewService, ReviewServiceError};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Report export failures.
#[derive(Debug)]
pub enum ExportError {
    /// No item has received a non-abstain label yet.
    NothingToExport,
    Review(ReviewServiceError),
}

impl Display for ExportError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NothingToExport => write!(f, "no labeled items found"),
            Self::Review(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ExportError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::NothingToExport => None,
            Self::Review(err) => Some(err),
        }
    }
}

impl From<ReviewServiceError> for ExportError {
    fn from(value: ReviewServiceError) -> Self {
        Self::Review(value)
    }
}

/// Builds the CSV label report for every labeled item.
pub fn export_labels_csv<I, L>(review: &ReviewService<I, L>) -> Result<String, ExportError>
where
    I: ItemRepository,
    L: LabelRepository,
{
    let query = ItemListQuery {
        min_label_count: Some(1),
        ..ItemListQuery::default()
    };
    let details = review.list_item_details(&query)?;
    match csv::render_report(&details) {
        Ok(report) => {
            info!(
                "event=export_csv module=export status=ok rows={}",
                details.len()
            );
            Ok(report)
        }
        Err(err) => {
            warn!("event=export_csv module=export status=error error_code=nothing_to_export");
            Err(err)
        }
    }
}
