//! Label submission use-case.
//!
//! # Responsibility
//! - Validate raw submission input.
//! - Record the label and recompute the item's consensus through the
//!   resolver in one repository transaction.
//!
//! # Invariants
//! - Abstain submissions are recorded but never recompute consensus.
//! - A second submission from the same annotator on the same item fails with
//!   `DuplicateSubmission`, whatever the interleaving.
//! - Errors are surfaced to the caller; nothing here retries.

use crate::consensus::resolve;
use crate::model::category::Category;
use crate::model::item::{Item, ItemId, ItemStatus};
use crate::model::label::Label;
use crate::repo::label_repo::LabelRepository;
use crate::repo::RepoError;
use crate::service::validation::{
    parse_item_id, validate_annotator_name, validate_label_value, ValidationError,
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};

/// Service error for label submission.
#[derive(Debug)]
pub enum LabelServiceError {
    Validation(ValidationError),
    /// Referenced item does not exist.
    ItemNotFound(ItemId),
    /// The annotator already labeled this item.
    DuplicateSubmission { item_id: ItemId },
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for LabelServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::ItemNotFound(id) => write!(f, "item not found: {id}"),
            Self::DuplicateSubmission { item_id } => {
                write!(f, "annotator has already labeled item {item_id}")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LabelServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for LabelServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for LabelServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::ItemNotFound(id) => Self::ItemNotFound(id),
            RepoError::DuplicateLabel { item_uuid, .. } => {
                Self::DuplicateSubmission { item_id: item_uuid }
            }
            other => Self::Repo(other),
        }
    }
}

/// Raw submission input as received from a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitLabelRequest {
    pub item_id: String,
    pub annotator_name: String,
    pub value: String,
}

/// Item state after a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub item_id: ItemId,
    pub resolved_label: Option<Category>,
    pub status: ItemStatus,
    pub label_count: u32,
}

impl SubmissionReceipt {
    fn from_item(item: &Item) -> Self {
        Self {
            item_id: item.uuid,
            resolved_label: item.resolved_label(),
            status: item.status(),
            label_count: item.label_count,
        }
    }
}

/// Label submission facade over a label repository.
pub struct LabelService<R: LabelRepository> {
    repo: R,
}

impl<R: LabelRepository> LabelService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Submits one label stamped with the current time.
    pub fn submit_label(
        &self,
        request: &SubmitLabelRequest,
    ) -> Result<SubmissionReceipt, LabelServiceError> {
        self.submit_label_at(request, now_epoch_ms())
    }

    /// Submits one label with an explicit submission time (epoch ms).
    ///
    /// Used by imports and replays where the original time is known.
    pub fn submit_label_at(
        &self,
        request: &SubmitLabelRequest,
        submitted_at: i64,
    ) -> Result<SubmissionReceipt, LabelServiceError> {
        let item_id = parse_item_id(&request.item_id)?;
        let annotator_name = validate_annotator_name(&request.annotator_name)?;
        let value = validate_label_value(&request.value)?;

        let label = Label::new(item_id, annotator_name, value, submitted_at);
        match self.repo.append_label(&label, resolve) {
            Ok(item) => {
                info!(
                    "event=label_submit module=service status=ok item_id={} value={} item_status={} label_count={}",
                    item.uuid,
                    value,
                    item.status(),
                    item.label_count
                );
                if !value.is_skip() {
                    debug!(
                        "event=consensus_update module=service status=ok item_id={} item_status={} resolved_label={}",
                        item.uuid,
                        item.status(),
                        item.resolved_label().map_or("none", |label| label.as_str())
                    );
                }
                Ok(SubmissionReceipt::from_item(&item))
            }
            Err(err) => {
                let err = LabelServiceError::from(err);
                warn!(
                    "event=label_submit module=service status=error item_id={} error_code={}",
                    item_id,
                    error_code(&err)
                );
                Err(err)
            }
        }
    }
}

fn error_code(err: &LabelServiceError) -> &'static str {
    match err {
        LabelServiceError::Validation(_) => "validation",
        LabelServiceError::ItemNotFound(_) => "item_not_found",
        LabelServiceError::DuplicateSubmission { .. } => "duplicate_submission",
        LabelServiceError::Repo(RepoError::ConcurrentModification(_)) => "concurrent_modification",
        LabelServiceError::Repo(_) => "repo",
    }
}

fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or_default()
}
