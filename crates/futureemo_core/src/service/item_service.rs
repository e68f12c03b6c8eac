//! Item use-cases: seeding, annotator batches and admin overrides.
//!
//! # Invariants
//! - Overrides write a whole `Consensus`, so the resolved-iff-labeled rule
//!   holds on this path too.
//! - Batches never contain items the annotator already labeled, abstentions
//!   included.

use crate::model::category::Category;
use crate::model::item::{Consensus, Item, ItemId};
use crate::repo::item_repo::{ItemRepository, SeedSummary};
use crate::repo::RepoError;
use crate::service::validation::{parse_item_id, validate_annotator_name, ValidationError};
use log::info;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Default number of items served per batch.
pub const DEFAULT_BATCH_SIZE: u32 = 50;
/// Largest accepted batch size.
pub const MAX_BATCH_SIZE: u32 = 500;
/// Items at or above this many non-abstain labels are not served.
pub const DEFAULT_BATCH_MAX_LABEL_COUNT: u32 = 3;

/// Admin decision that replaces an item's consensus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "label", rename_all = "snake_case")]
pub enum AdminOverride {
    /// Set the resolved label.
    Resolve(Category),
    /// Return to open and clear the resolved label.
    Reopen,
    /// Send to human review and clear the resolved label.
    Escalate,
}

impl AdminOverride {
    pub fn consensus(self) -> Consensus {
        match self {
            Self::Resolve(category) => Consensus::Resolved(category),
            Self::Reopen => Consensus::Open,
            Self::Escalate => Consensus::NeedsReview,
        }
    }
}

/// Batch serving knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPolicy {
    pub default_limit: u32,
    pub max_label_count: u32,
}

impl Default for BatchPolicy {
    fn default() -> Self {
        Self {
            default_limit: DEFAULT_BATCH_SIZE,
            max_label_count: DEFAULT_BATCH_MAX_LABEL_COUNT,
        }
    }
}

/// Errors from item use-cases.
#[derive(Debug)]
pub enum ItemServiceError {
    Validation(ValidationError),
    ItemNotFound(ItemId),
    Repo(RepoError),
}

impl Display for ItemServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::ItemNotFound(id) => write!(f, "item not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ItemServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::ItemNotFound(_) => None,
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<ValidationError> for ItemServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ItemServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::ItemNotFound(id) => Self::ItemNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Item use-case facade over an item repository.
pub struct ItemService<R: ItemRepository> {
    repo: R,
    batch: BatchPolicy,
}

impl<R: ItemRepository> ItemService<R> {
    pub fn new(repo: R) -> Self {
        Self::with_batch_policy(repo, BatchPolicy::default())
    }

    pub fn with_batch_policy(repo: R, batch: BatchPolicy) -> Self {
        Self { repo, batch }
    }

    /// Seeds fresh open items, trimming texts and skipping blanks/duplicates.
    pub fn seed_items(&self, texts: &[String]) -> Result<SeedSummary, ItemServiceError> {
        let summary = self.repo.seed_items(texts)?;
        info!(
            "event=seed_items module=service status=ok inserted={} skipped={}",
            summary.inserted, summary.skipped
        );
        Ok(summary)
    }

    /// Gets one item by id.
    pub fn get_item(&self, item_id: &str) -> Result<Item, ItemServiceError> {
        let id = parse_item_id(item_id)?;
        self.repo
            .get_item(id)?
            .ok_or(ItemServiceError::ItemNotFound(id))
    }

    /// Items the annotator should label next.
    ///
    /// `limit` defaults to the policy's batch size and must be within
    /// `1..=MAX_BATCH_SIZE`.
    pub fn next_batch(
        &self,
        annotator_name: &str,
        limit: Option<u32>,
    ) -> Result<Vec<Item>, ItemServiceError> {
        let annotator_name = validate_annotator_name(annotator_name)?;
        let limit = limit.unwrap_or(self.batch.default_limit);
        if limit == 0 || limit > MAX_BATCH_SIZE {
            return Err(ValidationError::LimitOutOfRange {
                limit,
                max: MAX_BATCH_SIZE,
            }
            .into());
        }
        Ok(self
            .repo
            .next_batch(&annotator_name, self.batch.max_label_count, limit)?)
    }

    /// Replaces an item's consensus on the flagged admin path.
    pub fn override_item(
        &self,
        item_id: &str,
        decision: AdminOverride,
    ) -> Result<Item, ItemServiceError> {
        let id = parse_item_id(item_id)?;
        let item = self.repo.override_consensus(id, decision.consensus())?;
        info!(
            "event=admin_override module=service status=ok item_id={} item_status={}",
            item.uuid,
            item.status()
        );
        Ok(item)
    }
}
