//! Item domain model.
//!
//! # Responsibility
//! - Define the text unit that annotators label.
//! - Model the item lifecycle as one tagged consensus outcome.
//!
//! # Invariants
//! - `uuid` is stable and never reused for another item.
//! - A resolved label exists only inside `Consensus::Resolved`, so
//!   "status is resolved iff a label is set" cannot be violated in memory.
//! - `label_count` counts non-abstain labels only.

use crate::model::category::Category;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for every item.
pub type ItemId = Uuid;

/// Flat lifecycle status, as stored and reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    /// Waiting for more labels.
    Open,
    /// Consensus reached; a resolved label exists.
    Resolved,
    /// Tied plurality at three or more labels; needs human adjudication.
    NeedsReview,
}

impl ItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Resolved => "resolved",
            Self::NeedsReview => "needs_review",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "open" => Some(Self::Open),
            "resolved" => Some(Self::Resolved),
            "needs_review" => Some(Self::NeedsReview),
            _ => None,
        }
    }
}

impl Display for ItemStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Consensus outcome for one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "status", content = "label", rename_all = "snake_case")]
pub enum Consensus {
    Open,
    Resolved(Category),
    NeedsReview,
}

impl Consensus {
    pub fn status(self) -> ItemStatus {
        match self {
            Self::Open => ItemStatus::Open,
            Self::Resolved(_) => ItemStatus::Resolved,
            Self::NeedsReview => ItemStatus::NeedsReview,
        }
    }

    pub fn resolved_label(self) -> Option<Category> {
        match self {
            Self::Resolved(category) => Some(category),
            Self::Open | Self::NeedsReview => None,
        }
    }

    /// Rebuilds the tagged outcome from flat status/label columns.
    ///
    /// # Errors
    /// - `ItemValidationError::InconsistentConsensus` when the pair violates
    ///   the resolved-iff-labeled invariant.
    pub fn from_parts(
        status: ItemStatus,
        label: Option<Category>,
    ) -> Result<Self, ItemValidationError> {
        match (status, label) {
            (ItemStatus::Resolved, Some(category)) => Ok(Self::Resolved(category)),
            (ItemStatus::Open, None) => Ok(Self::Open),
            (ItemStatus::NeedsReview, None) => Ok(Self::NeedsReview),
            (status, label) => Err(ItemValidationError::InconsistentConsensus { status, label }),
        }
    }
}

/// Item-level validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemValidationError {
    /// Item text is blank after trim.
    EmptyText,
    /// Status/label pair violates the resolved-iff-labeled invariant.
    InconsistentConsensus {
        status: ItemStatus,
        label: Option<Category>,
    },
}

impl Display for ItemValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyText => write!(f, "item text must not be blank"),
            Self::InconsistentConsensus { status, label } => match label {
                Some(label) => write!(f, "status `{status}` cannot carry resolved label `{label}`"),
                None => write!(f, "status `{status}` requires a resolved label"),
            },
        }
    }
}

impl Error for ItemValidationError {}

/// Canonical item record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub uuid: ItemId,
    /// Immutable content shown to annotators.
    pub text: String,
    /// Number of non-abstain labels received.
    pub label_count: u32,
    pub consensus: Consensus,
    /// Set when the current consensus was written by an admin override.
    pub is_override: bool,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
}

impl Item {
    /// Creates a fresh open item with a generated id.
    pub fn new(text: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), text)
    }

    /// Creates a fresh open item with a caller-provided id.
    pub fn with_id(uuid: ItemId, text: impl Into<String>) -> Self {
        Self {
            uuid,
            text: text.into(),
            label_count: 0,
            consensus: Consensus::Open,
            is_override: false,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn status(&self) -> ItemStatus {
        self.consensus.status()
    }

    pub fn resolved_label(&self) -> Option<Category> {
        self.consensus.resolved_label()
    }

    /// Validates write-path invariants.
    pub fn validate(&self) -> Result<(), ItemValidationError> {
        if self.text.trim().is_empty() {
            return Err(ItemValidationError::EmptyText);
        }
        Ok(())
    }
}
