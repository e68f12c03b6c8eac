//! Label domain model.
//!
//! # Responsibility
//! - Define one annotator's judgment on one item.
//!
//! # Invariants
//! - At most one label exists per `(item_uuid, annotator_name)` pair.
//! - Labels are append-only: never mutated or deleted after submission.
//! - `annotator_name` is stored trimmed and non-empty.

use crate::model::category::LabelValue;
use crate::model::item::ItemId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for every label.
pub type LabelId = Uuid;

/// Canonical label record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub uuid: LabelId,
    pub item_uuid: ItemId,
    pub annotator_name: String,
    pub value: LabelValue,
    /// Unix epoch milliseconds.
    pub submitted_at: i64,
}

impl Label {
    /// Creates a label with a generated id.
    pub fn new(
        item_uuid: ItemId,
        annotator_name: impl Into<String>,
        value: LabelValue,
        submitted_at: i64,
    ) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            item_uuid,
            annotator_name: annotator_name.into(),
            value,
            submitted_at,
        }
    }
}

/// Trims an annotator name, returning `None` when nothing is left.
pub fn normalize_annotator_name(name: &str) -> Option<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
