//! Caller input validation shared by services.
//!
//! Validation failures are rejected before any state change and are safe for
//! the caller to retry with corrected input.

use crate::model::category::{parse_label_value, LabelValue};
use crate::model::item::ItemId;
use crate::model::label::normalize_annotator_name;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Input validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Label value is not part of the vocabulary.
    UnknownLabel(String),
    /// Annotator name is blank after trim.
    EmptyAnnotatorName,
    /// Item reference is not a UUID.
    MalformedItemId(String),
    /// Requested page size is outside the accepted range.
    LimitOutOfRange { limit: u32, max: u32 },
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownLabel(value) => write!(
                f,
                "label must be one of Hope, Fear, Determination, Neutral, Skip; got `{value}`"
            ),
            Self::EmptyAnnotatorName => write!(f, "annotator name must not be blank"),
            Self::MalformedItemId(value) => write!(f, "malformed item id `{value}`"),
            Self::LimitOutOfRange { limit, max } => {
                write!(f, "limit {limit} is outside 1..={max}")
            }
        }
    }
}

impl Error for ValidationError {}

/// Parses an item reference.
pub fn parse_item_id(value: &str) -> Result<ItemId, ValidationError> {
    let trimmed = value.trim();
    Uuid::parse_str(trimmed).map_err(|_| ValidationError::MalformedItemId(trimmed.to_string()))
}

/// Trims an annotator name and rejects blanks.
pub fn validate_annotator_name(value: &str) -> Result<String, ValidationError> {
    normalize_annotator_name(value).ok_or(ValidationError::EmptyAnnotatorName)
}

/// Parses a submitted label value.
pub fn validate_label_value(value: &str) -> Result<LabelValue, ValidationError> {
    parse_label_value(value).map_err(|err| ValidationError::UnknownLabel(err.0))
}
