//! Closed label vocabulary.
//!
//! # Responsibility
//! - Define the four substantive emotion categories.
//! - Define the abstain pseudo-label (`Skip`) that is recorded but never
//!   counted by consensus or statistics.
//!
//! # Invariants
//! - Category enumeration order is `Hope, Fear, Determination, Neutral`.
//!   Tie-breaking that needs a deterministic order uses this order.
//! - String forms are case-sensitive and stable across storage and exports.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Substantive emotion category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    Hope,
    Fear,
    Determination,
    Neutral,
}

impl Category {
    /// All categories in enumeration order.
    pub const ALL: [Category; 4] = [
        Category::Hope,
        Category::Fear,
        Category::Determination,
        Category::Neutral,
    ];

    /// Stable string id used in storage and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hope => "Hope",
            Self::Fear => "Fear",
            Self::Determination => "Determination",
            Self::Neutral => "Neutral",
        }
    }

    /// Position in `Category::ALL`.
    pub fn index(self) -> usize {
        match self {
            Self::Hope => 0,
            Self::Fear => 1,
            Self::Determination => 2,
            Self::Neutral => 3,
        }
    }

    /// Parses a substantive category. `Skip` is not a category.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Hope" => Some(Self::Hope),
            "Fear" => Some(Self::Fear),
            "Determination" => Some(Self::Determination),
            "Neutral" => Some(Self::Neutral),
            _ => None,
        }
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage/wire string for the abstain pseudo-label.
pub const SKIP_LABEL: &str = "Skip";

/// Value submitted by one annotator: a category or an explicit abstention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LabelValue {
    Category(Category),
    Skip,
}

impl LabelValue {
    /// Stable string id used in storage and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Category(category) => category.as_str(),
            Self::Skip => SKIP_LABEL,
        }
    }

    /// Returns the substantive category, or `None` for `Skip`.
    pub fn category(self) -> Option<Category> {
        match self {
            Self::Category(category) => Some(category),
            Self::Skip => None,
        }
    }

    pub fn is_skip(self) -> bool {
        matches!(self, Self::Skip)
    }
}

impl From<Category> for LabelValue {
    fn from(value: Category) -> Self {
        Self::Category(value)
    }
}

impl Display for LabelValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when input text is not part of the label vocabulary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownLabelError(pub String);

impl Display for UnknownLabelError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown label `{}`; expected one of Hope, Fear, Determination, Neutral, {SKIP_LABEL}",
            self.0
        )
    }
}

impl Error for UnknownLabelError {}

/// Parses one submitted label value.
///
/// Surrounding whitespace is ignored; matching is case-sensitive.
pub fn parse_label_value(value: &str) -> Result<LabelValue, UnknownLabelError> {
    let trimmed = value.trim();
    if trimmed == SKIP_LABEL {
        return Ok(LabelValue::Skip);
    }
    Category::parse(trimmed)
        .map(LabelValue::Category)
        .ok_or_else(|| UnknownLabelError(trimmed.to_string()))
}

#[cfg(test)]
mod tests {
    use super::{parse_label_value, Category, LabelValue, UnknownLabelError};

    #[test]
    fn parses_categories_and_skip() {
        assert_eq!(
            parse_label_value("Hope").expect("Hope parse"),
            LabelValue::Category(Category::Hope)
        );
        assert_eq!(
            parse_label_value(" Determination ").expect("trimmed parse"),
            LabelValue::Category(Category::Determination)
        );
        assert_eq!(parse_label_value("Skip").expect("Skip parse"), LabelValue::Skip);
    }

    #[test]
    fn rejects_unknown_and_differently_cased_values() {
        let err = parse_label_value("hope").expect_err("lowercase must fail");
        assert_eq!(err, UnknownLabelError("hope".to_string()));
        assert!(parse_label_value("Joy").is_err());
        assert!(parse_label_value("").is_err());
    }

    #[test]
    fn index_matches_enumeration_order() {
        for (position, category) in Category::ALL.iter().enumerate() {
            assert_eq!(category.index(), position);
            assert_eq!(Category::parse(category.as_str()), Some(*category));
        }
    }

    #[test]
    fn skip_has_no_category() {
        assert_eq!(LabelValue::Skip.category(), None);
        assert!(LabelValue::Skip.is_skip());
        assert_eq!(
            LabelValue::from(Category::Fear).category(),
            Some(Category::Fear)
        );
    }
}
