//! Consensus resolution over accumulated item labels.
//!
//! # Responsibility
//! - Turn the ordered non-abstain label history of one item into a
//!   `Consensus` outcome.
//!
//! # Invariants
//! - Resolution is a pure function of the label history.
//! - Ties are never broken automatically.

pub mod resolver;

pub use resolver::{resolve, MIN_LABELS_FOR_CONSENSUS};
