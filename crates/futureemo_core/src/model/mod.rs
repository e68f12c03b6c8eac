//! Domain model for items, labels and the label vocabulary.
//!
//! # Responsibility
//! - Define canonical data structures used by consensus and statistics.
//!
//! # Invariants
//! - Every item and label is identified by a stable UUID.
//! - Item status and resolved label travel together as one `Consensus`.

pub mod category;
pub mod item;
pub mod label;
