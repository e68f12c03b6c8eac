//! Core use-case services.
//!
//! # Responsibility
//! - Validate raw caller input before any state change.
//! - Orchestrate repository calls for label submission, item seeding and
//!   batches, admin overrides, and the read-side agreement statistics.
//! - Keep CLI/transport layers decoupled from storage details.

pub mod item_service;
pub mod label_service;
pub mod review_service;
pub mod validation;
