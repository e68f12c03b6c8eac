//! Core domain logic for FutureEmo.
//! This crate is the single source of truth for consensus and agreement
//! invariants.

pub mod access;
pub mod config;
pub mod consensus;
pub mod db;
pub mod export;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod stats;

pub use access::{AccessError, AdminGuard};
pub use config::{ConfigError, ConfigOverrides, EngineConfig};
pub use consensus::resolve;
pub use db::{open_db, open_db_in_memory, DbError};
pub use export::{export_labels_csv, ExportError};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::category::{Category, LabelValue};
pub use model::item::{Consensus, Item, ItemId, ItemStatus};
pub use model::label::Label;
pub use repo::item_repo::{ItemListQuery, ItemRepository, SqliteItemRepository};
pub use repo::label_repo::{LabelRepository, SqliteLabelRepository};
pub use repo::{RepoError, RepoResult};
pub use service::item_service::{AdminOverride, ItemService, ItemServiceError};
pub use service::label_service::{
    LabelService, LabelServiceError, SubmissionReceipt, SubmitLabelRequest,
};
pub use service::review_service::{ItemDetail, ReviewService, ReviewServiceError};
pub use service::validation::ValidationError;
pub use stats::annotator::AnnotatorStats;
pub use stats::corpus::{CorpusReliability, KappaBand};
pub use stats::item_agreement::ItemAgreement;
pub use stats::overview::OverviewStats;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
