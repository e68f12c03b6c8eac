//! Label repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Append labels and apply the derived consensus snapshot atomically.
//! - Provide consistent read models for agreement statistics.
//!
//! # Invariants
//! - `append_label` runs in one `IMMEDIATE` transaction: existence check,
//!   duplicate check, insert, history re-read and version-checked item update
//!   either all commit or none do.
//! - The `(item_uuid, annotator_name)` unique index is the final arbiter for
//!   duplicates; a constraint violation maps to `RepoError::DuplicateLabel`.
//! - Abstain labels are stored but never touch `label_count`,
//!   `resolved_label` or `status`.
//! - Each read model below is a single statement, so it observes one
//!   consistent snapshot.

use crate::model::category::Category;
use crate::model::item::{Consensus, Item, ItemId, ItemStatus};
use crate::model::label::Label;
use crate::repo::rows::{
    label_exists, load_item, parse_category, parse_label_row, parse_uuid, substantive_value,
    LABEL_SELECT_SQL,
};
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use crate::stats::annotator::AnnotatorLabel;
use rusqlite::{ffi, params, Connection, ErrorCode, Transaction, TransactionBehavior};

/// Non-abstain label history of one item, in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemHistory {
    pub item_uuid: ItemId,
    pub labels: Vec<Category>,
}

impl AsRef<[Category]> for ItemHistory {
    fn as_ref(&self) -> &[Category] {
        &self.labels
    }
}

/// Repository interface for label operations.
pub trait LabelRepository {
    /// Appends one label and, for substantive values, replaces the item's
    /// consensus snapshot with `resolve(history)`.
    ///
    /// Returns the item as it stands after the write.
    fn append_label<F>(&self, label: &Label, resolve: F) -> RepoResult<Item>
    where
        F: FnOnce(&[Category]) -> Consensus;
    /// All labels in submission order, abstentions included.
    fn list_labels(&self) -> RepoResult<Vec<Label>>;
    /// Non-abstain histories of items with at least `min_labels` of them.
    fn item_histories(&self, min_labels: usize) -> RepoResult<Vec<ItemHistory>>;
    /// Non-abstain labels joined with their item's current consensus.
    fn annotator_labels(&self) -> RepoResult<Vec<AnnotatorLabel>>;
    /// Total stored labels, abstentions included.
    fn count_labels(&self) -> RepoResult<u32>;
}

/// SQLite-backed label repository.
pub struct SqliteLabelRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteLabelRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl LabelRepository for SqliteLabelRepository<'_> {
    fn append_label<F>(&self, label: &Label, resolve: F) -> RepoResult<Item>
    where
        F: FnOnce(&[Category]) -> Consensus,
    {
        let item_id = label.item_uuid;
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;

        let current = load_item(&tx, item_id)?.ok_or(RepoError::ItemNotFound(item_id))?;
        if label_exists(&tx, item_id, &label.annotator_name)? {
            return Err(duplicate(label));
        }

        let inserted = tx.execute(
            "INSERT INTO labels (
                uuid,
                item_uuid,
                annotator_name,
                value,
                submitted_at
            ) VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                label.uuid.to_string(),
                item_id.to_string(),
                label.annotator_name.as_str(),
                label.value.as_str(),
                label.submitted_at,
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(err) if is_unique_violation(&err) => return Err(duplicate(label)),
            Err(err) => return Err(err.into()),
        }

        if label.value.is_skip() {
            tx.commit()?;
            return Ok(current.item);
        }

        let history = load_history(&tx, item_id)?;
        let consensus = resolve(&history);
        let changed = tx.execute(
            "UPDATE items
             SET
                label_count = ?2,
                resolved_label = ?3,
                status = ?4,
                is_override = 0,
                version = version + 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND version = ?5;",
            params![
                item_id.to_string(),
                history.len() as i64,
                consensus.resolved_label().map(|category| category.as_str()),
                consensus.status().as_str(),
                current.version,
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::ConcurrentModification(item_id));
        }

        let updated = load_item(&tx, item_id)?.ok_or(RepoError::ItemNotFound(item_id))?;
        tx.commit()?;
        Ok(updated.item)
    }

    fn list_labels(&self) -> RepoResult<Vec<Label>> {
        let mut stmt = self.conn.prepare(&format!(
            "{LABEL_SELECT_SQL} ORDER BY submitted_at ASC, seq ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut labels = Vec::new();
        while let Some(row) = rows.next()? {
            labels.push(parse_label_row(row)?);
        }
        Ok(labels)
    }

    fn item_histories(&self, min_labels: usize) -> RepoResult<Vec<ItemHistory>> {
        let mut stmt = self.conn.prepare(
            "SELECT item_uuid, value
             FROM labels
             WHERE value <> 'Skip'
             ORDER BY item_uuid ASC, submitted_at ASC, seq ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut histories: Vec<ItemHistory> = Vec::new();
        while let Some(row) = rows.next()? {
            let item_uuid = parse_uuid(&row.get::<_, String>(0)?, "labels.item_uuid")?;
            let value = parse_category(&row.get::<_, String>(1)?, "labels.value")?;
            match histories.last_mut() {
                Some(history) if history.item_uuid == item_uuid => history.labels.push(value),
                _ => histories.push(ItemHistory {
                    item_uuid,
                    labels: vec![value],
                }),
            }
        }
        histories.retain(|history| history.labels.len() >= min_labels);
        Ok(histories)
    }

    fn annotator_labels(&self) -> RepoResult<Vec<AnnotatorLabel>> {
        let mut stmt = self.conn.prepare(
            "SELECT
                l.annotator_name,
                l.value,
                l.submitted_at,
                i.status,
                i.resolved_label
             FROM labels l
             INNER JOIN items i ON i.uuid = l.item_uuid
             WHERE l.value <> 'Skip'
             ORDER BY l.submitted_at ASC, l.seq ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut labels = Vec::new();
        while let Some(row) = rows.next()? {
            let value = parse_category(&row.get::<_, String>(1)?, "labels.value")?;
            let status_text: String = row.get(3)?;
            let status = ItemStatus::parse(&status_text).ok_or_else(|| {
                RepoError::InvalidData(format!("invalid status `{status_text}` in items.status"))
            })?;
            let resolved = match row.get::<_, Option<String>>(4)? {
                Some(value) => Some(parse_category(&value, "items.resolved_label")?),
                None => None,
            };
            let item_consensus = Consensus::from_parts(status, resolved)
                .map_err(|err| RepoError::InvalidData(err.to_string()))?;
            labels.push(AnnotatorLabel {
                annotator_name: row.get(0)?,
                value,
                item_consensus,
                submitted_at: row.get(2)?,
            });
        }
        Ok(labels)
    }

    fn count_labels(&self) -> RepoResult<u32> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM labels;", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn load_history(conn: &Connection, item_id: ItemId) -> RepoResult<Vec<Category>> {
    let mut stmt = conn.prepare(
        "SELECT value
         FROM labels
         WHERE item_uuid = ?1
         ORDER BY submitted_at ASC, seq ASC;",
    )?;
    let mut rows = stmt.query([item_id.to_string()])?;
    let mut history = Vec::new();
    while let Some(row) = rows.next()? {
        if let Some(category) = substantive_value(&row.get::<_, String>(0)?, "labels.value")? {
            history.push(category);
        }
    }
    Ok(history)
}

fn duplicate(label: &Label) -> RepoError {
    RepoError::DuplicateLabel {
        item_uuid: label.item_uuid,
        annotator_name: label.annotator_name.clone(),
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(inner, _)
            if inner.code == ErrorCode::ConstraintViolation
                && inner.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}
