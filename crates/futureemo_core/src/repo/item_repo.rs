//! Item repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Seed, read and list items.
//! - Provide the flagged admin override write path.
//! - Serve annotator batches and corpus progress counts.
//!
//! # Invariants
//! - Item text is unique; seeding the same text twice inserts it once.
//! - Listing order is newest first: `created_at DESC, rowid DESC`.
//! - Override writes bump `version` so in-flight submissions on the same item
//!   fail their version check instead of overwriting the override.

use crate::model::item::{Consensus, Item, ItemId, ItemStatus};
use crate::model::label::Label;
use crate::repo::rows::{bool_to_int, load_item, load_item_labels, parse_item_row, ITEM_SELECT_SQL};
use crate::repo::{ensure_connection_ready, RepoError, RepoResult};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Transaction, TransactionBehavior};
use serde::{Deserialize, Serialize};

/// Query options for listing items.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemListQuery {
    pub status: Option<ItemStatus>,
    /// Only items whose `label_count` is at least this value.
    pub min_label_count: Option<u32>,
    pub limit: Option<u32>,
    pub offset: u32,
}

/// Outcome of a seeding run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedSummary {
    pub inserted: u32,
    /// Blank texts and texts that already exist.
    pub skipped: u32,
}

/// Item counts grouped by progress and status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ItemCounts {
    pub total: u32,
    pub with_any_label: u32,
    pub with_multiple_labels: u32,
    pub open: u32,
    pub resolved: u32,
    pub needs_review: u32,
}

/// Item together with every label it has received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemSnapshot {
    pub item: Item,
    /// Submission order, abstentions included.
    pub labels: Vec<Label>,
}

/// Repository interface for item operations.
pub trait ItemRepository {
    /// Inserts one fresh item.
    fn create_item(&self, item: &Item) -> RepoResult<ItemId>;
    /// Inserts texts as fresh open items in one transaction.
    fn seed_items(&self, texts: &[String]) -> RepoResult<SeedSummary>;
    fn get_item(&self, id: ItemId) -> RepoResult<Option<Item>>;
    /// Reads one item and its labels from one consistent snapshot.
    fn get_item_snapshot(&self, id: ItemId) -> RepoResult<Option<ItemSnapshot>>;
    fn list_items(&self, query: &ItemListQuery) -> RepoResult<Vec<Item>>;
    /// Open items below `max_label_count` that `annotator_name` has not
    /// labeled, fewest labels first.
    fn next_batch(
        &self,
        annotator_name: &str,
        max_label_count: u32,
        limit: u32,
    ) -> RepoResult<Vec<Item>>;
    /// Writes a consensus directly, bypassing the resolver, and flags it.
    fn override_consensus(&self, id: ItemId, consensus: Consensus) -> RepoResult<Item>;
    fn item_counts(&self) -> RepoResult<ItemCounts>;
}

/// SQLite-backed item repository.
pub struct SqliteItemRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteItemRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl ItemRepository for SqliteItemRepository<'_> {
    fn create_item(&self, item: &Item) -> RepoResult<ItemId> {
        item.validate()?;

        self.conn.execute(
            "INSERT INTO items (
                uuid,
                text,
                label_count,
                resolved_label,
                status,
                is_override
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                item.uuid.to_string(),
                item.text.as_str(),
                i64::from(item.label_count),
                item.resolved_label().map(|label| label.as_str()),
                item.status().as_str(),
                bool_to_int(item.is_override),
            ],
        )?;

        Ok(item.uuid)
    }

    fn seed_items(&self, texts: &[String]) -> RepoResult<SeedSummary> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let mut summary = SeedSummary::default();
        {
            let mut insert = tx.prepare(
                "INSERT INTO items (uuid, text)
                 VALUES (?1, ?2)
                 ON CONFLICT (text) DO NOTHING;",
            )?;
            for text in texts {
                let item = Item::new(text.trim());
                if item.validate().is_err() {
                    summary.skipped += 1;
                    continue;
                }
                let changed = insert.execute(params![item.uuid.to_string(), item.text.as_str()])?;
                if changed == 0 {
                    summary.skipped += 1;
                } else {
                    summary.inserted += 1;
                }
            }
        }
        tx.commit()?;
        Ok(summary)
    }

    fn get_item(&self, id: ItemId) -> RepoResult<Option<Item>> {
        Ok(load_item(self.conn, id)?.map(|versioned| versioned.item))
    }

    fn get_item_snapshot(&self, id: ItemId) -> RepoResult<Option<ItemSnapshot>> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Deferred)?;
        let Some(versioned) = load_item(&tx, id)? else {
            return Ok(None);
        };
        let labels = load_item_labels(&tx, id)?;
        tx.finish()?;
        Ok(Some(ItemSnapshot {
            item: versioned.item,
            labels,
        }))
    }

    fn list_items(&self, query: &ItemListQuery) -> RepoResult<Vec<Item>> {
        let mut sql = format!("{ITEM_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(status) = query.status {
            sql.push_str(" AND status = ?");
            bind_values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(min_label_count) = query.min_label_count {
            sql.push_str(" AND label_count >= ?");
            bind_values.push(Value::Integer(i64::from(min_label_count)));
        }

        sql.push_str(" ORDER BY created_at DESC, rowid DESC");

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(i64::from(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(i64::from(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?.item);
        }
        Ok(items)
    }

    fn next_batch(
        &self,
        annotator_name: &str,
        max_label_count: u32,
        limit: u32,
    ) -> RepoResult<Vec<Item>> {
        let mut stmt = self.conn.prepare(&format!(
            "{ITEM_SELECT_SQL}
             WHERE status = 'open'
               AND label_count < ?1
               AND NOT EXISTS (
                   SELECT 1
                   FROM labels l
                   WHERE l.item_uuid = items.uuid
                     AND l.annotator_name = ?2
               )
             ORDER BY label_count ASC, created_at ASC, rowid ASC
             LIMIT ?3;"
        ))?;
        let mut rows = stmt.query(params![
            i64::from(max_label_count),
            annotator_name,
            i64::from(limit)
        ])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_item_row(row)?.item);
        }
        Ok(items)
    }

    fn override_consensus(&self, id: ItemId, consensus: Consensus) -> RepoResult<Item> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE items
             SET
                resolved_label = ?2,
                status = ?3,
                is_override = 1,
                version = version + 1,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![
                id.to_string(),
                consensus.resolved_label().map(|label| label.as_str()),
                consensus.status().as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::ItemNotFound(id));
        }

        let updated = load_item(&tx, id)?.ok_or(RepoError::ItemNotFound(id))?;
        tx.commit()?;
        Ok(updated.item)
    }

    fn item_counts(&self) -> RepoResult<ItemCounts> {
        let counts = self.conn.query_row(
            "SELECT
                COUNT(*),
                COALESCE(SUM(CASE WHEN label_count >= 1 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN label_count >= 2 THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'open' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'resolved' THEN 1 ELSE 0 END), 0),
                COALESCE(SUM(CASE WHEN status = 'needs_review' THEN 1 ELSE 0 END), 0)
             FROM items;",
            [],
            |row| {
                Ok(ItemCounts {
                    total: row.get(0)?,
                    with_any_label: row.get(1)?,
                    with_multiple_labels: row.get(2)?,
                    open: row.get(3)?,
                    resolved: row.get(4)?,
                    needs_review: row.get(5)?,
                })
            },
        )?;
        Ok(counts)
    }
}
