//! Row decoding and shared queries for the `items` and `labels` tables.

use crate::model::category::{parse_label_value, Category, LabelValue};
use crate::model::item::{Consensus, Item, ItemId, ItemStatus};
use crate::model::label::Label;
use crate::repo::{RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

pub(crate) const ITEM_SELECT_SQL: &str = "SELECT
    uuid,
    text,
    label_count,
    resolved_label,
    status,
    is_override,
    version,
    created_at,
    updated_at
FROM items";

pub(crate) const LABEL_SELECT_SQL: &str = "SELECT
    uuid,
    item_uuid,
    annotator_name,
    value,
    submitted_at
FROM labels";

/// Item row plus its optimistic-concurrency version.
pub(crate) struct VersionedItem {
    pub item: Item,
    pub version: i64,
}

pub(crate) fn parse_item_row(row: &Row<'_>) -> RepoResult<VersionedItem> {
    let uuid = parse_uuid(&row.get::<_, String>("uuid")?, "items.uuid")?;

    let status_text: String = row.get("status")?;
    let status = ItemStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid status `{status_text}` in items.status"))
    })?;

    let resolved_label = match row.get::<_, Option<String>>("resolved_label")? {
        Some(value) => Some(parse_category(&value, "items.resolved_label")?),
        None => None,
    };
    let consensus = Consensus::from_parts(status, resolved_label)
        .map_err(|err| RepoError::InvalidData(format!("item {uuid}: {err}")))?;

    let label_count = row.get::<_, i64>("label_count")?;
    let label_count = u32::try_from(label_count).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid label_count `{label_count}` in items.label_count"
        ))
    })?;

    let is_override = match row.get::<_, i64>("is_override")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_override value `{other}` in items.is_override"
            )));
        }
    };

    Ok(VersionedItem {
        item: Item {
            uuid,
            text: row.get("text")?,
            label_count,
            consensus,
            is_override,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        },
        version: row.get("version")?,
    })
}

pub(crate) fn parse_label_row(row: &Row<'_>) -> RepoResult<Label> {
    let value_text: String = row.get("value")?;
    let value = parse_label_value(&value_text)
        .map_err(|err| RepoError::InvalidData(format!("labels.value: {err}")))?;

    Ok(Label {
        uuid: parse_uuid(&row.get::<_, String>("uuid")?, "labels.uuid")?,
        item_uuid: parse_uuid(&row.get::<_, String>("item_uuid")?, "labels.item_uuid")?,
        annotator_name: row.get("annotator_name")?,
        value,
        submitted_at: row.get("submitted_at")?,
    })
}

pub(crate) fn load_item(conn: &Connection, id: ItemId) -> RepoResult<Option<VersionedItem>> {
    let mut stmt = conn.prepare(&format!("{ITEM_SELECT_SQL} WHERE uuid = ?1;"))?;
    let mut rows = stmt.query([id.to_string()])?;
    if let Some(row) = rows.next()? {
        return Ok(Some(parse_item_row(row)?));
    }
    Ok(None)
}

/// Labels of one item in submission order, abstentions included.
pub(crate) fn load_item_labels(conn: &Connection, id: ItemId) -> RepoResult<Vec<Label>> {
    let mut stmt = conn.prepare(&format!(
        "{LABEL_SELECT_SQL}
         WHERE item_uuid = ?1
         ORDER BY submitted_at ASC, seq ASC;"
    ))?;
    let mut rows = stmt.query([id.to_string()])?;
    let mut labels = Vec::new();
    while let Some(row) = rows.next()? {
        labels.push(parse_label_row(row)?);
    }
    Ok(labels)
}

pub(crate) fn label_exists(conn: &Connection, id: ItemId, annotator_name: &str) -> RepoResult<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM labels WHERE item_uuid = ?1 AND annotator_name = ?2;",
            params![id.to_string(), annotator_name],
            |row| row.get::<_, i64>(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub(crate) fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn parse_category(value: &str, column: &'static str) -> RepoResult<Category> {
    Category::parse(value)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid category `{value}` in {column}")))
}

pub(crate) fn substantive_value(value: &str, column: &'static str) -> RepoResult<Option<Category>> {
    match parse_label_value(value) {
        Ok(LabelValue::Category(category)) => Ok(Some(category)),
        Ok(LabelValue::Skip) => Ok(None),
        Err(_) => Err(RepoError::InvalidData(format!(
            "invalid label value `{value}` in {column}"
        ))),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
