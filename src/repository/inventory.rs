//! Field mapping for the `inventory_items` table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::cmp::Ordering;

use super::record::Record;
use crate::adapter::{OrderBy, Row};
use crate::model::{InventoryCategory, InventoryField, InventoryInput, InventoryItem};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct InventoryRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    sku: Option<String>,
    #[serde(default)]
    shelf: Option<String>,
    #[serde(default)]
    on_hand: Option<i64>,
    #[serde(default)]
    reorder_point: Option<i64>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    subcategory: Option<String>,
}

impl From<&InventoryItem> for InventoryRow {
    fn from(item: &InventoryItem) -> Self {
        Self {
            id: Some(item.id.clone()).filter(|id| !id.is_empty()),
            name: Some(item.name.clone()),
            sku: Some(item.sku.clone()),
            shelf: Some(item.shelf.clone()),
            on_hand: Some(item.on_hand),
            reorder_point: Some(item.reorder_point),
            updated_at: item.updated_at,
            category: item.category.map(|c| c.as_str().to_string()),
            subcategory: item.subcategory.clone(),
        }
    }
}

fn parse_category(raw: Option<String>) -> Option<InventoryCategory> {
    let raw = raw.filter(|s| !s.trim().is_empty())?;
    match raw.parse() {
        Ok(category) => Some(category),
        Err(e) => {
            log::warn!("{}; treating as unset", e);
            None
        }
    }
}

impl From<InventoryRow> for InventoryItem {
    fn from(row: InventoryRow) -> Self {
        Self {
            id: row.id.unwrap_or_default(),
            name: row.name.unwrap_or_default(),
            sku: row.sku.unwrap_or_default(),
            shelf: row.shelf.unwrap_or_default(),
            on_hand: row.on_hand.unwrap_or(0),
            reorder_point: row.reorder_point.unwrap_or(0),
            updated_at: row.updated_at,
            category: parse_category(row.category),
            subcategory: row.subcategory.filter(|s| !s.is_empty()),
        }
    }
}

fn into_row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

impl Record for InventoryItem {
    type Input = InventoryInput;
    type Field = InventoryField;

    const TABLE: &'static str = "inventory_items";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "sku",
        "shelf",
        "on_hand",
        "reorder_point",
        "updated_at",
        "category",
        "subcategory",
    ];
    const ORDER: OrderBy = OrderBy::desc("updated_at");
    const STORAGE_KEY: &'static str = "inventory-items-local";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn validate(input: &InventoryInput) -> Result<(), String> {
        let missing = |s: &str| s.trim().is_empty();
        if missing(&input.name) || missing(&input.sku) || missing(&input.shelf) {
            return Err("Name, SKU, and shelf are required.".to_string());
        }
        Ok(())
    }

    fn from_input(input: &InventoryInput, now: DateTime<Utc>) -> Self {
        Self {
            id: input.id.clone().unwrap_or_default(),
            name: input.name.trim().to_string(),
            sku: input.sku.trim().to_string(),
            shelf: input.shelf.trim().to_string(),
            on_hand: input.on_hand,
            reorder_point: input.reorder_point,
            updated_at: Some(now),
            category: input.category,
            subcategory: input
                .subcategory
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
        }
    }

    fn to_row(&self) -> Row {
        into_row(serde_json::to_value(InventoryRow::from(self)).unwrap_or(Value::Null))
    }

    fn from_row(row: Row) -> Result<Self, String> {
        serde_json::from_value::<InventoryRow>(Value::Object(row))
            .map(InventoryItem::from)
            .map_err(|e| format!("{}: {}", Self::TABLE, e))
    }

    fn field_patch(field: &InventoryField, now: DateTime<Utc>) -> Row {
        let mut patch = into_row(match field {
            InventoryField::OnHand(count) => json!({ "on_hand": count }),
            InventoryField::ReorderPoint(point) => json!({ "reorder_point": point }),
            InventoryField::Shelf(shelf) => json!({ "shelf": shelf }),
        });
        patch.insert("updated_at".to_string(), json!(now));
        patch
    }

    fn apply_field(&mut self, field: &InventoryField, now: DateTime<Utc>) {
        match field {
            InventoryField::OnHand(count) => self.on_hand = *count,
            InventoryField::ReorderPoint(point) => self.reorder_point = *point,
            InventoryField::Shelf(shelf) => self.shelf = shelf.clone(),
        }
        self.updated_at = Some(now);
    }

    // Most recently updated first; never-stamped items last.
    fn compare(a: &Self, b: &Self) -> Ordering {
        b.updated_at.cmp(&a.updated_at)
    }
}
