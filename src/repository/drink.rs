//! Field mapping for the `drink_specs` table.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::cmp::Ordering;

use super::record::Record;
use crate::adapter::{OrderBy, Row};
use crate::codec;
use crate::model::{Drink, DrinkField, DrinkInput, DrinkKind, ImageRef};

/// `drink_specs` row as sent and received.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DrinkRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    build: Option<String>,
    #[serde(default)]
    glass: Option<String>,
    #[serde(default)]
    garnish: Option<String>,
    #[serde(default)]
    specs: Option<Vec<String>>,
    #[serde(default)]
    available: Option<bool>,
    #[serde(default)]
    image_url: Option<String>,
}

impl From<&Drink> for DrinkRow {
    fn from(drink: &Drink) -> Self {
        Self {
            id: Some(drink.id.clone()).filter(|id| !id.is_empty()),
            name: Some(drink.name.clone()),
            kind: Some(drink.kind.as_str().to_string()),
            build: Some(drink.build.clone()),
            glass: Some(drink.glass.clone()),
            garnish: Some(drink.garnish.clone()),
            specs: Some(drink.specs.clone()),
            available: Some(drink.available),
            image_url: drink.image.as_ref().map(|image| image.0.clone()),
        }
    }
}

fn parse_kind(raw: Option<String>) -> DrinkKind {
    match raw.as_deref().map(str::parse::<DrinkKind>) {
        None => DrinkKind::default(),
        Some(Ok(kind)) => kind,
        Some(Err(e)) => {
            log::warn!("{}; treating as {}", e, DrinkKind::default());
            DrinkKind::default()
        }
    }
}

impl From<DrinkRow> for Drink {
    fn from(row: DrinkRow) -> Self {
        Self {
            id: row.id.unwrap_or_default(),
            name: row.name.unwrap_or_default(),
            kind: parse_kind(row.kind),
            build: row.build.unwrap_or_default(),
            glass: row.glass.unwrap_or_default(),
            garnish: row.garnish.unwrap_or_default(),
            specs: row.specs.unwrap_or_default(),
            available: row.available.unwrap_or(true),
            image: row.image_url.filter(|url| !url.is_empty()).map(ImageRef),
        }
    }
}

fn into_row(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

impl Record for Drink {
    type Input = DrinkInput;
    type Field = DrinkField;

    const TABLE: &'static str = "drink_specs";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "kind",
        "build",
        "glass",
        "garnish",
        "specs",
        "available",
        "image_url",
    ];
    const ORDER: OrderBy = OrderBy::asc("name");
    const STORAGE_KEY: &'static str = "drink-specs-local";

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn validate(input: &DrinkInput) -> Result<(), String> {
        if input.name.trim().is_empty() {
            return Err("Name is required.".to_string());
        }
        Ok(())
    }

    fn from_input(input: &DrinkInput, _now: DateTime<Utc>) -> Self {
        Self {
            id: input.id.clone().unwrap_or_default(),
            name: input.name.trim().to_string(),
            kind: input.kind,
            build: input.build.trim().to_string(),
            glass: input.glass.trim().to_string(),
            garnish: input.garnish.trim().to_string(),
            specs: codec::serialize(&input.ingredients),
            available: input.available.unwrap_or(true),
            image: input.image.clone(),
        }
    }

    fn to_row(&self) -> Row {
        into_row(serde_json::to_value(DrinkRow::from(self)).unwrap_or(Value::Null))
    }

    fn from_row(row: Row) -> Result<Self, String> {
        serde_json::from_value::<DrinkRow>(Value::Object(row))
            .map(Drink::from)
            .map_err(|e| format!("{}: {}", Self::TABLE, e))
    }

    fn field_patch(field: &DrinkField, _now: DateTime<Utc>) -> Row {
        into_row(match field {
            DrinkField::Available(available) => json!({ "available": available }),
            DrinkField::Image(image) => json!({ "image_url": image.as_str() }),
        })
    }

    fn apply_field(&mut self, field: &DrinkField, _now: DateTime<Utc>) {
        match field {
            DrinkField::Available(available) => self.available = *available,
            DrinkField::Image(image) => self.image = Some(image.clone()),
        }
    }

    fn compare(a: &Self, b: &Self) -> Ordering {
        a.name.to_lowercase().cmp(&b.name.to_lowercase())
    }
}
