use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const WINE_SUBCATEGORIES: &[&str] = &[
    "Sparkling",
    "Orange/Skin",
    "Rose",
    "Red",
    "White",
    "Dessert",
    "Fortified",
];

const BEER_SUBCATEGORIES: &[&str] = &[];

const LIQUOR_SUBCATEGORIES: &[&str] = &[
    "Whiskey - Bourbon",
    "Whiskey - Rye",
    "Whiskey - Scotch",
    "Whiskey - Irish",
    "Whiskey - Japanese",
    "Brandy - Cognac",
    "Brandy - Armagnac",
    "Rum - White",
    "Rum - Dark",
    "Rum - Aged",
    "Gin",
    "Vodka",
    "Tequila - Blanco",
    "Tequila - Reposado",
    "Tequila - Anejo",
    "Mezcal",
    "Liqueur / Cordial",
];

/// Top-level shelf category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InventoryCategory {
    Wine,
    Beer,
    Liquor,
}

impl InventoryCategory {
    pub const ALL: [InventoryCategory; 3] = [
        InventoryCategory::Wine,
        InventoryCategory::Beer,
        InventoryCategory::Liquor,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryCategory::Wine => "Wine",
            InventoryCategory::Beer => "Beer",
            InventoryCategory::Liquor => "Liquor",
        }
    }

    /// Subcategories offered for this category.
    ///
    /// The repository does not enforce this table; it only drives edit forms.
    pub fn subcategories(&self) -> &'static [&'static str] {
        match self {
            InventoryCategory::Wine => WINE_SUBCATEGORIES,
            InventoryCategory::Beer => BEER_SUBCATEGORIES,
            InventoryCategory::Liquor => LIQUOR_SUBCATEGORIES,
        }
    }
}

impl fmt::Display for InventoryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InventoryCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "Wine" => Ok(InventoryCategory::Wine),
            "Beer" => Ok(InventoryCategory::Beer),
            "Liquor" => Ok(InventoryCategory::Liquor),
            other => Err(format!("Unknown inventory category: {other}")),
        }
    }
}

/// Subcategory choices for an optional category; every subcategory when unset.
pub fn subcategory_options(category: Option<InventoryCategory>) -> Vec<&'static str> {
    match category {
        Some(category) => category.subcategories().to_vec(),
        None => InventoryCategory::ALL
            .iter()
            .flat_map(|c| c.subcategories().iter().copied())
            .collect(),
    }
}

/// A counted item on a shelf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    pub sku: String,
    pub shelf: String,
    #[serde(default)]
    pub on_hand: i64,
    #[serde(default)]
    pub reorder_point: i64,
    /// Stamped by the repository on every write.
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category: Option<InventoryCategory>,
    #[serde(default)]
    pub subcategory: Option<String>,
}

impl InventoryItem {
    pub fn is_low_stock(&self) -> bool {
        self.on_hand <= self.reorder_point
    }
}

/// Items at or below their reorder point.
pub fn low_stock(items: &[InventoryItem]) -> Vec<&InventoryItem> {
    items.iter().filter(|item| item.is_low_stock()).collect()
}

/// Sum of on-hand counts, saturating at the `i64` bounds.
pub fn total_on_hand(items: &[InventoryItem]) -> i64 {
    items
        .iter()
        .fold(0i64, |total, item| total.saturating_add(item.on_hand))
}

/// Caller-supplied fields for creating or replacing an inventory item.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventoryInput {
    pub id: Option<String>,
    pub name: String,
    pub sku: String,
    pub shelf: String,
    pub on_hand: i64,
    pub reorder_point: i64,
    pub category: Option<InventoryCategory>,
    pub subcategory: Option<String>,
}

impl InventoryInput {
    pub fn new(name: impl Into<String>, sku: impl Into<String>, shelf: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sku: sku.into(),
            shelf: shelf.into(),
            ..Self::default()
        }
    }
}

impl From<&InventoryItem> for InventoryInput {
    fn from(item: &InventoryItem) -> Self {
        Self {
            id: Some(item.id.clone()).filter(|id| !id.is_empty()),
            name: item.name.clone(),
            sku: item.sku.clone(),
            shelf: item.shelf.clone(),
            on_hand: item.on_hand,
            reorder_point: item.reorder_point,
            category: item.category,
            subcategory: item.subcategory.clone(),
        }
    }
}

/// Single-field updates for inventory items.
#[derive(Debug, Clone, PartialEq)]
pub enum InventoryField {
    OnHand(i64),
    ReorderPoint(i64),
    Shelf(String),
}
