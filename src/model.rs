//! Domain records for the catalog.
//!
//! These are the shapes the rest of the crate and its callers work with. Wire rows
//! (remote column names, nullable columns) live next to the field mapping in
//! [`crate::repository`]; nothing outside that module sees them.

mod drink;
mod inventory;

pub use drink::{Drink, DrinkField, DrinkInput, DrinkKind, ImageRef, UnknownDrinkKind};
pub use inventory::{
    low_stock, subcategory_options, total_on_hand, InventoryCategory, InventoryField,
    InventoryInput, InventoryItem,
};
