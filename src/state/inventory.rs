use std::collections::HashMap;
use std::sync::Arc;

use super::{push, PendingWrite};
use crate::model::{
    low_stock, subcategory_options, total_on_hand, InventoryCategory, InventoryField,
    InventoryInput, InventoryItem,
};
use crate::repository::{InventoryRepository, Record, RepositoryError};

/// Category, subcategory and free-text filters for the inventory list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryFilter {
    pub search: String,
    pub category: Option<InventoryCategory>,
    pub subcategory: Option<String>,
}

impl InventoryFilter {
    /// Change the category, dropping a subcategory that does not belong to it.
    pub fn set_category(&mut self, category: Option<InventoryCategory>) {
        self.category = category;
        let keep = match (category, self.subcategory.as_deref()) {
            (Some(category), Some(sub)) => category.subcategories().contains(&sub),
            _ => false,
        };
        if !keep {
            self.subcategory = None;
        }
    }

    pub fn matches(&self, item: &InventoryItem) -> bool {
        if self.category.is_some() && item.category != self.category {
            return false;
        }
        if let Some(sub) = self.subcategory.as_deref() {
            if item.subcategory.as_deref() != Some(sub) {
                return false;
            }
        }
        let term = self.search.trim().to_lowercase();
        if term.is_empty() {
            return true;
        }
        format!("{} {} {}", item.name, item.sku, item.shelf)
            .to_lowercase()
            .contains(&term)
    }
}

/// Inventory list with per-item edit buffers and a new-item draft.
///
/// Full writes (`save_item`, `add_item`, `delete_item`) reload the list afterwards;
/// `set_on_hand` is optimistic and pushed in the background.
#[derive(Debug)]
pub struct InventoryBoard {
    repo: Arc<InventoryRepository>,
    items: Vec<InventoryItem>,
    edits: HashMap<String, InventoryInput>,
    new_item: InventoryInput,
    filter: InventoryFilter,
    show_scanner: bool,
    error: Option<String>,
}

impl InventoryBoard {
    pub fn new(repo: Arc<InventoryRepository>) -> Self {
        Self {
            repo,
            items: Vec::new(),
            edits: HashMap::new(),
            new_item: InventoryInput::default(),
            filter: InventoryFilter::default(),
            show_scanner: false,
            error: None,
        }
    }

    pub fn repository(&self) -> &Arc<InventoryRepository> {
        &self.repo
    }

    pub fn load(&mut self) {
        self.error = None;
        self.items = self.repo.list();
        self.edits = self
            .items
            .iter()
            .map(|item| (item.id.clone(), InventoryInput::from(item)))
            .collect();
        log::debug!("Loaded {} inventory items", self.items.len());
    }

    pub fn items(&self) -> &[InventoryItem] {
        &self.items
    }

    pub fn filter(&self) -> &InventoryFilter {
        &self.filter
    }

    pub fn filter_mut(&mut self) -> &mut InventoryFilter {
        &mut self.filter
    }

    pub fn filtered(&self) -> Vec<&InventoryItem> {
        self.items
            .iter()
            .filter(|item| self.filter.matches(item))
            .collect()
    }

    pub fn low_stock(&self) -> Vec<&InventoryItem> {
        low_stock(&self.items)
    }

    pub fn total_on_hand(&self) -> i64 {
        total_on_hand(&self.items)
    }

    /// Last write error, cleared by the next load or write.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn toggle_scanner(&mut self) {
        self.show_scanner = !self.show_scanner;
    }

    pub fn is_scanner_open(&self) -> bool {
        self.show_scanner
    }

    /// A barcode was read: it becomes the new item's SKU.
    pub fn on_scan(&mut self, value: &str) {
        self.new_item.sku = value.trim().to_string();
        self.show_scanner = false;
    }

    pub fn new_item(&self) -> &InventoryInput {
        &self.new_item
    }

    pub fn new_item_mut(&mut self) -> &mut InventoryInput {
        &mut self.new_item
    }

    pub fn edit(&self, id: &str) -> Option<&InventoryInput> {
        self.edits.get(id)
    }

    /// Apply `f` to the edit buffer for `id`. Returns false for unknown ids.
    pub fn update_edit<F>(&mut self, id: &str, f: F) -> bool
    where
        F: FnOnce(&mut InventoryInput),
    {
        match self.edits.get_mut(id) {
            Some(edit) => {
                f(edit);
                true
            }
            None => false,
        }
    }

    pub fn set_edit_category(&mut self, id: &str, category: Option<InventoryCategory>) -> bool {
        self.update_edit(id, |edit| {
            edit.category = category;
            edit.subcategory = None;
        })
    }

    /// Subcategory choices for the buffer's current category.
    pub fn subcategory_options(&self, id: &str) -> Vec<&'static str> {
        subcategory_options(self.edits.get(id).and_then(|edit| edit.category))
    }

    fn record_error(&mut self, err: RepositoryError) -> RepositoryError {
        self.error = Some(err.message().to_string());
        err
    }

    /// Write the edit buffer for `id`, then reload.
    pub fn save_item(&mut self, id: &str) -> Result<InventoryItem, RepositoryError> {
        self.error = None;
        let Some(edit) = self.edits.get(id).cloned() else {
            return Err(self.record_error(RepositoryError::Validation(format!(
                "No inventory item with id {id}."
            ))));
        };
        match self.repo.upsert(&edit) {
            Ok(saved) => {
                self.load();
                Ok(saved)
            }
            Err(e) => Err(self.record_error(e)),
        }
    }

    /// Create the new-item draft, reset it, then reload.
    pub fn add_item(&mut self) -> Result<InventoryItem, RepositoryError> {
        if let Err(msg) = InventoryItem::validate(&self.new_item) {
            return Err(self.record_error(RepositoryError::Validation(msg)));
        }
        self.error = None;
        let input = InventoryInput {
            id: None,
            ..self.new_item.clone()
        };
        match self.repo.upsert(&input) {
            Ok(saved) => {
                self.new_item = InventoryInput::default();
                self.load();
                Ok(saved)
            }
            Err(e) => Err(self.record_error(e)),
        }
    }

    pub fn delete_item(&mut self, id: &str) -> Result<(), RepositoryError> {
        self.error = None;
        match self.repo.delete(id) {
            Ok(()) => {
                self.load();
                Ok(())
            }
            Err(e) => Err(self.record_error(e)),
        }
    }

    /// Optimistic count change, pushed in the background.
    pub fn set_on_hand(&mut self, id: &str, on_hand: i64) -> Option<PendingWrite> {
        let item = self.items.iter_mut().find(|item| item.id == id)?;
        item.on_hand = on_hand;
        if let Some(edit) = self.edits.get_mut(id) {
            edit.on_hand = on_hand;
        }
        Some(push(&self.repo, id, InventoryField::OnHand(on_hand)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::StorageAdapter;
    use crate::storage::MemoryStorage;

    fn board() -> InventoryBoard {
        let repo = InventoryRepository::new(
            StorageAdapter::unavailable(),
            Arc::new(MemoryStorage::new()),
        );
        InventoryBoard::new(Arc::new(repo))
    }

    fn stock(board: &mut InventoryBoard, name: &str, sku: &str, category: Option<InventoryCategory>) {
        let draft = board.new_item_mut();
        draft.name = name.to_string();
        draft.sku = sku.to_string();
        draft.shelf = "Back bar".to_string();
        draft.category = category;
        board.add_item().unwrap();
    }

    #[test]
    fn test_add_item_validates() {
        let mut board = board();
        board.new_item_mut().name = "Campari".to_string();
        let err = board.add_item().unwrap_err();
        assert_eq!(err.message(), "Name, SKU, and shelf are required.");
        assert_eq!(board.error(), Some("Name, SKU, and shelf are required."));
        assert!(board.items().is_empty());
    }

    #[test]
    fn test_add_item_resets_draft_and_reloads() {
        let mut board = board();
        stock(&mut board, "Campari", "CMP-1", Some(InventoryCategory::Liquor));
        assert_eq!(board.items().len(), 1);
        assert_eq!(board.new_item(), &InventoryInput::default());
        assert!(board.edit(&board.items()[0].id).is_some());
        assert_eq!(board.error(), None);
    }

    #[test]
    fn test_scan_fills_sku_and_closes_scanner() {
        let mut board = board();
        board.toggle_scanner();
        assert!(board.is_scanner_open());
        board.on_scan(" 0123456789012 ");
        assert_eq!(board.new_item().sku, "0123456789012");
        assert!(!board.is_scanner_open());
    }

    #[test]
    fn test_edit_category_clears_subcategory() {
        let mut board = board();
        stock(&mut board, "Lagavulin 16", "LAG-16", Some(InventoryCategory::Liquor));
        let id = board.items()[0].id.clone();

        board.update_edit(&id, |edit| edit.subcategory = Some("Whiskey - Scotch".to_string()));
        assert!(board.set_edit_category(&id, Some(InventoryCategory::Wine)));
        assert_eq!(board.edit(&id).unwrap().subcategory, None);
        assert_eq!(board.subcategory_options(&id).len(), 7);
        assert!(!board.set_edit_category("missing", None));
    }

    #[test]
    fn test_save_item_writes_buffer() {
        let mut board = board();
        stock(&mut board, "Cocchi Americano", "COC-1", None);
        let id = board.items()[0].id.clone();

        board.update_edit(&id, |edit| edit.reorder_point = 4);
        let saved = board.save_item(&id).unwrap();
        assert_eq!(saved.id, id);
        assert_eq!(board.items()[0].reorder_point, 4);
        assert_eq!(board.low_stock().len(), 1);
    }

    #[test]
    fn test_save_unknown_item_sets_error() {
        let mut board = board();
        assert!(board.save_item("ghost").is_err());
        assert!(board.error().is_some());
    }

    #[test]
    fn test_filters() {
        let mut board = board();
        stock(&mut board, "Sancerre", "SAN-1", Some(InventoryCategory::Wine));
        stock(&mut board, "Pilsner", "PIL-1", Some(InventoryCategory::Beer));
        stock(&mut board, "Rittenhouse", "RIT-1", Some(InventoryCategory::Liquor));
        let rye = board.items().iter().find(|i| i.name == "Rittenhouse").unwrap().id.clone();
        board.update_edit(&rye, |edit| edit.subcategory = Some("Whiskey - Rye".to_string()));
        board.save_item(&rye).unwrap();

        board.filter_mut().set_category(Some(InventoryCategory::Liquor));
        assert_eq!(board.filtered().len(), 1);

        board.filter_mut().subcategory = Some("Whiskey - Rye".to_string());
        assert_eq!(board.filtered().len(), 1);
        board.filter_mut().set_category(Some(InventoryCategory::Wine));
        assert_eq!(board.filter().subcategory, None);

        board.filter_mut().set_category(None);
        board.filter_mut().search = "pil".to_string();
        let names: Vec<_> = board.filtered().into_iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["Pilsner"]);
    }

    #[test]
    fn test_set_on_hand_is_optimistic_and_pushed() {
        let mut board = board();
        stock(&mut board, "Aperol", "APE-1", None);
        let id = board.items()[0].id.clone();

        let pending = board.set_on_hand(&id, 9).unwrap();
        assert_eq!(board.items()[0].on_hand, 9);
        assert_eq!(board.total_on_hand(), 9);
        assert!(pending.wait());

        board.load();
        assert_eq!(board.items()[0].on_hand, 9);
        assert!(board.set_on_hand("missing", 1).is_none());
    }

    #[test]
    fn test_delete_item_reloads() {
        let mut board = board();
        stock(&mut board, "Fernet", "FER-1", None);
        let id = board.items()[0].id.clone();
        board.delete_item(&id).unwrap();
        assert!(board.items().is_empty());
        board.delete_item(&id).unwrap();
    }
}
