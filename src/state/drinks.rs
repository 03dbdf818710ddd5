use chrono::Utc;
use std::collections::HashSet;
use std::sync::Arc;

use super::overlay::{Overlay, OverlayKey};
use super::{push, PendingWrite};
use crate::codec::Ingredient;
use crate::model::{Drink, DrinkField, DrinkInput, DrinkKind, ImageRef};
use crate::repository::{DrinkRepository, RepositoryError};
use crate::storage::KeyValueStorage;

/// Editable form state for creating or changing a drink.
#[derive(Debug, Clone, PartialEq)]
pub struct DrinkDraft {
    pub id: Option<String>,
    pub name: String,
    pub kind: DrinkKind,
    pub build: String,
    pub glass: String,
    pub garnish: String,
    /// Never empty.
    pub ingredients: Vec<Ingredient>,
    pub available: bool,
    pub image: Option<ImageRef>,
}

impl Default for DrinkDraft {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            kind: DrinkKind::default(),
            build: String::new(),
            glass: String::new(),
            garnish: String::new(),
            ingredients: vec![Ingredient::placeholder()],
            available: true,
            image: None,
        }
    }
}

impl DrinkDraft {
    pub fn from_drink(drink: &Drink, available: bool) -> Self {
        Self {
            id: Some(drink.id.clone()).filter(|id| !id.is_empty()),
            name: drink.name.clone(),
            kind: drink.kind,
            build: drink.build.clone(),
            glass: drink.glass.clone(),
            garnish: drink.garnish.clone(),
            ingredients: drink.ingredients(),
            available,
            image: drink.image.clone(),
        }
    }

    pub fn add_ingredient(&mut self) {
        self.ingredients.push(Ingredient::placeholder());
    }

    /// Remove a row; removing the last remaining row blanks it instead.
    pub fn remove_ingredient(&mut self, index: usize) {
        if self.ingredients.len() <= 1 {
            self.ingredients = vec![Ingredient::placeholder()];
        } else if index < self.ingredients.len() {
            self.ingredients.remove(index);
        }
    }

    pub fn to_input(&self) -> DrinkInput {
        DrinkInput {
            id: self.id.clone(),
            name: self.name.clone(),
            kind: self.kind,
            build: self.build.clone(),
            glass: self.glass.clone(),
            garnish: self.garnish.clone(),
            ingredients: self.ingredients.clone(),
            available: Some(self.available),
            image: self.image.clone(),
        }
    }
}

/// One group of the drink list view.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    pub title: &'static str,
    pub kind: DrinkKind,
    pub drinks: Vec<Drink>,
}

/// Drink list with availability/image overlays and a draft editor.
#[derive(Debug)]
pub struct DrinkBoard {
    repo: Arc<DrinkRepository>,
    drinks: Vec<Drink>,
    overlay: Overlay,
    expanded: HashSet<String>,
    search_term: String,
    show_unavailable: bool,
    draft: DrinkDraft,
}

impl DrinkBoard {
    /// `storage` backs the image cache.
    pub fn new(repo: Arc<DrinkRepository>, storage: Arc<dyn KeyValueStorage>) -> Self {
        Self {
            repo,
            drinks: Vec::new(),
            overlay: Overlay::new(storage),
            expanded: HashSet::new(),
            search_term: String::new(),
            show_unavailable: true,
            draft: DrinkDraft::default(),
        }
    }

    pub fn repository(&self) -> &Arc<DrinkRepository> {
        &self.repo
    }

    pub fn load(&mut self) {
        let records = self.repo.list();
        self.overlay.merge(&records, Utc::now());
        log::debug!("Loaded {} drinks", records.len());
        self.drinks = records;
    }

    pub fn drinks(&self) -> &[Drink] {
        &self.drinks
    }

    pub fn overlay(&self) -> &Overlay {
        &self.overlay
    }

    fn find(&self, id: &str) -> Option<&Drink> {
        self.drinks.iter().find(|drink| drink.id == id)
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
    }

    pub fn show_unavailable(&self) -> bool {
        self.show_unavailable
    }

    pub fn set_show_unavailable(&mut self, show: bool) {
        self.show_unavailable = show;
    }

    fn matches(&self, drink: &Drink, term: &str) -> bool {
        if !self.show_unavailable && !self.is_available(drink) {
            return false;
        }
        if term.is_empty() {
            return true;
        }
        let haystack = format!("{} {} {}", drink.name, drink.build, drink.specs.join(" "));
        haystack.to_lowercase().contains(term)
    }

    /// Filtered, name-sorted drinks grouped into Cocktails then Mocktails.
    pub fn sections(&self) -> Vec<Section> {
        let term = self.search_term.trim().to_lowercase();
        let mut visible: Vec<&Drink> = self
            .drinks
            .iter()
            .filter(|drink| self.matches(drink, &term))
            .collect();
        visible.sort_by_cached_key(|drink| drink.name.to_lowercase());

        [(DrinkKind::Cocktail, "Cocktails"), (DrinkKind::Mocktail, "Mocktails")]
            .into_iter()
            .map(|(kind, title)| Section {
                title,
                kind,
                drinks: visible
                    .iter()
                    .filter(|drink| drink.kind == kind)
                    .map(|drink| (*drink).clone())
                    .collect(),
            })
            .collect()
    }

    pub fn is_available(&self, drink: &Drink) -> bool {
        self.overlay.is_available(&OverlayKey::for_drink(drink))
    }

    /// Flip availability in the overlay and push it. `None` when there is nothing to push.
    pub fn toggle_availability(&mut self, id: &str) -> Option<PendingWrite> {
        let key = OverlayKey::for_drink(self.find(id)?);
        let available = self.overlay.toggle_available(&key);
        if id.is_empty() {
            log::debug!("Drink {} has no id yet; availability kept locally", key);
            return None;
        }
        Some(push(&self.repo, id, DrinkField::Available(available)))
    }

    /// The overlay image, falling back to the record's own.
    pub fn image_src<'a>(&'a self, drink: &'a Drink) -> Option<&'a ImageRef> {
        self.overlay
            .image(&OverlayKey::for_drink(drink))
            .or(drink.image.as_ref())
    }

    pub fn set_image(&mut self, id: &str, image: ImageRef) -> Option<PendingWrite> {
        let key = OverlayKey::for_drink(self.find(id)?);
        self.overlay.set_image(key, image.clone(), Utc::now());
        if id.is_empty() {
            return None;
        }
        Some(push(&self.repo, id, DrinkField::Image(image)))
    }

    /// Forget the locally cached image. The record's own image, if any, shows again.
    pub fn remove_image(&mut self, id: &str) {
        if let Some(drink) = self.find(id) {
            let key = OverlayKey::for_drink(drink);
            self.overlay.remove_image(&key);
        }
    }

    pub fn toggle_details(&mut self, id: &str) {
        if !self.expanded.remove(id) {
            self.expanded.insert(id.to_string());
        }
    }

    pub fn is_expanded(&self, id: &str) -> bool {
        self.expanded.contains(id)
    }

    pub fn draft(&self) -> &DrinkDraft {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut DrinkDraft {
        &mut self.draft
    }

    /// Load a drink into the draft. Returns false for unknown ids.
    pub fn start_edit(&mut self, id: &str) -> bool {
        let Some(drink) = self.find(id) else {
            return false;
        };
        let mut draft = DrinkDraft::from_drink(drink, self.is_available(drink));
        draft.image = self.image_src(drink).cloned();
        self.draft = draft;
        true
    }

    pub fn reset_draft(&mut self) {
        self.draft = DrinkDraft::default();
    }

    /// Save the draft and replace any optimistic copy with the stored record.
    pub fn save_draft(&mut self) -> Result<Drink, RepositoryError> {
        let saved = self.repo.upsert(&self.draft.to_input())?;

        if let Some(previous) = self.draft.id.as_deref() {
            self.drinks.retain(|drink| drink.id != previous);
        }
        self.drinks.retain(|drink| drink.id != saved.id);
        self.drinks.push(saved.clone());
        self.overlay
            .set_available(OverlayKey::for_drink(&saved), saved.available);

        self.reset_draft();
        Ok(saved)
    }

    /// Delete a drink. Local state is cleaned up even when the repository reports an error.
    pub fn delete_drink(&mut self, id: &str) -> Result<(), RepositoryError> {
        let result = self.repo.delete(id);
        if let Err(e) = &result {
            log::warn!("Delete failed: {}", e);
        }

        if let Some(index) = self.drinks.iter().position(|drink| drink.id == id) {
            let drink = self.drinks.remove(index);
            self.overlay.forget(&OverlayKey::for_drink(&drink));
        }
        self.expanded.remove(id);
        if self.draft.id.as_deref() == Some(id) {
            self.reset_draft();
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{MemoryRemote, StorageAdapter};
    use crate::codec::Unit;
    use crate::storage::MemoryStorage;

    fn board() -> (Arc<MemoryRemote>, DrinkBoard) {
        let remote = Arc::new(MemoryRemote::new());
        let storage: Arc<dyn KeyValueStorage> = Arc::new(MemoryStorage::new());
        let repo = Arc::new(DrinkRepository::new(
            StorageAdapter::new(remote.clone()),
            storage.clone(),
        ));
        (remote, DrinkBoard::new(repo, storage))
    }

    fn add(board: &DrinkBoard, name: &str, kind: DrinkKind, specs: &[Ingredient]) -> Drink {
        board
            .repository()
            .upsert(&DrinkInput::new(name, kind).with_ingredients(specs.to_vec()))
            .unwrap()
    }

    #[test]
    fn test_draft_keeps_one_row() {
        let mut draft = DrinkDraft::default();
        draft.ingredients[0] = Ingredient::new("2", Unit::Oz, "gin");
        draft.remove_ingredient(0);
        assert_eq!(draft.ingredients, vec![Ingredient::placeholder()]);

        draft.add_ingredient();
        draft.remove_ingredient(1);
        assert_eq!(draft.ingredients.len(), 1);
    }

    #[test]
    fn test_sections_group_sort_and_filter() {
        let (_remote, mut board) = board();
        add(&board, "tom collins", DrinkKind::Cocktail, &[Ingredient::new("2", Unit::Oz, "gin")]);
        add(&board, "Aviation", DrinkKind::Cocktail, &[Ingredient::new("2", Unit::Oz, "gin")]);
        add(&board, "Shirley Temple", DrinkKind::Mocktail, &[Ingredient::top_up("ginger ale")]);
        board.load();

        let sections = board.sections();
        assert_eq!(sections[0].title, "Cocktails");
        let cocktails: Vec<_> = sections[0].drinks.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(cocktails, vec!["Aviation", "tom collins"]);
        assert_eq!(sections[1].drinks.len(), 1);

        board.set_search_term("  GINGER ");
        let sections = board.sections();
        assert!(sections[0].drinks.is_empty());
        assert_eq!(sections[1].drinks[0].name, "Shirley Temple");
    }

    #[test]
    fn test_unavailable_drinks_shown_until_hidden() {
        let (_remote, mut board) = board();
        let saved = add(&board, "Last Word", DrinkKind::Cocktail, &[]);
        board.load();

        board.toggle_availability(&saved.id).unwrap().wait();
        assert_eq!(board.sections()[0].drinks.len(), 1);

        board.set_show_unavailable(false);
        assert!(board.sections()[0].drinks.is_empty());
    }

    #[test]
    fn test_toggle_is_optimistic_even_when_push_fails() {
        let (remote, mut board) = board();
        let saved = add(&board, "Corpse Reviver", DrinkKind::Cocktail, &[]);
        board.load();

        remote.set_failing(true);
        let pending = board.toggle_availability(&saved.id).unwrap();
        assert!(!board.is_available(&board.drinks()[0]));
        // The remote rejected it; the local store took the update and the overlay is unchanged.
        assert!(pending.wait());
        assert!(!board.is_available(&board.drinks()[0]));
        assert_eq!(remote.rows("drink_specs")[0]["available"], serde_json::json!(true));
    }

    #[test]
    fn test_toggle_unknown_id_is_none() {
        let (_remote, mut board) = board();
        assert!(board.toggle_availability("missing").is_none());
    }

    #[test]
    fn test_image_overlay_wins_over_record() {
        let (_remote, mut board) = board();
        let saved = add(&board, "Mai Tai", DrinkKind::Cocktail, &[]);
        board.load();
        assert_eq!(board.image_src(&board.drinks()[0]), None);

        board
            .set_image(&saved.id, ImageRef::new("data:image/jpeg;base64,AAA"))
            .unwrap()
            .wait();
        let drink = board.drinks()[0].clone();
        assert_eq!(board.image_src(&drink).unwrap().as_str(), "data:image/jpeg;base64,AAA");

        board.remove_image(&saved.id);
        assert_eq!(board.image_src(&drink), None);
    }

    #[test]
    fn test_start_edit_and_save_replaces_record() {
        let (remote, mut board) = board();
        let saved = add(
            &board,
            "Gimlet",
            DrinkKind::Cocktail,
            &[Ingredient::new("2", Unit::Oz, "gin"), Ingredient::new("0.75", Unit::Oz, "lime cordial")],
        );
        board.load();

        assert!(board.start_edit(&saved.id));
        assert_eq!(board.draft().ingredients.len(), 2);
        board.draft_mut().garnish = "Lime wheel".to_string();
        board.draft_mut().add_ingredient();

        let updated = board.save_draft().unwrap();
        assert_eq!(updated.id, saved.id);
        assert_eq!(updated.specs, vec!["2 oz gin", "0.75 oz lime cordial"]);
        assert_eq!(board.drinks().len(), 1);
        assert_eq!(board.drinks()[0].garnish, "Lime wheel");
        assert_eq!(board.draft(), &DrinkDraft::default());
        assert_eq!(remote.rows("drink_specs").len(), 1);
    }

    #[test]
    fn test_save_draft_requires_name() {
        let (_remote, mut board) = board();
        let err = board.save_draft().unwrap_err();
        assert_eq!(err, RepositoryError::Validation("Name is required.".to_string()));
        assert!(board.drinks().is_empty());
    }

    #[test]
    fn test_delete_cleans_overlay_and_draft() {
        let (remote, mut board) = board();
        let saved = add(&board, "Bramble", DrinkKind::Cocktail, &[]);
        board.load();
        board.set_image(&saved.id, ImageRef::new("data:x")).unwrap().wait();
        board.toggle_details(&saved.id);
        board.start_edit(&saved.id);

        remote.set_failing(true);
        board.delete_drink(&saved.id).unwrap();

        assert!(board.drinks().is_empty());
        assert!(!board.is_expanded(&saved.id));
        assert_eq!(board.overlay().image(&OverlayKey::from(saved.id.as_str())), None);
        assert_eq!(board.draft(), &DrinkDraft::default());
    }

    #[test]
    fn test_toggle_details() {
        let (_remote, mut board) = board();
        board.toggle_details("d1");
        assert!(board.is_expanded("d1"));
        board.toggle_details("d1");
        assert!(!board.is_expanded("d1"));
    }
}
