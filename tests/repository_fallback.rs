//! Repository behaviour across remote availability, outages and restarts.

use std::sync::Arc;

use barback::codec::{self, Ingredient, Unit};
use barback::model::{DrinkField, InventoryField};
use barback::storage::LOCAL_ID_PREFIX;
use barback::{
    DrinkInput, DrinkKind, DrinkRepository, FileStorage, InventoryInput, InventoryRepository,
    KeyValueStorage, MemoryRemote, MemoryStorage, StorageAdapter,
};
use fake::faker::lorem::en::Word;
use fake::Fake;

fn daiquiri() -> DrinkInput {
    DrinkInput::new("Daiquiri", DrinkKind::Cocktail).with_ingredients(vec![
        Ingredient::new("2", Unit::Oz, "white rum"),
        Ingredient::new("1", Unit::Oz, "lime juice"),
        Ingredient::new("0.75", Unit::Oz, "simple syrup"),
    ])
}

#[test]
fn daiquiri_round_trips_through_remote() {
    let remote = Arc::new(MemoryRemote::new());
    let repo = DrinkRepository::new(
        StorageAdapter::new(remote.clone()),
        Arc::new(MemoryStorage::new()),
    );

    let saved = repo.upsert(&daiquiri()).unwrap();
    assert_eq!(
        saved.specs,
        vec!["2 oz white rum", "1 oz lime juice", "0.75 oz simple syrup"]
    );

    let listed = repo.list();
    assert_eq!(listed.len(), 1);
    assert_eq!(codec::parse(&listed[0].specs), daiquiri().ingredients);
    assert_eq!(remote.rows("drink_specs").len(), 1);
}

#[test]
fn shandy_lands_locally_without_remote() {
    let repo = DrinkRepository::new(StorageAdapter::unavailable(), Arc::new(MemoryStorage::new()));

    repo.upsert(
        &DrinkInput::new("Shandy", DrinkKind::Mocktail)
            .with_ingredients(vec![Ingredient::top_up("lemonade")]),
    )
    .unwrap();

    let listed = repo.list();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "Shandy");
    assert!(listed[0].id.starts_with(LOCAL_ID_PREFIX));
    assert_eq!(listed[0].specs, vec!["top up lemonade"]);
}

#[test]
fn every_operation_survives_a_failing_remote() {
    let remote = Arc::new(MemoryRemote::new());
    remote.set_failing(true);
    let repo = InventoryRepository::new(
        StorageAdapter::new(remote.clone()),
        Arc::new(MemoryStorage::new()),
    );

    let names: Vec<String> = (0..3).map(|i| format!("{} {}", Word().fake::<String>(), i)).collect();
    let mut ids = Vec::new();
    for (i, name) in names.iter().enumerate() {
        let saved = repo
            .upsert(&InventoryInput::new(name.as_str(), format!("SKU-{i}"), "Well"))
            .unwrap();
        assert!(!saved.id.is_empty());
        ids.push(saved.id);
    }
    assert_eq!(repo.list().len(), 3);

    repo.update_field(&ids[0], &InventoryField::Shelf("Speed rail".to_string()))
        .unwrap();
    let moved = repo.list().into_iter().find(|i| i.id == ids[0]).unwrap();
    assert_eq!(moved.shelf, "Speed rail");

    repo.delete(&ids[1]).unwrap();
    assert_eq!(repo.list().len(), 2);
    assert!(remote.rows("inventory_items").is_empty());
}

#[test]
fn upsert_with_returned_id_updates_in_place() {
    let repo = DrinkRepository::new(
        StorageAdapter::new(Arc::new(MemoryRemote::new())),
        Arc::new(MemoryStorage::new()),
    );
    let saved = repo.upsert(&daiquiri()).unwrap();

    let mut again = DrinkInput::from(&saved);
    again.garnish = "Lime wheel".to_string();
    let updated = repo.upsert(&again).unwrap();

    assert_eq!(updated.id, saved.id);
    let listed = repo.list();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].garnish, "Lime wheel");
}

#[test]
fn deleting_unknown_id_changes_nothing() {
    let storage = Arc::new(MemoryStorage::new());
    let repo = DrinkRepository::new(StorageAdapter::unavailable(), storage.clone());
    repo.upsert(&daiquiri()).unwrap();
    let before = storage.get_item("drink-specs-local").unwrap();

    repo.delete("local-0-zzzzzz").unwrap();
    assert_eq!(storage.get_item("drink-specs-local").unwrap(), before);
}

#[test]
fn file_storage_keeps_local_records_across_restarts() {
    let dir = tempfile::tempdir().unwrap();

    let saved = {
        let storage = Arc::new(FileStorage::open(dir.path()).unwrap());
        let repo = DrinkRepository::new(StorageAdapter::unavailable(), storage);
        let saved = repo.upsert(&daiquiri()).unwrap();
        repo.update_field(&saved.id, &DrinkField::Available(false)).unwrap();
        saved
    };

    let storage = Arc::new(FileStorage::open(dir.path()).unwrap());
    let repo = DrinkRepository::new(StorageAdapter::unavailable(), storage);
    let listed = repo.list();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, saved.id);
    assert!(!listed[0].available);
}
