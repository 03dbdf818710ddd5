use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::model::{Drink, ImageRef};
use crate::storage::KeyValueStorage;

/// Storage key of the persisted image cache.
pub const IMAGE_CACHE_KEY: &str = "drink-spec-images";

/// Identity an overlay entry is stored under.
///
/// The record id when there is one, otherwise `<kind>-<name>` so that records that have
/// not been saved yet still get a stable slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OverlayKey(String);

impl OverlayKey {
    pub fn for_drink(drink: &Drink) -> Self {
        if drink.id.is_empty() {
            Self(format!("{}-{}", drink.kind, drink.name))
        } else {
            Self(drink.id.clone())
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for OverlayKey {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for OverlayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A locally known image and when it was set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedImage {
    pub image: ImageRef,
    pub set_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct ImageCache {
    #[serde(default)]
    fetched_at: Option<DateTime<Utc>>,
    #[serde(default)]
    entries: HashMap<OverlayKey, CachedImage>,
}

/// Availability and image overlays for drinks.
///
/// Availability is rebuilt from the records on every [`Overlay::merge`]. Images survive
/// restarts through the cache at [`IMAGE_CACHE_KEY`]; an entry set after the last fetch is
/// treated as ahead of the server and kept over the record's own image.
pub struct Overlay {
    storage: Arc<dyn KeyValueStorage>,
    availability: HashMap<OverlayKey, bool>,
    images: HashMap<OverlayKey, CachedImage>,
    last_fetch: Option<DateTime<Utc>>,
}

impl fmt::Debug for Overlay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Overlay")
            .field("availability", &self.availability)
            .field("images", &self.images.len())
            .field("last_fetch", &self.last_fetch)
            .finish()
    }
}

impl Overlay {
    /// Empty overlay seeded with whatever image cache `storage` holds.
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        let cache = Self::read_cache(storage.as_ref());
        Self {
            storage,
            availability: HashMap::new(),
            images: cache.entries,
            last_fetch: cache.fetched_at,
        }
    }

    fn read_cache(storage: &dyn KeyValueStorage) -> ImageCache {
        match storage.get_item(IMAGE_CACHE_KEY) {
            Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                log::warn!("Failed to load stored images: {}", e);
                ImageCache::default()
            }),
            Ok(None) => ImageCache::default(),
            Err(e) => {
                log::warn!("Failed to load stored images: {}", e);
                ImageCache::default()
            }
        }
    }

    fn persist_images(&self) {
        let cache = ImageCache {
            fetched_at: self.last_fetch,
            entries: self.images.clone(),
        };
        let result = serde_json::to_string(&cache)
            .map_err(|e| e.to_string())
            .and_then(|raw| {
                self.storage
                    .set_item(IMAGE_CACHE_KEY, &raw)
                    .map_err(|e| e.to_string())
            });
        if let Err(e) = result {
            log::warn!("Failed to persist images: {}", e);
        }
    }

    pub fn last_fetch(&self) -> Option<DateTime<Utc>> {
        self.last_fetch
    }

    /// Fold a fresh `list()` result into the overlay.
    pub fn merge(&mut self, records: &[Drink], fetched_at: DateTime<Utc>) {
        self.availability = records
            .iter()
            .map(|drink| (OverlayKey::for_drink(drink), drink.available))
            .collect();

        for drink in records {
            let Some(image) = &drink.image else {
                continue;
            };
            let key = OverlayKey::for_drink(drink);
            let local_is_ahead = match (self.images.get(&key), self.last_fetch) {
                (Some(_), None) => true,
                (Some(cached), Some(last)) => cached.set_at > last,
                (None, _) => false,
            };
            if !local_is_ahead {
                self.images.insert(
                    key,
                    CachedImage {
                        image: image.clone(),
                        set_at: fetched_at,
                    },
                );
            }
        }

        self.last_fetch = Some(fetched_at);
        self.persist_images();
    }

    /// Overlay availability; unknown keys are available.
    pub fn is_available(&self, key: &OverlayKey) -> bool {
        self.availability.get(key).copied().unwrap_or(true)
    }

    pub fn set_available(&mut self, key: OverlayKey, available: bool) {
        self.availability.insert(key, available);
    }

    /// Flip availability and return the new value.
    pub fn toggle_available(&mut self, key: &OverlayKey) -> bool {
        let next = !self.is_available(key);
        self.availability.insert(key.clone(), next);
        next
    }

    pub fn image(&self, key: &OverlayKey) -> Option<&ImageRef> {
        self.images.get(key).map(|cached| &cached.image)
    }

    pub fn set_image(&mut self, key: OverlayKey, image: ImageRef, now: DateTime<Utc>) {
        self.images.insert(key, CachedImage { image, set_at: now });
        self.persist_images();
    }

    pub fn remove_image(&mut self, key: &OverlayKey) {
        if self.images.remove(key).is_some() {
            self.persist_images();
        }
    }

    /// Drop every overlay entry for `key`.
    pub fn forget(&mut self, key: &OverlayKey) {
        self.availability.remove(key);
        self.remove_image(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DrinkKind;
    use crate::storage::MemoryStorage;
    use chrono::Duration;

    fn drink(id: &str, name: &str, available: bool, image: Option<&str>) -> Drink {
        Drink {
            id: id.to_string(),
            name: name.to_string(),
            kind: DrinkKind::Cocktail,
            build: String::new(),
            glass: String::new(),
            garnish: String::new(),
            specs: Vec::new(),
            available,
            image: image.map(ImageRef::new),
        }
    }

    #[test]
    fn test_key_falls_back_to_kind_and_name() {
        assert_eq!(OverlayKey::for_drink(&drink("d1", "Gimlet", true, None)).as_str(), "d1");
        assert_eq!(
            OverlayKey::for_drink(&drink("", "Gimlet", true, None)).as_str(),
            "Cocktail-Gimlet"
        );
    }

    #[test]
    fn test_merge_seeds_availability_from_records() {
        let mut overlay = Overlay::new(Arc::new(MemoryStorage::new()));
        let key = OverlayKey::from("d1");
        overlay.set_available(key.clone(), false);

        overlay.merge(&[drink("d1", "Gimlet", true, None)], Utc::now());
        assert!(overlay.is_available(&key));
        assert!(overlay.is_available(&OverlayKey::from("unknown")));
    }

    #[test]
    fn test_merge_keeps_image_set_after_last_fetch() {
        let mut overlay = Overlay::new(Arc::new(MemoryStorage::new()));
        let t0 = Utc::now();
        let key = OverlayKey::from("d1");

        overlay.merge(&[drink("d1", "Gimlet", true, Some("https://cdn/a.jpg"))], t0);
        overlay.set_image(key.clone(), ImageRef::new("data:image/png;base64,new"), t0 + Duration::seconds(5));

        // Server has not caught up yet.
        overlay.merge(
            &[drink("d1", "Gimlet", true, Some("https://cdn/a.jpg"))],
            t0 + Duration::seconds(10),
        );
        assert_eq!(overlay.image(&key).unwrap().as_str(), "data:image/png;base64,new");

        // Next fetch after that: the local entry is no longer newer than the last fetch.
        overlay.merge(
            &[drink("d1", "Gimlet", true, Some("https://cdn/b.jpg"))],
            t0 + Duration::seconds(20),
        );
        assert_eq!(overlay.image(&key).unwrap().as_str(), "https://cdn/b.jpg");
    }

    #[test]
    fn test_merge_keeps_local_image_when_record_has_none() {
        let mut overlay = Overlay::new(Arc::new(MemoryStorage::new()));
        let key = OverlayKey::from("d1");
        overlay.set_image(key.clone(), ImageRef::new("data:x"), Utc::now());
        overlay.merge(&[drink("d1", "Gimlet", true, None)], Utc::now());
        assert_eq!(overlay.image(&key).map(ImageRef::as_str), Some("data:x"));
    }

    #[test]
    fn test_image_cache_survives_reload() {
        let storage = Arc::new(MemoryStorage::new());
        let key = OverlayKey::from("d1");
        {
            let mut overlay = Overlay::new(storage.clone());
            overlay.set_image(key.clone(), ImageRef::new("data:persisted"), Utc::now());
        }

        let overlay = Overlay::new(storage);
        assert_eq!(overlay.image(&key).map(ImageRef::as_str), Some("data:persisted"));
    }

    #[test]
    fn test_corrupt_cache_is_ignored() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set_item(IMAGE_CACHE_KEY, "not json").unwrap();
        let overlay = Overlay::new(storage);
        assert_eq!(overlay.image(&OverlayKey::from("d1")), None);
    }

    #[test]
    fn test_toggle_and_forget() {
        let storage = Arc::new(MemoryStorage::new());
        let mut overlay = Overlay::new(storage.clone());
        let key = OverlayKey::from("d1");

        assert!(!overlay.toggle_available(&key));
        assert!(overlay.toggle_available(&key));
        overlay.set_available(key.clone(), false);
        overlay.set_image(key.clone(), ImageRef::new("data:x"), Utc::now());

        overlay.forget(&key);
        assert!(overlay.is_available(&key));
        assert_eq!(overlay.image(&key), None);
        assert!(!storage.get_item(IMAGE_CACHE_KEY).unwrap().unwrap().contains("data:x"));
    }
}
