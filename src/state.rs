//! Client Reconciliation State
//!
//! Boards hold the canonical records fetched through a [`Repository`] together with
//! identity-keyed overlays (availability, images, expansion, edit buffers). Mutations are
//! applied to the overlay synchronously and pushed to the repository on a `may` coroutine.
//! A failed push is logged and never rolled back: the overlay stays the source of truth
//! for rendering until the next `load()`.
//!
//! Two rapid pushes against the same id are not ordered with respect to each other.

mod drinks;
mod inventory;
mod overlay;

pub use drinks::{DrinkBoard, DrinkDraft, Section};
pub use inventory::{InventoryBoard, InventoryFilter};
pub use overlay::{CachedImage, Overlay, OverlayKey, IMAGE_CACHE_KEY};

use may::coroutine::JoinHandle;
use std::fmt;
use std::sync::Arc;

use crate::repository::{Record, Repository};

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;

/// Handle to an in-flight repository push.
///
/// Dropping it leaves the push running (fire-and-forget); [`PendingWrite::wait`] blocks
/// until it completes.
pub struct PendingWrite {
    handle: JoinHandle<bool>,
}

impl fmt::Debug for PendingWrite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingWrite")
            .field("done", &self.handle.is_done())
            .finish()
    }
}

impl PendingWrite {
    /// Wait for the push. Returns whether the repository accepted it.
    pub fn wait(self) -> bool {
        match self.handle.join() {
            Ok(accepted) => accepted,
            Err(_) => {
                log::error!("Repository push panicked");
                false
            }
        }
    }

    pub fn is_done(&self) -> bool {
        self.handle.is_done()
    }
}

/// Push one field update for `id` without blocking the caller.
///
/// The coroutine runs with the runtime's configured defaults; `may::config()` is left alone.
pub(crate) fn push<E: Record>(repo: &Arc<Repository<E>>, id: &str, field: E::Field) -> PendingWrite {
    let repo = Arc::clone(repo);
    let id = id.to_string();
    let handle = may::go!(move || {
        #[cfg(feature = "tracing")]
        let _span = tracing_helpers::push_span(E::TABLE, &id).entered();

        match repo.update_field(&id, &field) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("{} update for {} failed: {}", E::TABLE, id, e);
                false
            }
        }
    });
    PendingWrite { handle }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::StorageAdapter;
    use crate::model::{Drink, DrinkField, DrinkInput, DrinkKind};
    use crate::storage::MemoryStorage;

    #[test]
    fn test_push_applies_update() {
        let repo: Arc<Repository<Drink>> = Arc::new(Repository::new(
            StorageAdapter::unavailable(),
            Arc::new(MemoryStorage::new()),
        ));
        let saved = repo.upsert(&DrinkInput::new("Sazerac", DrinkKind::Cocktail)).unwrap();

        let pending = push(&repo, &saved.id, DrinkField::Available(false));
        assert!(pending.wait());
        assert!(!repo.list()[0].available);
    }

    #[test]
    fn test_push_leaves_runtime_config_alone() {
        may::config().set_stack_size(0x10000);
        let repo: Arc<Repository<Drink>> = Arc::new(Repository::new(
            StorageAdapter::unavailable(),
            Arc::new(MemoryStorage::new()),
        ));
        let saved = repo.upsert(&DrinkInput::new("Hanky Panky", DrinkKind::Cocktail)).unwrap();

        assert!(push(&repo, &saved.id, DrinkField::Available(false)).wait());
        assert_eq!(may::config().get_stack_size(), 0x10000);
    }

    #[test]
    fn test_push_reports_storage_failure() {
        let storage = Arc::new(MemoryStorage::with_quota(4096));
        let repo: Arc<Repository<Drink>> =
            Arc::new(Repository::new(StorageAdapter::unavailable(), storage));
        let saved = repo.upsert(&DrinkInput::new("Vieux Carre", DrinkKind::Cocktail)).unwrap();

        let huge = crate::model::ImageRef::new(format!("data:image/png;base64,{}", "A".repeat(8192)));
        let pending = push(&repo, &saved.id, DrinkField::Image(huge));
        assert!(!pending.wait());
        assert_eq!(repo.list()[0].image, None);
    }
}
