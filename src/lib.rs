//! # Barback
//!
//! Coroutine-native persistence for a bar's drink specs and inventory, built on the `may`
//! runtime. Every read and write tries the remote store first and falls back to durable
//! local storage, so callers always get a usable view.
//!
//! Layers, bottom-up:
//! - [`codec`]: ingredient rows to and from human-readable spec lines
//! - [`adapter`]: entity-shaped access to a row-oriented [`adapter::RemoteStore`]
//! - [`storage`]: key-value backends and the per-collection [`storage::LocalStore`]
//! - [`repository`]: `list`/`upsert`/`delete`/`update_field` with local fallback
//! - [`state`]: optimistic overlays and boards the UI renders from

pub mod adapter;
pub mod codec;
pub mod config;
pub mod metrics;
pub mod model;
pub mod repository;
pub mod state;
pub mod storage;

pub use adapter::{MemoryRemote, RemoteStore, StorageAdapter};
pub use config::CatalogConfig;
pub use model::{Drink, DrinkInput, DrinkKind, InventoryInput, InventoryItem};
pub use repository::{DrinkRepository, InventoryRepository, Repository, RepositoryError};
pub use state::{DrinkBoard, InventoryBoard, PendingWrite};
pub use storage::{open_storage, FileStorage, KeyValueStorage, MemoryStorage};
