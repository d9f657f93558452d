//! # State
//!
//! Idea snapshots, feedback and the stores that persist them.

pub mod snapshot;
pub mod sqlite;
pub mod store;

pub use snapshot::{Feedback, IdeaSnapshot, IdeaStatus, NEUTRAL_SCORE};
pub use sqlite::SqliteStore;
pub use store::{IdeaStore, InMemoryStore, ListQuery};

use crate::config::{StorageBackend, StorageConfig};
use std::sync::Arc;

/// Open the store selected by configuration.
pub fn open_store(config: &StorageConfig) -> anyhow::Result<Arc<dyn IdeaStore>> {
    let store: Arc<dyn IdeaStore> = match config.backend {
        StorageBackend::Memory => Arc::new(InMemoryStore::new()),
        StorageBackend::Sqlite => Arc::new(SqliteStore::open_at(&config.database_path)?),
    };
    tracing::info!(backend = ?config.backend, "Idea store opened");
    Ok(store)
}
