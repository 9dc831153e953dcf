//! Repository Layer
//!
//! Storage implementations behind the `dw_common` store traits. Exactly one
//! backend is chosen at startup and injected into the services.

pub mod file;
pub mod guarded;
pub mod memory;
pub mod mongo;

use std::sync::Arc;

use dw_common::{DashboardStore, StoreResult, SubscriptionStore};
use dw_config::{StorageBackend, StorageConfig};
use serde::de::DeserializeOwned;
use tracing::{info, warn};

pub use file::FileStore;
pub use guarded::GuardedSubscriptionStore;
pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// The two store handles a backend provides
#[derive(Clone)]
pub struct Stores {
    pub subscriptions: Arc<dyn SubscriptionStore>,
    pub dashboards: Arc<dyn DashboardStore>,
}

impl Stores {
    pub fn from_shared<S>(store: Arc<S>) -> Self
    where
        S: SubscriptionStore + DashboardStore + 'static,
    {
        Self {
            subscriptions: store.clone(),
            dashboards: store,
        }
    }

    pub async fn open(config: &StorageConfig) -> StoreResult<Self> {
        info!(backend = ?config.backend, "Opening storage backend");
        let stores = match config.backend {
            StorageBackend::Memory => Self::from_shared(Arc::new(MemoryStore::new())),
            StorageBackend::File => {
                Self::from_shared(Arc::new(FileStore::open(&config.data_dir).await?))
            }
            StorageBackend::Mongo => Self::from_shared(Arc::new(
                MongoStore::connect(&config.mongo_url, &config.mongo_db).await?,
            )),
        };
        Ok(stores)
    }
}

/// Decode raw records one at a time, skipping (and logging) any that no
/// longer match the current schema.
pub(crate) fn decode_records<T: DeserializeOwned>(
    values: Vec<serde_json::Value>,
    source: &str,
) -> Vec<T> {
    values
        .into_iter()
        .filter_map(|value| {
            let id = value.get("id").cloned().unwrap_or_default();
            match serde_json::from_value(value) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(source = %source, id = %id, error = %e, "Skipping stored record that cannot be decoded");
                    None
                }
            }
        })
        .collect()
}
