//! In-process store. Nothing survives a restart.

use async_trait::async_trait;
use dw_common::{
    Dashboard, DashboardStore, StoreError, StoreResult, Subscription, SubscriptionStore,
};
use indexmap::map::Entry;
use indexmap::IndexMap;
use parking_lot::RwLock;

#[derive(Default)]
pub struct MemoryStore {
    subscriptions: RwLock<IndexMap<String, Subscription>>,
    dashboards: RwLock<IndexMap<String, Dashboard>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populated subscriptions, kept in the given order.
    pub fn with_subscriptions(subscriptions: impl IntoIterator<Item = Subscription>) -> Self {
        let store = Self::new();
        {
            let mut map = store.subscriptions.write();
            for s in subscriptions {
                map.insert(s.id.clone(), s);
            }
        }
        store
    }
}

#[async_trait]
impl SubscriptionStore for MemoryStore {
    async fn list_all(&self) -> StoreResult<Vec<Subscription>> {
        Ok(self.subscriptions.read().values().cloned().collect())
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Subscription>> {
        Ok(self.subscriptions.read().get(id).cloned())
    }

    async fn create(&self, subscription: Subscription) -> StoreResult<String> {
        insert_new(&mut self.subscriptions.write(), subscription.id.clone(), subscription)
    }

    async fn delete_by_id(&self, id: &str) -> StoreResult<bool> {
        Ok(self.subscriptions.write().shift_remove(id).is_some())
    }
}

#[async_trait]
impl DashboardStore for MemoryStore {
    async fn list_all(&self) -> StoreResult<Vec<Dashboard>> {
        Ok(self.dashboards.read().values().cloned().collect())
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Dashboard>> {
        Ok(self.dashboards.read().get(id).cloned())
    }

    async fn create(&self, dashboard: Dashboard) -> StoreResult<String> {
        insert_new(&mut self.dashboards.write(), dashboard.id.clone(), dashboard)
    }

    async fn update(&self, dashboard: Dashboard) -> StoreResult<bool> {
        let mut map = self.dashboards.write();
        match map.get_mut(&dashboard.id) {
            Some(existing) => {
                *existing = dashboard;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_by_id(&self, id: &str) -> StoreResult<bool> {
        Ok(self.dashboards.write().shift_remove(id).is_some())
    }
}

fn insert_new<T>(map: &mut IndexMap<String, T>, id: String, value: T) -> StoreResult<String> {
    match map.entry(id) {
        Entry::Occupied(entry) => Err(StoreError::Duplicate(entry.key().clone())),
        Entry::Vacant(entry) => {
            let id = entry.key().clone();
            entry.insert(value);
            Ok(id)
        }
    }
}
