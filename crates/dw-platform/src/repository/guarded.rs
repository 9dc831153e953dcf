use std::sync::Arc;

use async_trait::async_trait;
use dw_common::{ReservedIds, StoreError, StoreResult, Subscription, SubscriptionStore};
use tracing::warn;

/// Applies the reserved-ID policy in front of any subscription store.
///
/// Reserved subscriptions are left out of listings (so they are never
/// dispatched to or counted), can still be fetched by ID, and refuse deletion.
pub struct GuardedSubscriptionStore {
    inner: Arc<dyn SubscriptionStore>,
    reserved: ReservedIds,
}

impl GuardedSubscriptionStore {
    pub fn new(inner: Arc<dyn SubscriptionStore>, reserved: ReservedIds) -> Self {
        Self { inner, reserved }
    }
}

#[async_trait]
impl SubscriptionStore for GuardedSubscriptionStore {
    async fn list_all(&self) -> StoreResult<Vec<Subscription>> {
        let mut all = self.inner.list_all().await?;
        all.retain(|s| !self.reserved.contains(&s.id));
        Ok(all)
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Subscription>> {
        self.inner.get(id).await
    }

    async fn create(&self, subscription: Subscription) -> StoreResult<String> {
        self.inner.create(subscription).await
    }

    async fn delete_by_id(&self, id: &str) -> StoreResult<bool> {
        if self.reserved.contains(id) {
            warn!(subscription_id = %id, "Rejected delete of reserved subscription");
            return Err(StoreError::Protected(id.to_string()));
        }
        self.inner.delete_by_id(id).await
    }
}
