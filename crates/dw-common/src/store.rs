use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::model::{Dashboard, Subscription};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Stored data could not be decoded: {0}")]
    Corrupt(String),

    #[error("Identifier {0} is reserved and cannot be removed")]
    Protected(String),

    #[error("Identifier {0} already exists")]
    Duplicate(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Subscription persistence. The dispatcher only ever calls `list_all`.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Full snapshot of current subscriptions
    async fn list_all(&self) -> StoreResult<Vec<Subscription>>;

    async fn get(&self, id: &str) -> StoreResult<Option<Subscription>>;

    /// Fails with `Duplicate` when the ID is already stored
    async fn create(&self, subscription: Subscription) -> StoreResult<String>;

    /// Returns whether anything was removed
    async fn delete_by_id(&self, id: &str) -> StoreResult<bool>;
}

#[async_trait]
pub trait DashboardStore: Send + Sync {
    async fn list_all(&self) -> StoreResult<Vec<Dashboard>>;

    async fn get(&self, id: &str) -> StoreResult<Option<Dashboard>>;

    /// Fails with `Duplicate` when the ID is already stored
    async fn create(&self, dashboard: Dashboard) -> StoreResult<String>;

    /// Replaces the stored dashboard with the same ID. `false` if absent.
    async fn update(&self, dashboard: Dashboard) -> StoreResult<bool>;

    async fn delete_by_id(&self, id: &str) -> StoreResult<bool>;
}

/// Subscription IDs that must never be deleted or dispatched to
/// (synthetic health-check registrations and the like).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReservedIds {
    ids: BTreeSet<String>,
}

impl ReservedIds {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            ids: ids.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_ids() {
        let reserved = ReservedIds::new(["123123"]);
        assert!(reserved.contains("123123"));
        assert!(!reserved.contains("1231234"));
        assert_eq!(reserved.len(), 1);
        assert!(ReservedIds::default().is_empty());
    }

    #[test]
    fn test_protected_error_message() {
        let err = StoreError::Protected("123123".into());
        assert_eq!(
            err.to_string(),
            "Identifier 123123 is reserved and cannot be removed"
        );
    }
}
