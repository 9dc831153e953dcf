//! JSON-file store
//!
//! Each collection is one JSON array on disk (`registrations.json`,
//! `notifications.json`). A missing file is an empty collection. Every
//! mutation rewrites the whole file under a single lock.

use std::path::PathBuf;

use async_trait::async_trait;
use dw_common::{
    Dashboard, DashboardStore, StoreError, StoreResult, Subscription, SubscriptionStore,
};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use super::decode_records;

pub const REGISTRATIONS_FILE: &str = "registrations.json";
pub const NOTIFICATIONS_FILE: &str = "notifications.json";

pub struct FileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub async fn open(dir: impl Into<PathBuf>) -> StoreResult<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", dir.display(), e)))?;
        debug!(dir = %dir.display(), "Opened file store");
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    async fn load<T: DeserializeOwned>(&self, file: &str) -> StoreResult<Vec<T>> {
        let path = self.dir.join(file);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(StoreError::Unavailable(format!("{}: {}", path.display(), e)))
            }
        };
        if bytes.iter().all(|b| b.is_ascii_whitespace()) {
            return Ok(Vec::new());
        }

        let values: Vec<serde_json::Value> = serde_json::from_slice(&bytes)
            .map_err(|e| StoreError::Corrupt(format!("{}: {}", path.display(), e)))?;
        Ok(decode_records(values, file))
    }

    async fn save<T: Serialize>(&self, file: &str, records: &[T]) -> StoreResult<()> {
        let path = self.dir.join(file);
        let tmp = self.dir.join(format!("{}.tmp", file));
        let bytes = serde_json::to_vec_pretty(records)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?;

        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", tmp.display(), e)))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", path.display(), e)))?;
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for FileStore {
    async fn list_all(&self) -> StoreResult<Vec<Subscription>> {
        self.load(NOTIFICATIONS_FILE).await
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Subscription>> {
        let all: Vec<Subscription> = self.load(NOTIFICATIONS_FILE).await?;
        Ok(all.into_iter().find(|s| s.id == id))
    }

    async fn create(&self, subscription: Subscription) -> StoreResult<String> {
        let _guard = self.write_lock.lock().await;
        let mut all: Vec<Subscription> = self.load(NOTIFICATIONS_FILE).await?;
        let id = subscription.id.clone();
        if all.iter().any(|s| s.id == id) {
            return Err(StoreError::Duplicate(id));
        }
        all.push(subscription);
        self.save(NOTIFICATIONS_FILE, &all).await?;
        Ok(id)
    }

    async fn delete_by_id(&self, id: &str) -> StoreResult<bool> {
        let _guard = self.write_lock.lock().await;
        let mut all: Vec<Subscription> = self.load(NOTIFICATIONS_FILE).await?;
        let before = all.len();
        all.retain(|s| s.id != id);
        if all.len() == before {
            return Ok(false);
        }
        self.save(NOTIFICATIONS_FILE, &all).await?;
        Ok(true)
    }
}

#[async_trait]
impl DashboardStore for FileStore {
    async fn list_all(&self) -> StoreResult<Vec<Dashboard>> {
        self.load(REGISTRATIONS_FILE).await
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Dashboard>> {
        let all: Vec<Dashboard> = self.load(REGISTRATIONS_FILE).await?;
        Ok(all.into_iter().find(|d| d.id == id))
    }

    async fn create(&self, dashboard: Dashboard) -> StoreResult<String> {
        let _guard = self.write_lock.lock().await;
        let mut all: Vec<Dashboard> = self.load(REGISTRATIONS_FILE).await?;
        let id = dashboard.id.clone();
        if all.iter().any(|d| d.id == id) {
            return Err(StoreError::Duplicate(id));
        }
        all.push(dashboard);
        self.save(REGISTRATIONS_FILE, &all).await?;
        Ok(id)
    }

    async fn update(&self, dashboard: Dashboard) -> StoreResult<bool> {
        let _guard = self.write_lock.lock().await;
        let mut all: Vec<Dashboard> = self.load(REGISTRATIONS_FILE).await?;
        let Some(slot) = all.iter_mut().find(|d| d.id == dashboard.id) else {
            return Ok(false);
        };
        *slot = dashboard;
        self.save(REGISTRATIONS_FILE, &all).await?;
        Ok(true)
    }

    async fn delete_by_id(&self, id: &str) -> StoreResult<bool> {
        let _guard = self.write_lock.lock().await;
        let mut all: Vec<Dashboard> = self.load(REGISTRATIONS_FILE).await?;
        let before = all.len();
        all.retain(|d| d.id != id);
        if all.len() == before {
            return Ok(false);
        }
        self.save(REGISTRATIONS_FILE, &all).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dw_common::{EventKind, Filter};

    #[tokio::test]
    async fn test_missing_files_are_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        assert!(SubscriptionStore::list_all(&store).await.unwrap().is_empty());
        assert!(DashboardStore::list_all(&store).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subscriptions_persist_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = FileStore::open(dir.path()).await.unwrap();
            SubscriptionStore::create(
                &store,
                Subscription::new("1", "https://1.no/1", EventKind::Change.into(), Filter::Any),
            )
            .await
            .unwrap();
        }

        let store = FileStore::open(dir.path()).await.unwrap();
        let sub = SubscriptionStore::get(&store, "1").await.unwrap().unwrap();
        assert_eq!(sub.url, "https://1.no/1");
        assert!(SubscriptionStore::delete_by_id(&store, "1").await.unwrap());
        assert!(!SubscriptionStore::delete_by_id(&store, "1").await.unwrap());
    }

    #[tokio::test]
    async fn test_create_rejects_existing_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).await.unwrap();
        let first = Subscription::new("1", "https://1.no/1", Filter::Any, Filter::Any);
        let second = Subscription::new("1", "https://1.no/other", Filter::Any, Filter::Any);

        SubscriptionStore::create(&store, first).await.unwrap();
        let err = SubscriptionStore::create(&store, second).await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(ref id) if id == "1"));

        let all = SubscriptionStore::list_all(&store).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].url, "https://1.no/1");
    }

    #[tokio::test]
    async fn test_undecodable_records_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(NOTIFICATIONS_FILE),
            r#"[
                {"id": "1", "url": "https://1.no/1", "event": "", "country": "RU"},
                {"id": "2", "url": "https://1.no/2", "event": "INVOCATION", "country": "NO"},
                {"id": "3", "url": "https://1.no/3", "event": "CHANGE", "country": "NO"}
            ]"#,
        )
        .unwrap();

        let store = FileStore::open(dir.path()).await.unwrap();
        let ids: Vec<String> = SubscriptionStore::list_all(&store)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(ids, vec!["1", "3"]);
    }

    #[tokio::test]
    async fn test_garbage_file_is_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(REGISTRATIONS_FILE), "not json").unwrap();

        let store = FileStore::open(dir.path()).await.unwrap();
        let err = DashboardStore::list_all(&store).await.unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(_)));
    }
}
