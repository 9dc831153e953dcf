//! MongoDB store
//!
//! Dashboards live in `dashboards`, subscriptions in `notifications`. The
//! entity ID is the document `_id`.

use async_trait::async_trait;
use dw_common::{
    Dashboard, DashboardStore, StoreError, StoreResult, Subscription, SubscriptionStore,
};
use futures::TryStreamExt;
use mongodb::{
    bson::{doc, Bson, Document},
    error::{ErrorKind, WriteFailure},
    Client, Collection, Database,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{info, warn};

pub const DASHBOARDS_COLLECTION: &str = "dashboards";
pub const NOTIFICATIONS_COLLECTION: &str = "notifications";

pub struct MongoStore {
    dashboards: Collection<Document>,
    notifications: Collection<Document>,
}

impl MongoStore {
    pub fn new(db: &Database) -> Self {
        Self {
            dashboards: db.collection(DASHBOARDS_COLLECTION),
            notifications: db.collection(NOTIFICATIONS_COLLECTION),
        }
    }

    pub async fn connect(url: &str, db_name: &str) -> StoreResult<Self> {
        let client = Client::with_uri_str(url).await.map_err(unavailable)?;
        let db = client.database(db_name);
        db.run_command(doc! { "ping": 1 }).await.map_err(unavailable)?;
        info!(db = %db_name, "Connected to MongoDB");
        Ok(Self::new(&db))
    }
}

const DUPLICATE_KEY: i32 = 11000;

fn unavailable(e: mongodb::error::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    matches!(
        e.kind.as_ref(),
        ErrorKind::Write(WriteFailure::WriteError(write)) if write.code == DUPLICATE_KEY
    )
}

async fn insert_new(
    collection: &Collection<Document>,
    document: Document,
    id: &str,
) -> StoreResult<()> {
    match collection.insert_one(document).await {
        Ok(_) => Ok(()),
        Err(e) if is_duplicate_key(&e) => Err(StoreError::Duplicate(id.to_string())),
        Err(e) => Err(unavailable(e)),
    }
}

/// Entity -> document, moving `id` to `_id`.
fn to_document<T: Serialize>(value: &T) -> StoreResult<Document> {
    let mut document =
        bson::to_document(value).map_err(|e| StoreError::Corrupt(e.to_string()))?;
    if let Some(id) = document.remove("id") {
        document.insert("_id", id);
    }
    Ok(document)
}

/// Document -> entity, moving `_id` back to `id`.
fn from_document<T: DeserializeOwned>(mut document: Document) -> Result<T, bson::de::Error> {
    if let Some(id) = document.remove("_id") {
        let id = match id {
            Bson::String(s) => Bson::String(s),
            other => Bson::String(other.to_string()),
        };
        document.insert("id", id);
    }
    bson::from_document(document)
}

async fn find_all<T: DeserializeOwned>(collection: &Collection<Document>) -> StoreResult<Vec<T>> {
    let documents: Vec<Document> = collection
        .find(doc! {})
        .await
        .map_err(unavailable)?
        .try_collect()
        .await
        .map_err(unavailable)?;

    let mut records = Vec::with_capacity(documents.len());
    for document in documents {
        let id = document.get("_id").map(|b| b.to_string()).unwrap_or_default();
        match from_document(document) {
            Ok(record) => records.push(record),
            Err(e) => warn!(
                collection = %collection.name(),
                id = %id,
                error = %e,
                "Skipping stored record that cannot be decoded"
            ),
        }
    }
    Ok(records)
}

async fn find_by_id<T: DeserializeOwned>(
    collection: &Collection<Document>,
    id: &str,
) -> StoreResult<Option<T>> {
    let found = collection
        .find_one(doc! { "_id": id })
        .await
        .map_err(unavailable)?;
    match found {
        Some(document) => from_document(document)
            .map(Some)
            .map_err(|e| StoreError::Corrupt(e.to_string())),
        None => Ok(None),
    }
}

async fn delete_by_id(collection: &Collection<Document>, id: &str) -> StoreResult<bool> {
    let result = collection
        .delete_one(doc! { "_id": id })
        .await
        .map_err(unavailable)?;
    Ok(result.deleted_count > 0)
}

#[async_trait]
impl SubscriptionStore for MongoStore {
    async fn list_all(&self) -> StoreResult<Vec<Subscription>> {
        find_all(&self.notifications).await
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Subscription>> {
        find_by_id(&self.notifications, id).await
    }

    async fn create(&self, subscription: Subscription) -> StoreResult<String> {
        insert_new(&self.notifications, to_document(&subscription)?, &subscription.id).await?;
        Ok(subscription.id)
    }

    async fn delete_by_id(&self, id: &str) -> StoreResult<bool> {
        delete_by_id(&self.notifications, id).await
    }
}

#[async_trait]
impl DashboardStore for MongoStore {
    async fn list_all(&self) -> StoreResult<Vec<Dashboard>> {
        find_all(&self.dashboards).await
    }

    async fn get(&self, id: &str) -> StoreResult<Option<Dashboard>> {
        find_by_id(&self.dashboards, id).await
    }

    async fn create(&self, dashboard: Dashboard) -> StoreResult<String> {
        insert_new(&self.dashboards, to_document(&dashboard)?, &dashboard.id).await?;
        Ok(dashboard.id)
    }

    async fn update(&self, dashboard: Dashboard) -> StoreResult<bool> {
        let result = self
            .dashboards
            .replace_one(doc! { "_id": dashboard.id.as_str() }, to_document(&dashboard)?)
            .await
            .map_err(unavailable)?;
        Ok(result.matched_count > 0)
    }

    async fn delete_by_id(&self, id: &str) -> StoreResult<bool> {
        delete_by_id(&self.dashboards, id).await
    }
}
