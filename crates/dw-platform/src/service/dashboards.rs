//! Dashboard service
//!
//! Every successful mutation raises a notification for the dashboard's
//! country: create -> REGISTER, replace/patch -> CHANGE, delete -> DELETE.
//! The storage write decides the outcome; dispatch problems are logged only.

use std::sync::Arc;

use chrono::Utc;
use dw_common::{Dashboard, DashboardDraft, DashboardStore, EventKind, IdGenerator};
use dw_notify::EventDispatcher;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::aggregator::{Aggregator, DashboardView};
use crate::error::{PlatformError, Result};

pub struct DashboardService {
    store: Arc<dyn DashboardStore>,
    dispatcher: Arc<EventDispatcher>,
    aggregator: Arc<dyn Aggregator>,
}

impl DashboardService {
    pub fn new(
        store: Arc<dyn DashboardStore>,
        dispatcher: Arc<EventDispatcher>,
        aggregator: Arc<dyn Aggregator>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            aggregator,
        }
    }

    pub async fn create(&self, draft: DashboardDraft) -> Result<Dashboard> {
        validate_draft(&draft)?;

        let id = IdGenerator::generate(&draft.country);
        let dashboard = Dashboard::from_draft(id, draft, Utc::now());
        self.store.create(dashboard.clone()).await?;

        info!(dashboard_id = %dashboard.id, country = %dashboard.iso_code, "Created dashboard");
        self.announce(&dashboard.iso_code, EventKind::Register).await;
        Ok(dashboard)
    }

    pub async fn list(&self) -> Result<Vec<Dashboard>> {
        Ok(self.store.list_all().await?)
    }

    pub async fn get(&self, id: &str) -> Result<Dashboard> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| PlatformError::not_found("Dashboard", id))
    }

    pub async fn replace(&self, id: &str, draft: DashboardDraft) -> Result<Dashboard> {
        validate_draft(&draft)?;

        let dashboard = Dashboard::from_draft(id, draft, Utc::now());
        if !self.store.update(dashboard.clone()).await? {
            return Err(PlatformError::not_found("Dashboard", id));
        }

        info!(dashboard_id = %id, "Replaced dashboard");
        self.announce(&dashboard.iso_code, EventKind::Change).await;
        Ok(dashboard)
    }

    /// JSON merge of `patch` into the stored dashboard. `id` and
    /// `lastChange` in the patch are ignored.
    pub async fn patch(&self, id: &str, patch: Value) -> Result<Dashboard> {
        let Value::Object(mut fields) = patch else {
            return Err(PlatformError::validation("patch body must be a JSON object"));
        };
        fields.remove("id");
        fields.remove("lastChange");

        let current = self.get(id).await?;
        let mut merged = serde_json::to_value(&current)?;
        merge(&mut merged, Value::Object(fields));

        let mut dashboard: Dashboard = serde_json::from_value(merged)
            .map_err(|e| PlatformError::validation(format!("patched dashboard is invalid: {}", e)))?;
        dashboard.id = current.id;
        dashboard.iso_code = dashboard.iso_code.trim().to_uppercase();
        dashboard.last_change = Utc::now();
        if dashboard.iso_code.is_empty() {
            return Err(PlatformError::validation("isoCode is required"));
        }

        if !self.store.update(dashboard.clone()).await? {
            return Err(PlatformError::not_found("Dashboard", id));
        }

        info!(dashboard_id = %id, "Patched dashboard");
        self.announce(&dashboard.iso_code, EventKind::Change).await;
        Ok(dashboard)
    }

    /// Idempotent: an unknown ID is a no-op and raises no event.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let Some(dashboard) = self.store.get(id).await? else {
            debug!(dashboard_id = %id, "Delete of unknown dashboard");
            return Ok(());
        };

        if self.store.delete_by_id(id).await? {
            info!(dashboard_id = %id, "Deleted dashboard");
            self.announce(&dashboard.iso_code, EventKind::Delete).await;
        }
        Ok(())
    }

    pub async fn render(&self, id: &str) -> Result<DashboardView> {
        let dashboard = self.get(id).await?;
        Ok(self.aggregator.render(&dashboard).await?)
    }

    async fn announce(&self, country: &str, kind: EventKind) {
        match self.dispatcher.notify(country, kind.into()).await {
            Ok(report) => debug!(
                country = %country,
                event = %kind,
                matched = report.matched,
                failed = report.failed(),
                "Notified subscribers"
            ),
            Err(e) => warn!(country = %country, event = %kind, error = %e, "Notification dispatch failed; continuing"),
        }
    }
}

fn validate_draft(draft: &DashboardDraft) -> Result<()> {
    if draft.iso_code.trim().is_empty() {
        return Err(PlatformError::validation("isoCode is required"));
    }
    Ok(())
}

/// RFC 7396 merge: objects merge recursively, `null` removes, anything else
/// replaces.
fn merge(target: &mut Value, patch: Value) {
    let Value::Object(patch) = patch else {
        *target = patch;
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    if let Value::Object(target) = target {
        for (key, value) in patch {
            if value.is_null() {
                target.remove(&key);
            } else {
                merge(target.entry(key).or_insert(Value::Null), value);
            }
        }
    }
}
