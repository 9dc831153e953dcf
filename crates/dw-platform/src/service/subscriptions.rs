//! Subscription (webhook registration) service

use std::sync::Arc;

use dw_common::{
    CountryCode, CountryFilter, EventFilter, IdGenerator, Subscription, SubscriptionStore,
};
use reqwest::Url;
use tracing::info;

use crate::error::{PlatformError, Result};

pub struct SubscriptionService {
    store: Arc<dyn SubscriptionStore>,
}

impl SubscriptionService {
    pub fn new(store: Arc<dyn SubscriptionStore>) -> Self {
        Self { store }
    }

    /// Validate, normalize and store a new subscription.
    pub async fn register(&self, url: &str, event: &str, country: &str) -> Result<Subscription> {
        let url = validate_url(url)?;
        let event: EventFilter = event
            .parse()
            .map_err(|e: dw_common::InvalidEventKind| PlatformError::validation(e.to_string()))?;
        let country = CountryFilter::from(CountryCode::new(country));

        let id = IdGenerator::generate(&format!("{}{}", url, event));
        let subscription = Subscription::new(id, url, event, country);
        self.store.create(subscription.clone()).await?;

        info!(
            subscription_id = %subscription.id,
            url = %subscription.url,
            event = %subscription.event,
            country = %subscription.country,
            "Registered subscription"
        );
        Ok(subscription)
    }

    pub async fn list(&self) -> Result<Vec<Subscription>> {
        Ok(self.store.list_all().await?)
    }

    pub async fn get(&self, id: &str) -> Result<Subscription> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| PlatformError::not_found("Subscription", id))
    }

    /// Idempotent: deleting an unknown ID succeeds. Reserved IDs are refused.
    pub async fn delete(&self, id: &str) -> Result<()> {
        if self.store.delete_by_id(id).await? {
            info!(subscription_id = %id, "Deleted subscription");
        }
        Ok(())
    }

    /// Number of subscriptions that can receive notifications
    pub async fn count(&self) -> Result<usize> {
        Ok(self.store.list_all().await?.len())
    }
}

fn validate_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PlatformError::validation("url is required"));
    }
    let parsed = Url::parse(trimmed)
        .map_err(|e| PlatformError::validation(format!("url is not valid: {}", e)))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(PlatformError::validation("url must be an absolute http or https URL"));
    }
    Ok(trimmed.to_string())
}
