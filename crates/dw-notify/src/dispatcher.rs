//! Event dispatcher
//!
//! One dispatch runs Validate -> Filter -> Deliver:
//! - the event kind is checked against the registry; an invalid kind aborts
//!   before any subscription is read
//! - a full subscription snapshot is filtered on country and event
//! - every kept subscription gets its own delivery attempt, bounded by a
//!   per-attempt timeout, with up to `max_concurrency` attempts in flight.
//!   A slow attempt holds only its own slot; outcomes keep subscription order.
//!
//! Individual delivery failures are logged and reported, never returned as
//! an error.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use dw_common::{
    CountryCode, EventFilter, NotificationPayload, StoreError, Subscription, SubscriptionStore,
};
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, warn};

/// Result of one delivery attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryResult {
    /// Endpoint answered with a success status
    Delivered { status: u16 },
    /// Endpoint answered with a non-success status
    Rejected { status: u16 },
    /// Connection refused, DNS failure, TLS failure and the like
    Unreachable { error: String },
    TimedOut,
    /// Payload could not be serialized
    Encoding { error: String },
}

impl DeliveryResult {
    pub fn is_success(&self) -> bool {
        matches!(self, DeliveryResult::Delivered { .. })
    }
}

/// Outbound HTTP collaborator
#[async_trait]
pub trait Deliverer: Send + Sync {
    async fn deliver(&self, url: &str, payload: &NotificationPayload) -> DeliveryResult;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub subscription_id: String,
    pub url: String,
    pub result: DeliveryResult,
}

/// Everything one dispatch attempted, in kept-subscription order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub country: CountryCode,
    pub event: EventFilter,
    pub matched: usize,
    pub outcomes: Vec<DeliveryOutcome>,
}

impl DispatchReport {
    pub fn delivered(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.delivered()
    }

    pub fn subscription_ids(&self) -> Vec<&str> {
        self.outcomes.iter().map(|o| o.subscription_id.as_str()).collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("Invalid event kind '{0}' passed to dispatch")]
    InvalidEventKind(String),

    #[error("Failed to list subscriptions: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Upper bound on a single delivery attempt
    pub delivery_timeout: Duration,
    /// Deliveries in flight at once. 1 delivers strictly in order.
    pub max_concurrency: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            delivery_timeout: Duration::from_secs(10),
            max_concurrency: 8,
        }
    }
}

pub struct EventDispatcher {
    store: Arc<dyn SubscriptionStore>,
    deliverer: Arc<dyn Deliverer>,
    config: DispatcherConfig,
}

impl EventDispatcher {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        deliverer: Arc<dyn Deliverer>,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            store,
            deliverer,
            config,
        }
    }

    /// Dispatch from untyped input. The event must be a registry kind or empty.
    pub async fn dispatch(&self, country: &str, event: &str) -> Result<DispatchReport, DispatchError> {
        let event: EventFilter = match event.parse() {
            Ok(event) => event,
            Err(e) => {
                error!(event = %event, country = %country, error = %e, "Refusing to dispatch invalid event kind");
                return Err(DispatchError::InvalidEventKind(event.to_string()));
            }
        };
        self.notify(country, event).await
    }

    /// Dispatch an already-typed event for `country`.
    pub async fn notify(&self, country: &str, event: EventFilter) -> Result<DispatchReport, DispatchError> {
        let country = CountryCode::new(country);

        let subscriptions = self.store.list_all().await.map_err(|e| {
            error!(country = %country, event = %event, error = %e, "Failed to list subscriptions for dispatch");
            DispatchError::Store(e)
        })?;

        let kept: Vec<Subscription> = subscriptions
            .into_iter()
            .filter(|s| is_match(s, &country, &event))
            .collect();
        let matched = kept.len();

        debug!(country = %country, event = %event, matched, "Dispatching event");

        // Completion order is not kept; outcomes are re-sorted by position.
        let mut indexed: Vec<(usize, DeliveryOutcome)> = stream::iter(kept.into_iter().enumerate())
            .map(|(index, subscription)| async move { (index, self.attempt(subscription).await) })
            .buffer_unordered(self.config.max_concurrency.max(1))
            .collect()
            .await;
        indexed.sort_by_key(|(index, _)| *index);
        let outcomes: Vec<DeliveryOutcome> = indexed.into_iter().map(|(_, outcome)| outcome).collect();

        let report = DispatchReport {
            country,
            event,
            matched,
            outcomes,
        };

        if matched > 0 {
            info!(
                country = %report.country,
                event = %report.event,
                matched,
                delivered = report.delivered(),
                failed = report.failed(),
                "Dispatch complete"
            );
        }

        Ok(report)
    }

    async fn attempt(&self, subscription: Subscription) -> DeliveryOutcome {
        let payload = NotificationPayload::for_subscription(&subscription, Utc::now());

        let result = match tokio::time::timeout(
            self.config.delivery_timeout,
            self.deliverer.deliver(&subscription.url, &payload),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => DeliveryResult::TimedOut,
        };

        if !result.is_success() {
            warn!(
                subscription_id = %subscription.id,
                url = %subscription.url,
                result = ?result,
                "Notification delivery failed"
            );
        }

        DeliveryOutcome {
            subscription_id: subscription.id,
            url: subscription.url,
            result,
        }
    }
}

/// Kept iff both the country and the event filter admit the dispatched values.
fn is_match(subscription: &Subscription, country: &CountryCode, event: &EventFilter) -> bool {
    subscription.country.admits(country) && subscription.event.matches_event(event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dw_common::{EventKind, Filter, StoreResult};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FixedStore {
        subscriptions: Vec<Subscription>,
        fail: bool,
    }

    #[async_trait]
    impl SubscriptionStore for FixedStore {
        async fn list_all(&self) -> StoreResult<Vec<Subscription>> {
            if self.fail {
                return Err(StoreError::Unavailable("database offline".into()));
            }
            Ok(self.subscriptions.clone())
        }

        async fn get(&self, id: &str) -> StoreResult<Option<Subscription>> {
            Ok(self.subscriptions.iter().find(|s| s.id == id).cloned())
        }

        async fn create(&self, subscription: Subscription) -> StoreResult<String> {
            Ok(subscription.id)
        }

        async fn delete_by_id(&self, _id: &str) -> StoreResult<bool> {
            Ok(false)
        }
    }

    struct MockDeliverer {
        attempts: AtomicUsize,
        seen: Mutex<Vec<String>>,
        failing_urls: HashSet<String>,
        hang_urls: HashSet<String>,
    }

    impl MockDeliverer {
        fn new() -> Self {
            Self {
                attempts: AtomicUsize::new(0),
                seen: Mutex::new(Vec::new()),
                failing_urls: HashSet::new(),
                hang_urls: HashSet::new(),
            }
        }

        fn failing(mut self, url: &str) -> Self {
            self.failing_urls.insert(url.to_string());
            self
        }

        fn hanging(mut self, url: &str) -> Self {
            self.hang_urls.insert(url.to_string());
            self
        }
    }

    #[async_trait]
    impl Deliverer for MockDeliverer {
        async fn deliver(&self, url: &str, payload: &NotificationPayload) -> DeliveryResult {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().unwrap().push(payload.id.clone());
            if self.hang_urls.contains(url) {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            if self.failing_urls.contains(url) {
                DeliveryResult::Unreachable {
                    error: "connection refused".to_string(),
                }
            } else {
                DeliveryResult::Delivered { status: 200 }
            }
        }
    }

    fn sub(id: &str, event: EventFilter, country: &str) -> Subscription {
        Subscription::new(
            id,
            format!("https://hooks.example/{}", id),
            event,
            country.parse().unwrap(),
        )
    }

    fn dispatcher(subscriptions: Vec<Subscription>, deliverer: Arc<MockDeliverer>) -> EventDispatcher {
        EventDispatcher::new(
            Arc::new(FixedStore {
                subscriptions,
                fail: false,
            }),
            deliverer,
            DispatcherConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_country_wildcard_matches_every_country() {
        let deliverer = Arc::new(MockDeliverer::new());
        let d = dispatcher(vec![sub("1", EventKind::Change.into(), "")], deliverer.clone());

        for country in ["NO", "SE", "RU"] {
            let report = d.dispatch(country, "CHANGE").await.unwrap();
            assert_eq!(report.matched, 1);
        }
        assert_eq!(deliverer.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_event_wildcard_matches_every_kind() {
        let deliverer = Arc::new(MockDeliverer::new());
        let d = dispatcher(vec![sub("1", Filter::Any, "NO")], deliverer.clone());

        for kind in EventKind::ALL {
            let report = d.dispatch("NO", kind.as_str()).await.unwrap();
            assert_eq!(report.matched, 1, "kind {}", kind);
        }
        let report = d.dispatch("SE", "REGISTER").await.unwrap();
        assert_eq!(report.matched, 0);
    }

    #[tokio::test]
    async fn test_exact_matching() {
        let deliverer = Arc::new(MockDeliverer::new());
        let d = dispatcher(vec![sub("1", EventKind::Change.into(), "NO")], deliverer);

        assert_eq!(d.dispatch("NO", "CHANGE").await.unwrap().matched, 1);
        assert_eq!(d.dispatch("no", "change").await.unwrap().matched, 1);
        assert_eq!(d.dispatch("SE", "CHANGE").await.unwrap().matched, 0);
        assert_eq!(d.dispatch("NO", "DELETE").await.unwrap().matched, 0);
    }

    #[tokio::test]
    async fn test_invalid_event_kind_delivers_nothing() {
        let deliverer = Arc::new(MockDeliverer::new());
        let d = dispatcher(vec![sub("1", Filter::Any, "")], deliverer.clone());

        let err = d.dispatch("NO", "BOGUS").await.unwrap_err();
        assert!(matches!(err, DispatchError::InvalidEventKind(ref e) if e == "BOGUS"));
        assert_eq!(deliverer.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_padded_event_kind_is_invalid() {
        let deliverer = Arc::new(MockDeliverer::new());
        let d = dispatcher(vec![sub("1", Filter::Any, "")], deliverer.clone());

        for event in [" ", "   ", " CHANGE "] {
            let err = d.dispatch("NO", event).await.unwrap_err();
            assert!(matches!(err, DispatchError::InvalidEventKind(ref e) if e == event));
        }
        assert_eq!(deliverer.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_store_failure_aborts() {
        let deliverer = Arc::new(MockDeliverer::new());
        let d = EventDispatcher::new(
            Arc::new(FixedStore {
                subscriptions: vec![],
                fail: true,
            }),
            deliverer.clone(),
            DispatcherConfig::default(),
        );

        let err = d.notify("NO", EventKind::Delete.into()).await.unwrap_err();
        assert!(matches!(err, DispatchError::Store(_)));
        assert_eq!(deliverer.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_partial_failure_is_isolated() {
        let deliverer = Arc::new(MockDeliverer::new().failing("https://hooks.example/2"));
        let d = dispatcher(
            vec![
                sub("1", Filter::Any, "NO"),
                sub("2", Filter::Any, "NO"),
                sub("3", Filter::Any, "NO"),
            ],
            deliverer.clone(),
        );

        let report = d.dispatch("NO", "REGISTER").await.unwrap();
        assert_eq!(report.subscription_ids(), vec!["1", "2", "3"]);
        assert_eq!(report.delivered(), 2);
        assert_eq!(report.failed(), 1);
        assert!(matches!(
            report.outcomes[1].result,
            DeliveryResult::Unreachable { .. }
        ));
        assert_eq!(deliverer.attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_timeout_does_not_cancel_siblings() {
        let deliverer = Arc::new(MockDeliverer::new().hanging("https://hooks.example/1"));
        let d = EventDispatcher::new(
            Arc::new(FixedStore {
                subscriptions: vec![sub("1", Filter::Any, ""), sub("2", Filter::Any, "")],
                fail: false,
            }),
            deliverer.clone(),
            DispatcherConfig {
                delivery_timeout: Duration::from_millis(50),
                max_concurrency: 2,
            },
        );

        let report = d.dispatch("NO", "").await.unwrap();
        assert_eq!(report.outcomes[0].result, DeliveryResult::TimedOut);
        assert!(report.outcomes[1].result.is_success());
    }

    #[tokio::test]
    async fn test_sequential_when_concurrency_is_one() {
        let deliverer = Arc::new(MockDeliverer::new());
        let d = EventDispatcher::new(
            Arc::new(FixedStore {
                subscriptions: (1..=5).map(|i| sub(&i.to_string(), Filter::Any, "")).collect(),
                fail: false,
            }),
            deliverer.clone(),
            DispatcherConfig {
                max_concurrency: 1,
                ..Default::default()
            },
        );

        d.dispatch("NO", "INVOKE").await.unwrap();
        let seen = deliverer.seen.lock().unwrap().clone();
        assert_eq!(seen, vec!["1", "2", "3", "4", "5"]);
    }

    /// Holds delivery to `gated_url` until some other delivery reaches `release_url`.
    struct GateDeliverer {
        gated_url: String,
        release_url: String,
        gate: tokio::sync::Notify,
    }

    #[async_trait]
    impl Deliverer for GateDeliverer {
        async fn deliver(&self, url: &str, _payload: &NotificationPayload) -> DeliveryResult {
            if url == self.gated_url {
                self.gate.notified().await;
            } else if url == self.release_url {
                self.gate.notify_one();
            }
            DeliveryResult::Delivered { status: 200 }
        }
    }

    #[tokio::test]
    async fn test_slow_delivery_does_not_hold_back_later_ones() {
        let subscriptions: Vec<Subscription> =
            (1..=4).map(|i| sub(&i.to_string(), Filter::Any, "")).collect();
        let deliverer = Arc::new(GateDeliverer {
            gated_url: "https://hooks.example/1".into(),
            release_url: "https://hooks.example/4".into(),
            gate: tokio::sync::Notify::new(),
        });
        let d = EventDispatcher::new(
            Arc::new(FixedStore {
                subscriptions,
                fail: false,
            }),
            deliverer,
            DispatcherConfig {
                delivery_timeout: Duration::from_secs(5),
                max_concurrency: 2,
            },
        );

        let report = tokio::time::timeout(Duration::from_secs(2), d.dispatch("NO", "CHANGE"))
            .await
            .expect("subscriber 4 never started while subscriber 1 was pending")
            .unwrap();
        assert_eq!(report.subscription_ids(), vec!["1", "2", "3", "4"]);
        assert_eq!(report.delivered(), 4);
    }

    #[tokio::test]
    async fn test_wildcard_dispatch_only_reaches_wildcard_subscriptions() {
        let deliverer = Arc::new(MockDeliverer::new());
        let d = dispatcher(
            vec![
                sub("1", Filter::Any, ""),
                sub("2", EventKind::Change.into(), ""),
            ],
            deliverer,
        );

        let report = d.dispatch("NO", "").await.unwrap();
        assert_eq!(report.subscription_ids(), vec!["1"]);
    }
}
