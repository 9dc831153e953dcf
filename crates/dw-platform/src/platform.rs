//! Service wiring
//!
//! Assembles the injected storage backend, deliverer and aggregator into the
//! services the API serves. The reserved-ID guard is applied here, once, so
//! both the dispatcher and the subscription service see the same policy.

use std::sync::Arc;
use std::time::Instant;

use dw_common::ReservedIds;
use dw_notify::{Deliverer, DispatcherConfig, EventDispatcher};

use crate::aggregator::Aggregator;
use crate::repository::{GuardedSubscriptionStore, Stores};
use crate::service::{DashboardService, SubscriptionService};

#[derive(Clone)]
pub struct Platform {
    pub subscriptions: Arc<SubscriptionService>,
    pub dashboards: Arc<DashboardService>,
    pub dispatcher: Arc<EventDispatcher>,
    pub aggregator: Arc<dyn Aggregator>,
    pub start_time: Instant,
}

impl Platform {
    pub fn new(
        stores: Stores,
        reserved: ReservedIds,
        deliverer: Arc<dyn Deliverer>,
        aggregator: Arc<dyn Aggregator>,
        dispatch: DispatcherConfig,
    ) -> Self {
        let subscription_store = Arc::new(GuardedSubscriptionStore::new(stores.subscriptions, reserved));

        let dispatcher = Arc::new(EventDispatcher::new(
            subscription_store.clone(),
            deliverer,
            dispatch,
        ));
        let subscriptions = Arc::new(SubscriptionService::new(subscription_store));
        let dashboards = Arc::new(DashboardService::new(
            stores.dashboards,
            dispatcher.clone(),
            aggregator.clone(),
        ));

        Self {
            subscriptions,
            dashboards,
            dispatcher,
            aggregator,
            start_time: Instant::now(),
        }
    }
}
