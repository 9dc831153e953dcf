//! Dashwatch notification dispatch
//!
//! Fans a dashboard event out to every matching webhook subscription.

pub mod dispatcher;
pub mod http_deliverer;

pub use dispatcher::{
    Deliverer, DeliveryOutcome, DeliveryResult, DispatchError, DispatchReport, DispatcherConfig,
    EventDispatcher,
};
pub use http_deliverer::{HttpDeliverer, HttpDelivererConfig};
