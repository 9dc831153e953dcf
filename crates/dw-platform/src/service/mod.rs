//! Service Layer

pub mod dashboards;
pub mod subscriptions;

pub use dashboards::DashboardService;
pub use subscriptions::SubscriptionService;
