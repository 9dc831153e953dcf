//! Dashwatch Platform
//!
//! Platform providing:
//! - Dashboard registrations with change notifications
//! - Webhook subscription management
//! - Rendered dashboards from upstream country, weather and currency data
//! - Pluggable storage (memory, JSON files, MongoDB)

pub mod aggregator;
pub mod api;
pub mod error;
pub mod platform;
pub mod repository;
pub mod service;

pub use aggregator::{Aggregator, HttpAggregator};
pub use error::PlatformError;
pub use platform::Platform;
pub use repository::Stores;
