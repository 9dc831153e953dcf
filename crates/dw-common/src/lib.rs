//! Shared types for the dashboard registry and webhook dispatch.

pub mod filter;
pub mod id;
pub mod logging;
pub mod model;
pub mod store;

// ============================================================================
// Re-exports
// ============================================================================

pub use filter::{
    is_valid_event_kind, CountryCode, CountryFilter, EventFilter, EventKind, Filter,
    InvalidEventKind,
};
pub use id::{looks_like_id, IdGenerator};
pub use model::{Dashboard, DashboardDraft, Features, NotificationPayload, Subscription};
pub use store::{DashboardStore, ReservedIds, StoreError, StoreResult, SubscriptionStore};

// ============================================================================
// Constants
// ============================================================================

/// Base path every HTTP route is mounted under
pub const API_BASE_PATH: &str = "/dashboard/v1";

pub const VERSION: &str = "v1";
