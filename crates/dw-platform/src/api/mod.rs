//! REST API Layer
//!
//! Every route lives under `/dashboard/v1`. Trailing slashes are trimmed
//! before routing, so `/registrations/` and `/registrations` are the same.

pub mod common;
pub mod dashboards;
pub mod notifications;
pub mod openapi;
pub mod registrations;
pub mod status;

use axum::{routing::get, Json, Router};
use tower::Layer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use utoipa::OpenApi;

use crate::platform::Platform;

pub use dashboards::{dashboards_router, DashboardsState};
pub use notifications::{notifications_router, NotificationsState};
pub use openapi::DashwatchApiDoc;
pub use registrations::{registrations_router, RegistrationsState};
pub use status::{status_router, StatusState};

pub const OPENAPI_PATH: &str = "/dashboard/v1/openapi.json";

/// All API routes, without path normalization
pub fn router(platform: &Platform) -> Router {
    Router::new()
        .merge(registrations_router(RegistrationsState {
            dashboards: platform.dashboards.clone(),
        }))
        .merge(dashboards_router(DashboardsState {
            dashboards: platform.dashboards.clone(),
        }))
        .merge(notifications_router(NotificationsState {
            subscriptions: platform.subscriptions.clone(),
        }))
        .merge(status_router(StatusState {
            aggregator: platform.aggregator.clone(),
            subscriptions: platform.subscriptions.clone(),
            start_time: platform.start_time,
        }))
        .route(OPENAPI_PATH, get(|| async { Json(DashwatchApiDoc::openapi()) }))
}

/// Wrap a router so trailing slashes are ignored.
pub fn with_normalized_paths(router: Router) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(router)
}

/// The complete application service
pub fn app(platform: &Platform) -> NormalizePath<Router> {
    with_normalized_paths(router(platform))
}
