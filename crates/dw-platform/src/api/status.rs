//! Status API
//!
//! Diagnostics: upstream reachability, storage health, webhook count, uptime.

use std::sync::Arc;
use std::time::Instant;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use dw_common::VERSION;
use serde::Serialize;
use tracing::warn;
use utoipa::ToSchema;

use crate::aggregator::Aggregator;
use crate::api::common::ApiResult;
use crate::service::SubscriptionService;

pub const STATUS_PATH: &str = "/dashboard/v1/status";

#[derive(Debug, Serialize, ToSchema)]
pub struct Diagnostics {
    pub countries_api: u16,
    pub meteo_api: u16,
    pub currency_api: u16,
    pub notification_db: u16,
    /// Registered webhooks, reserved ones excluded
    pub webhooks: usize,
    pub version: String,
    /// Seconds since the process started
    pub uptime: u64,
}

#[derive(Clone)]
pub struct StatusState {
    pub aggregator: Arc<dyn Aggregator>,
    pub subscriptions: Arc<SubscriptionService>,
    pub start_time: Instant,
}

/// Service diagnostics
#[utoipa::path(
    get,
    path = "/dashboard/v1/status",
    tag = "status",
    responses(
        (status = 200, description = "Diagnostics", body = Diagnostics)
    )
)]
pub async fn get_status(State(state): State<StatusState>) -> ApiResult<Diagnostics> {
    let (upstream, webhooks) = tokio::join!(state.aggregator.probe(), state.subscriptions.count());

    let (notification_db, webhooks) = match webhooks {
        Ok(count) => (StatusCode::OK.as_u16(), count),
        Err(e) => {
            warn!(error = %e, "Subscription storage unhealthy");
            (StatusCode::SERVICE_UNAVAILABLE.as_u16(), 0)
        }
    };

    Ok(Json(Diagnostics {
        countries_api: upstream.countries_api,
        meteo_api: upstream.meteo_api,
        currency_api: upstream.currency_api,
        notification_db,
        webhooks,
        version: VERSION.to_string(),
        uptime: state.start_time.elapsed().as_secs(),
    }))
}

pub fn status_router(state: StatusState) -> Router {
    Router::new()
        .route(STATUS_PATH, get(get_status))
        .with_state(state)
}
