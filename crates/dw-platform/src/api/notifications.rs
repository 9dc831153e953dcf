//! Notifications API
//!
//! Webhook subscription registration and removal.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use dw_common::Subscription;
use serde::Deserialize;
use utoipa::ToSchema;

use crate::api::common::{body, require_id, ApiResult, CreatedResponse};
use crate::error::PlatformError;
use crate::service::SubscriptionService;

pub const NOTIFICATIONS_PATH: &str = "/dashboard/v1/notifications";

/// Register webhook request
#[derive(Debug, Deserialize, ToSchema)]
pub struct RegisterWebhookRequest {
    /// Endpoint notified with a POST
    pub url: String,

    /// REGISTER, CHANGE, DELETE, INVOKE or empty for every event
    #[serde(default)]
    pub event: String,

    /// ISO country code or empty for every country
    #[serde(default)]
    pub country: String,
}

#[derive(Clone)]
pub struct NotificationsState {
    pub subscriptions: Arc<SubscriptionService>,
}

/// Register a webhook
#[utoipa::path(
    post,
    path = "/dashboard/v1/notifications",
    tag = "notifications",
    request_body = RegisterWebhookRequest,
    responses(
        (status = 201, description = "Webhook registered", body = CreatedResponse),
        (status = 400, description = "Malformed body"),
        (status = 422, description = "Invalid url or event")
    )
)]
pub async fn register_webhook(
    State(state): State<NotificationsState>,
    payload: Result<Json<RegisterWebhookRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<CreatedResponse>), PlatformError> {
    let req = body(payload)?;
    let subscription = state
        .subscriptions
        .register(&req.url, &req.event, &req.country)
        .await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse::new(subscription.id))))
}

/// List registered webhooks
#[utoipa::path(
    get,
    path = "/dashboard/v1/notifications",
    tag = "notifications",
    responses(
        (status = 200, description = "All webhooks", body = Vec<Subscription>)
    )
)]
pub async fn list_webhooks(State(state): State<NotificationsState>) -> ApiResult<Vec<Subscription>> {
    Ok(Json(state.subscriptions.list().await?))
}

/// Get a webhook
#[utoipa::path(
    get,
    path = "/dashboard/v1/notifications/{id}",
    tag = "notifications",
    params(("id" = String, Path, description = "Webhook ID")),
    responses(
        (status = 200, description = "Webhook found", body = Subscription),
        (status = 400, description = "Malformed ID"),
        (status = 404, description = "Webhook not found")
    )
)]
pub async fn get_webhook(
    State(state): State<NotificationsState>,
    Path(id): Path<String>,
) -> ApiResult<Subscription> {
    Ok(Json(state.subscriptions.get(require_id(&id)?).await?))
}

/// Delete a webhook
#[utoipa::path(
    delete,
    path = "/dashboard/v1/notifications/{id}",
    tag = "notifications",
    params(("id" = String, Path, description = "Webhook ID")),
    responses(
        (status = 204, description = "Webhook deleted"),
        (status = 403, description = "Webhook is reserved")
    )
)]
pub async fn delete_webhook(
    State(state): State<NotificationsState>,
    Path(id): Path<String>,
) -> Result<StatusCode, PlatformError> {
    state.subscriptions.delete(require_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn notifications_router(state: NotificationsState) -> Router {
    Router::new()
        .route(NOTIFICATIONS_PATH, get(list_webhooks).post(register_webhook))
        .route(
            &format!("{}/:id", NOTIFICATIONS_PATH),
            get(get_webhook).delete(delete_webhook),
        )
        .with_state(state)
}
