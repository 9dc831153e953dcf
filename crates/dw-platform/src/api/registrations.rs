//! Registrations API
//!
//! CRUD over dashboard configurations. Mutations notify webhook subscribers.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use dw_common::{Dashboard, DashboardDraft};
use serde::Serialize;
use utoipa::ToSchema;

use crate::api::common::{body, require_id, ApiResult};
use crate::error::PlatformError;
use crate::service::DashboardService;

pub const REGISTRATIONS_PATH: &str = "/dashboard/v1/registrations";

/// Response to a successful registration
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationCreated {
    pub id: String,
    pub last_change: DateTime<Utc>,
}

#[derive(Clone)]
pub struct RegistrationsState {
    pub dashboards: Arc<DashboardService>,
}

/// Register a new dashboard
#[utoipa::path(
    post,
    path = "/dashboard/v1/registrations",
    tag = "registrations",
    request_body = DashboardDraft,
    responses(
        (status = 201, description = "Dashboard registered", body = RegistrationCreated),
        (status = 400, description = "Malformed body"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn create_registration(
    State(state): State<RegistrationsState>,
    payload: Result<Json<DashboardDraft>, JsonRejection>,
) -> Result<(StatusCode, Json<RegistrationCreated>), PlatformError> {
    let draft = body(payload)?;
    let dashboard = state.dashboards.create(draft).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegistrationCreated {
            id: dashboard.id,
            last_change: dashboard.last_change,
        }),
    ))
}

/// List all registered dashboards
#[utoipa::path(
    get,
    path = "/dashboard/v1/registrations",
    tag = "registrations",
    responses(
        (status = 200, description = "All registrations", body = Vec<Dashboard>),
        (status = 404, description = "No registrations exist")
    )
)]
pub async fn list_registrations(
    State(state): State<RegistrationsState>,
) -> ApiResult<Vec<Dashboard>> {
    let all = state.dashboards.list().await?;
    if all.is_empty() {
        return Err(PlatformError::empty("registrations"));
    }
    Ok(Json(all))
}

/// Get a dashboard registration
#[utoipa::path(
    get,
    path = "/dashboard/v1/registrations/{id}",
    tag = "registrations",
    params(("id" = String, Path, description = "Dashboard ID")),
    responses(
        (status = 200, description = "Registration found", body = Dashboard),
        (status = 400, description = "Malformed ID"),
        (status = 404, description = "Registration not found")
    )
)]
pub async fn get_registration(
    State(state): State<RegistrationsState>,
    Path(id): Path<String>,
) -> ApiResult<Dashboard> {
    let dashboard = state.dashboards.get(require_id(&id)?).await?;
    Ok(Json(dashboard))
}

/// Replace a dashboard registration
#[utoipa::path(
    put,
    path = "/dashboard/v1/registrations/{id}",
    tag = "registrations",
    params(("id" = String, Path, description = "Dashboard ID")),
    request_body = DashboardDraft,
    responses(
        (status = 200, description = "Registration replaced", body = Dashboard),
        (status = 404, description = "Registration not found"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn replace_registration(
    State(state): State<RegistrationsState>,
    Path(id): Path<String>,
    payload: Result<Json<DashboardDraft>, JsonRejection>,
) -> ApiResult<Dashboard> {
    let id = require_id(&id)?;
    let draft = body(payload)?;
    Ok(Json(state.dashboards.replace(id, draft).await?))
}

/// Partially update a dashboard registration
#[utoipa::path(
    patch,
    path = "/dashboard/v1/registrations/{id}",
    tag = "registrations",
    params(("id" = String, Path, description = "Dashboard ID")),
    request_body(content = DashboardDraft, description = "Any subset of the registration fields"),
    responses(
        (status = 200, description = "Registration updated", body = Dashboard),
        (status = 404, description = "Registration not found"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn patch_registration(
    State(state): State<RegistrationsState>,
    Path(id): Path<String>,
    payload: Result<Json<serde_json::Value>, JsonRejection>,
) -> ApiResult<Dashboard> {
    let id = require_id(&id)?;
    let patch = body(payload)?;
    Ok(Json(state.dashboards.patch(id, patch).await?))
}

/// Delete a dashboard registration
#[utoipa::path(
    delete,
    path = "/dashboard/v1/registrations/{id}",
    tag = "registrations",
    params(("id" = String, Path, description = "Dashboard ID")),
    responses(
        (status = 204, description = "Registration deleted"),
        (status = 400, description = "Malformed ID")
    )
)]
pub async fn delete_registration(
    State(state): State<RegistrationsState>,
    Path(id): Path<String>,
) -> Result<StatusCode, PlatformError> {
    state.dashboards.delete(require_id(&id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn registrations_router(state: RegistrationsState) -> Router {
    Router::new()
        .route(
            REGISTRATIONS_PATH,
            get(list_registrations).post(create_registration),
        )
        .route(
            &format!("{}/:id", REGISTRATIONS_PATH),
            get(get_registration)
                .put(replace_registration)
                .patch(patch_registration)
                .delete(delete_registration),
        )
        .with_state(state)
}
