//! Dashboards API
//!
//! Rendered view of a registration, populated from upstream data.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};

use crate::aggregator::DashboardView;
use crate::api::common::{require_id, ApiResult};
use crate::service::DashboardService;

pub const DASHBOARDS_PATH: &str = "/dashboard/v1/dashboards";

#[derive(Clone)]
pub struct DashboardsState {
    pub dashboards: Arc<DashboardService>,
}

/// Render a dashboard
#[utoipa::path(
    get,
    path = "/dashboard/v1/dashboards/{id}",
    tag = "dashboards",
    params(("id" = String, Path, description = "Dashboard ID")),
    responses(
        (status = 200, description = "Rendered dashboard", body = DashboardView),
        (status = 404, description = "Dashboard not found"),
        (status = 502, description = "Upstream data unavailable")
    )
)]
pub async fn get_dashboard(
    State(state): State<DashboardsState>,
    Path(id): Path<String>,
) -> ApiResult<DashboardView> {
    let view = state.dashboards.render(require_id(&id)?).await?;
    Ok(Json(view))
}

pub fn dashboards_router(state: DashboardsState) -> Router {
    Router::new()
        .route(&format!("{}/:id", DASHBOARDS_PATH), get(get_dashboard))
        .with_state(state)
}
