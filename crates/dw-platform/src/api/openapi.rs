//! OpenAPI Documentation

use utoipa::OpenApi;

/// Dashwatch API OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Dashwatch API",
        version = "1.0.0",
        description = "Dashboard registrations with webhook notifications"
    ),
    tags(
        (name = "registrations", description = "Dashboard registrations"),
        (name = "dashboards", description = "Rendered dashboards"),
        (name = "notifications", description = "Webhook subscriptions"),
        (name = "status", description = "Diagnostics")
    ),
    paths(
        super::registrations::create_registration,
        super::registrations::list_registrations,
        super::registrations::get_registration,
        super::registrations::replace_registration,
        super::registrations::patch_registration,
        super::registrations::delete_registration,
        super::dashboards::get_dashboard,
        super::notifications::register_webhook,
        super::notifications::list_webhooks,
        super::notifications::get_webhook,
        super::notifications::delete_webhook,
        super::status::get_status,
    ),
    components(schemas(
        dw_common::Dashboard,
        dw_common::DashboardDraft,
        dw_common::Features,
        dw_common::Subscription,
        dw_common::NotificationPayload,
        crate::aggregator::DashboardView,
        crate::aggregator::ViewFeatures,
        crate::aggregator::Coordinates,
        super::common::ApiError,
        super::common::CreatedResponse,
        super::registrations::RegistrationCreated,
        super::notifications::RegisterWebhookRequest,
        super::status::Diagnostics,
    ))
)]
pub struct DashwatchApiDoc;
