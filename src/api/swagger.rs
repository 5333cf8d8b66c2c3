use utoipa::OpenApi;
use utoipa::openapi::security::{SecurityScheme, HttpAuthScheme, HttpBuilder};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Applicant Admin Service API",
        version = "1.0.0",
        description = "Back office for reviewing applicant sign-ups.\n\n**Authentication:** everything under `/api/v1/admin` requires a JWT carrying the `admin` role. Requests without one are redirected (303) to the login route.\n\n**Features:**\n- Searchable applicant list\n- Full applicant detail with survey answers\n- Status changes (active / inactive / pending)\n- Live dashboard counters (JSON and Server-Sent Events)"
    ),
    paths(
        // Auth endpoints
        crate::api::auth::login,
        crate::api::auth::verify_token,
        crate::api::auth::get_me,

        // Health & Metrics
        crate::api::health::health_check,
        crate::api::metrics::get_metrics,

        // Users
        crate::api::users::list_users,
        crate::api::users::reload_users,
        crate::api::users::get_user,
        crate::api::users::update_user_status,

        // Stats
        crate::api::stats::get_stats,
        crate::api::stats::stream_stats,
        crate::api::stats::restart_stats,
    ),
    components(
        schemas(
            // Auth
            crate::services::auth_service::LoginRequest,
            crate::services::auth_service::AuthResponse,
            crate::services::auth_service::UserInfo,

            // Health & Metrics
            crate::api::health::HealthResponse,
            crate::api::metrics::MetricsResponse,

            // Users
            crate::models::UserStatus,
            crate::models::FundingPlan,
            crate::models::UserStats,
            crate::views::ListSnapshot,
            crate::views::UserRow,
            crate::views::UserDetail,
            crate::views::StatusOption,
            crate::views::DetailSection,
            crate::views::DetailField,
            crate::api::users::StatusUpdateRequest,

            // Stats
            crate::jobs::StatsState,
        )
    ),
    tags(
        (name = "Auth", description = "Admin login and token inspection."),
        (name = "Health", description = "Health check and service metrics."),
        (name = "Users", description = "Applicant list, detail and status changes. Admin only."),
        (name = "Stats", description = "Live dashboard counters. Admin only."),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token from POST /api/v1/auth/login"))
                        .build()
                ),
            );
        }
    }
}
