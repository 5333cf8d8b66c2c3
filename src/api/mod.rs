pub mod auth;
pub mod health;
pub mod metrics;
pub mod stats;
pub mod swagger;
pub mod users;

use actix_web::{http::StatusCode, web, HttpResponse};

use crate::middleware::AdminGuard;
use crate::utils::AppError;

pub fn status_for(error: &AppError) -> StatusCode {
    match error {
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        AppError::LoadFailed(_) => StatusCode::SERVICE_UNAVAILABLE,
        AppError::UpdateFailed(_) => StatusCode::BAD_GATEWAY,
        AppError::DatabaseError(_) | AppError::ConfigError(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// `{"success": false, "error": ...}` with the status code matching the error
pub fn error_response(error: &AppError) -> HttpResponse {
    metrics::increment_error_count();
    HttpResponse::build(status_for(error)).json(serde_json::json!({
        "success": false,
        "error": error.public_message()
    }))
}

/// Every route of the service. Everything under `/api/v1/admin` sits behind [`AdminGuard`].
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        // Health & Metrics (sem autenticação)
        .route("/health", web::get().to(health::health_check))
        .route("/metrics", web::get().to(metrics::get_metrics))
        .service(
            web::scope("/api/v1")
                // Auth
                .service(
                    web::scope("/auth")
                        .route("/login", web::post().to(auth::login))
                        .route("/verify", web::get().to(auth::verify_token))
                        .route("/me", web::get().to(auth::get_me)),
                )
                // Dashboard (somente admin)
                .service(
                    web::scope("/admin")
                        .wrap(AdminGuard)
                        .route("/users", web::get().to(users::list_users))
                        .route("/users/reload", web::post().to(users::reload_users))
                        .route("/users/{id}", web::get().to(users::get_user))
                        .route("/users/{id}/status", web::patch().to(users::update_user_status))
                        .route("/stats", web::get().to(stats::get_stats))
                        .route("/stats/stream", web::get().to(stats::stream_stats))
                        .route("/stats/restart", web::post().to(stats::restart_stats)),
                ),
        );
}
