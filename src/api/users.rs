use actix_web::{web, HttpResponse};
use serde::Deserialize;

use crate::api::{error_response, metrics, status_for};
use crate::models::UserStatus;
use crate::services::auth_service::Claims;
use crate::state::AppState;
use crate::utils::AppError;
use crate::views::{ListSnapshot, LoadOutcome, UserDetailView};

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ListQuery {
    /// Case-insensitive match on name or email
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct StatusUpdateRequest {
    /// `active`, `inactive` or `pending`
    pub status: String,
}

/// GET /api/v1/admin/users - Lista filtrada
#[utoipa::path(
    get,
    path = "/api/v1/admin/users",
    tag = "Users",
    params(ListQuery),
    responses(
        (status = 200, description = "Filtered user list", body = ListSnapshot),
        (status = 202, description = "Users are still loading", body = ListSnapshot),
        (status = 303, description = "Not signed in as admin; redirected to login"),
        (status = 503, description = "Users could not be loaded; POST /reload to retry", body = ListSnapshot)
    ),
    security(("bearer_auth" = []))
)]
pub async fn list_users(state: web::Data<AppState>, query: web::Query<ListQuery>) -> HttpResponse {
    metrics::increment_request_count();
    let search = query.search.as_deref().unwrap_or("");

    let snapshot = state.users.snapshot(search).await;
    match &snapshot {
        ListSnapshot::Ready { matched, total, .. } => {
            log::debug!("📋 GET /admin/users search='{}' -> {}/{}", search, matched, total);
            HttpResponse::Ok().json(snapshot)
        }
        ListSnapshot::Loading => HttpResponse::Accepted().json(snapshot),
        ListSnapshot::Failed { .. } => {
            metrics::increment_error_count();
            HttpResponse::ServiceUnavailable().json(snapshot)
        }
    }
}

/// POST /api/v1/admin/users/reload - Botão "Retry"
#[utoipa::path(
    post,
    path = "/api/v1/admin/users/reload",
    tag = "Users",
    responses(
        (status = 200, description = "List reloaded"),
        (status = 503, description = "Reload failed")
    ),
    security(("bearer_auth" = []))
)]
pub async fn reload_users(state: web::Data<AppState>, admin: web::ReqData<Claims>) -> HttpResponse {
    metrics::increment_request_count();
    log::info!("🔄 POST /admin/users/reload by {}", admin.sub);

    match state.users.reload().await {
        Ok(LoadOutcome::Applied { count }) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "count": count
        })),
        Ok(LoadOutcome::Discarded) => HttpResponse::Accepted().json(serde_json::json!({
            "success": true,
            "superseded": true
        })),
        Err(e) => error_response(&e),
    }
}

/// GET /api/v1/admin/users/{id} - Detalhe completo
#[utoipa::path(
    get,
    path = "/api/v1/admin/users/{id}",
    tag = "Users",
    params(("id" = String, Path, description = "User document id")),
    responses(
        (status = 200, description = "Full user detail", body = crate::views::UserDetail),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = []))
)]
pub async fn get_user(state: web::Data<AppState>, path: web::Path<String>) -> HttpResponse {
    metrics::increment_request_count();
    let id = path.into_inner();

    match state.users.find(&id).await {
        Ok(record) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "user": UserDetailView::open(record).render()
        })),
        Err(e) => error_response(&e),
    }
}

/// PATCH /api/v1/admin/users/{id}/status - Única escrita permitida
///
/// The store is written first; the list and the returned detail only change
/// after it confirms. On failure the detail is returned with its old status.
#[utoipa::path(
    patch,
    path = "/api/v1/admin/users/{id}/status",
    tag = "Users",
    params(("id" = String, Path, description = "User document id")),
    request_body = StatusUpdateRequest,
    responses(
        (status = 200, description = "Status updated", body = crate::views::UserDetail),
        (status = 400, description = "Unknown status value"),
        (status = 404, description = "User not found"),
        (status = 502, description = "Store rejected the update; nothing changed")
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_user_status(
    state: web::Data<AppState>,
    admin: web::ReqData<Claims>,
    path: web::Path<String>,
    request: web::Json<StatusUpdateRequest>,
) -> HttpResponse {
    metrics::increment_request_count();
    let id = path.into_inner();

    let status = match request.status.parse::<UserStatus>() {
        Ok(status) => status,
        Err(e) => return error_response(&e),
    };

    let record = match state.users.find(&id).await {
        Ok(record) => record,
        Err(e) => return error_response(&e),
    };

    let mut detail = UserDetailView::open(record);
    let users = &state.users;
    let change = detail.select_status(status, |id, status| {
        let id = id.to_string();
        async move { users.change_status(&id, status).await }
    });

    let Some(change) = change else {
        return HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "changed": false,
            "user": detail.render()
        }));
    };

    match change.await {
        Ok(updated) => {
            metrics::increment_status_update_count();
            log::info!("✅ {} set user {} to {}", admin.sub, id, status);
            detail.reconcile(&updated);
            HttpResponse::Ok().json(serde_json::json!({
                "success": true,
                "changed": true,
                "user": detail.render()
            }))
        }
        Err(e) => update_failed_response(&e, &detail),
    }
}

fn update_failed_response(error: &AppError, detail: &UserDetailView) -> HttpResponse {
    metrics::increment_error_count();
    HttpResponse::build(status_for(error)).json(serde_json::json!({
        "success": false,
        "error": error.public_message(),
        "user": detail.render()
    }))
}
