use actix_web::{http::header, web, HttpRequest, HttpResponse};

use crate::api::error_response;
use crate::services::auth_service::{self, AuthResponse, Claims, LoginRequest, UserInfo};
use crate::state::AppState;
use crate::utils::AppError;

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(state: web::Data<AppState>, request: web::Json<LoginRequest>) -> HttpResponse {
    log::info!("🔐 POST /auth/login - email: {}", request.email);

    match auth_service::login(&state.config.auth, &request).await {
        Ok(response) => {
            log::info!("✅ Login successful: {}", request.email);
            HttpResponse::Ok().json(response)
        }
        Err(e) => {
            log::warn!("❌ Login failed: {} - {}", request.email, e);
            error_response(&e)
        }
    }
}

fn claims_from_request(state: &AppState, req: &HttpRequest) -> Result<Claims, AppError> {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::InvalidRequest("No valid Authorization header".into()))?;

    let token = auth_service::bearer_token(header_value)
        .ok_or_else(|| AppError::InvalidRequest("No valid Authorization header".into()))?;

    auth_service::verify_token(&state.config.auth, token)
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/verify",
    tag = "Auth",
    responses(
        (status = 200, description = "Token is valid"),
        (status = 400, description = "Missing Authorization header"),
        (status = 401, description = "Invalid or expired token")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn verify_token(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    log::info!("✓ GET /auth/verify");

    match claims_from_request(&state, &req) {
        Ok(claims) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "valid": true,
            "user_id": claims.sub,
            "admin": claims.is_admin(),
            "exp": claims.exp
        })),
        Err(e) => {
            log::warn!("❌ Token verification failed: {}", e);
            error_response(&e)
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "Auth",
    responses(
        (status = 200, description = "Identity carried by the token", body = UserInfo),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn get_me(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    log::info!("👤 GET /auth/me");

    match claims_from_request(&state, &req) {
        Ok(claims) => HttpResponse::Ok().json(serde_json::json!({
            "success": true,
            "user": UserInfo::from(&claims)
        })),
        Err(e) => error_response(&e),
    }
}

#[cfg(test)]
mod tests {
    use crate::api::tests::{test_app, test_state};
    use crate::store::InMemoryUserStore;
    use actix_web::{http::header, test};
    use serde_json::Value;

    #[actix_web::test]
    async fn login_then_me() {
        let state = test_state(InMemoryUserStore::new()).await;
        let app = test::init_service(test_app(state)).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .set_json(serde_json::json!({ "email": "admin@admin.com", "password": "secret" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["success"], true);
        let token = body["token"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri("/api/v1/auth/me")
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["user"]["id"], "admin-uid");
        assert_eq!(body["user"]["roles"][0], "admin");
    }

    #[actix_web::test]
    async fn bad_login_is_unauthorized() {
        let state = test_state(InMemoryUserStore::new()).await;
        let app = test::init_service(test_app(state)).await;

        let req = test::TestRequest::post()
            .uri("/api/v1/auth/login")
            .set_json(serde_json::json!({ "email": "admin@admin.com", "password": "wrong" }))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 401);
    }

    #[actix_web::test]
    async fn verify_without_header_is_bad_request() {
        let state = test_state(InMemoryUserStore::new()).await;
        let app = test::init_service(test_app(state)).await;

        let req = test::TestRequest::get().uri("/api/v1/auth/verify").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 400);
    }
}
