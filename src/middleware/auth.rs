use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    web, Error, HttpMessage, HttpResponse,
};
use futures::future::LocalBoxFuture;
use std::future::{ready, Ready};

use crate::services::auth_service::{self, Claims};
use crate::state::AppState;

const FALLBACK_LOGIN_ROUTE: &str = "/login";

/// Lets a request through only when it carries a valid token with the admin
/// role claim. Everyone else is sent to the login route with `303 See Other`
/// before any handler (and therefore any store read) runs.
pub struct AdminGuard;

impl<S, B> Transform<S, ServiceRequest> for AdminGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type InitError = ();
    type Transform = AdminGuardService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AdminGuardService { service }))
    }
}

pub struct AdminGuardService<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for AdminGuardService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();

        let claims = state.as_ref().and_then(|state| {
            let header_value = req.headers().get(header::AUTHORIZATION)?.to_str().ok()?;
            let token = auth_service::bearer_token(header_value)?;
            match auth_service::verify_token(&state.config.auth, token) {
                Ok(claims) => Some(claims),
                Err(e) => {
                    log::debug!("🔒 {} {}: {}", req.method(), req.path(), e);
                    None
                }
            }
        });

        match claims.filter(Claims::is_admin) {
            Some(claims) => {
                req.extensions_mut().insert(claims);
                let fut = self.service.call(req);
                Box::pin(async move { fut.await.map(ServiceResponse::map_into_left_body) })
            }
            None => {
                let location = state
                    .map(|state| state.config.login_redirect())
                    .unwrap_or_else(|| FALLBACK_LOGIN_ROUTE.to_string());
                log::info!("🔒 {} {} -> redirect to {}", req.method(), req.path(), location);

                let (request, _) = req.into_parts();
                let response = HttpResponse::SeeOther()
                    .insert_header((header::LOCATION, location))
                    .finish()
                    .map_into_right_body();
                Box::pin(async move { Ok(ServiceResponse::new(request, response)) })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::tests::{admin_token, test_app, test_state};
    use crate::store::InMemoryUserStore;
    use actix_web::test;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token_with_roles(state: &AppState, roles: &[&str]) -> String {
        let auth = &state.config.auth;
        let now = chrono::Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: "someone".into(),
            email: "someone@x.com".into(),
            name: None,
            roles: roles.iter().map(|r| r.to_string()).collect(),
            iat: now,
            exp: now + 3600,
            jti: "t".into(),
            aud: auth.jwt_audience.clone(),
            iss: auth.jwt_issuer.clone(),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(auth.jwt_secret.as_ref())).unwrap()
    }

    #[actix_web::test]
    async fn signed_in_non_admin_is_redirected() {
        let state = test_state(InMemoryUserStore::new()).await;
        let token = token_with_roles(&state, &["user"]);
        let app = test::init_service(test_app(state)).await;

        let req = test::TestRequest::get()
            .uri("/api/v1/admin/stats")
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
            .to_request();
        let res = test::call_service(&app, req).await;

        assert_eq!(res.status(), 303);
        assert_eq!(res.headers().get(header::LOCATION).unwrap(), "/login");
    }

    #[actix_web::test]
    async fn garbage_token_is_redirected() {
        let state = test_state(InMemoryUserStore::new()).await;
        let app = test::init_service(test_app(state)).await;

        let req = test::TestRequest::get()
            .uri("/api/v1/admin/users/u1")
            .insert_header((header::AUTHORIZATION, "Bearer not-a-jwt"))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 303);
    }

    #[actix_web::test]
    async fn admin_passes_through() {
        let state = test_state(InMemoryUserStore::new()).await;
        let token = admin_token(&state);
        let app = test::init_service(test_app(state)).await;

        let req = test::TestRequest::get()
            .uri("/api/v1/admin/stats")
            .insert_header((header::AUTHORIZATION, format!("Bearer {}", token)))
            .to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 200);
    }

    #[actix_web::test]
    async fn public_routes_need_no_token() {
        let state = test_state(InMemoryUserStore::new()).await;
        let app = test::init_service(test_app(state)).await;

        let req = test::TestRequest::get().uri("/health").to_request();
        let res = test::call_service(&app, req).await;
        assert_eq!(res.status(), 200);
    }
}
