use bcrypt::verify;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::utils::AppError;

/// Role claim that unlocks the admin routes
pub const ADMIN_ROLE: &str = "admin";

// JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // admin user id
    pub email: String,
    pub name: Option<String>,
    pub roles: Vec<String>,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
    pub aud: String,
    pub iss: String,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == ADMIN_ROLE)
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct AuthResponse {
    pub success: bool,
    pub token: String,
    /// Unix timestamp
    pub expires_at: i64,
    pub user: UserInfo,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct UserInfo {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub roles: Vec<String>,
}

impl From<&Claims> for UserInfo {
    fn from(claims: &Claims) -> Self {
        UserInfo {
            id: claims.sub.clone(),
            email: claims.email.clone(),
            name: claims.name.clone(),
            roles: claims.roles.clone(),
        }
    }
}

/// Issues a token for the configured admin. Returns the token and its expiry.
pub fn generate_jwt(config: &AuthConfig) -> Result<(String, i64), AppError> {
    let now = Utc::now();
    let exp = now + Duration::hours(config.token_ttl_hours);

    let claims = Claims {
        sub: config.admin_user_id.clone(),
        email: config.admin_email.clone(),
        name: Some(config.admin_name.clone()),
        roles: vec![ADMIN_ROLE.to_string()],
        iat: now.timestamp() as usize,
        exp: exp.timestamp() as usize,
        jti: Uuid::new_v4().to_string(),
        aud: config.jwt_audience.clone(),
        iss: config.jwt_issuer.clone(),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_ref()),
    )
    .map_err(|e| AppError::ConfigError(format!("Failed to generate token: {}", e)))?;

    Ok((token, exp.timestamp()))
}

// Verify JWT token
pub fn verify_token(config: &AuthConfig, token: &str) -> Result<Claims, AppError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_audience(&[config.jwt_audience.as_str()]);

    let mut issuers = HashSet::new();
    issuers.insert(config.jwt_issuer.clone());
    validation.iss = Some(issuers);

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.jwt_secret.as_ref()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

/// Token from an `Authorization: Bearer ...` header value
pub fn bearer_token(header_value: &str) -> Option<&str> {
    header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Admin login. Only the configured identity can sign in; anyone else gets
/// the same "Invalid credentials" answer.
pub async fn login(config: &AuthConfig, request: &LoginRequest) -> Result<AuthResponse, AppError> {
    if !request.email.trim().eq_ignore_ascii_case(&config.admin_email) {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    // bcrypt é CPU-bound: fora do executor
    let password = request.password.clone();
    let hash = config.admin_password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || verify(password, &hash))
        .await
        .map_err(|e| AppError::ConfigError(format!("Task join error: {}", e)))?
        .map_err(|e| AppError::ConfigError(format!("Password verification error: {}", e)))?;

    if !valid {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    let (token, expires_at) = generate_jwt(config)?;

    Ok(AuthResponse {
        success: true,
        token,
        expires_at,
        user: UserInfo {
            id: config.admin_user_id.clone(),
            email: config.admin_email.clone(),
            name: Some(config.admin_name.clone()),
            roles: vec![ADMIN_ROLE.to_string()],
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;

    #[tokio::test]
    async fn admin_can_log_in() {
        let config = test_config().auth;
        let request = LoginRequest {
            email: "Admin@Admin.com".into(),
            password: "secret".into(),
        };

        let response = login(&config, &request).await.unwrap();
        assert!(response.success);
        assert_eq!(response.user.id, "admin-uid");

        let claims = verify_token(&config, &response.token).unwrap();
        assert_eq!(claims.sub, "admin-uid");
        assert!(claims.is_admin());
        assert_eq!(claims.exp as i64, response.expires_at);
    }

    #[tokio::test]
    async fn wrong_password_or_email_is_rejected() {
        let config = test_config().auth;

        let bad_password = LoginRequest { email: "admin@admin.com".into(), password: "nope".into() };
        assert!(matches!(login(&config, &bad_password).await, Err(AppError::Unauthorized(_))));

        let other_user = LoginRequest { email: "someone@x.com".into(), password: "secret".into() };
        assert!(matches!(login(&config, &other_user).await, Err(AppError::Unauthorized(_))));
    }

    #[test]
    fn token_from_another_issuer_is_rejected() {
        let config = test_config().auth;
        let (token, _) = generate_jwt(&config).unwrap();

        let mut other = config.clone();
        other.jwt_issuer = "someone-else".into();
        assert!(verify_token(&other, &token).is_err());

        let mut other = config.clone();
        other.jwt_secret = "different".into();
        assert!(verify_token(&other, &token).is_err());
    }

    #[test]
    fn bearer_header_parsing() {
        assert_eq!(bearer_token("Bearer abc.def"), Some("abc.def"));
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Basic abc"), None);
    }

    #[test]
    fn role_claim_decides_admin() {
        let claims = Claims {
            sub: "x".into(),
            email: String::new(),
            name: None,
            roles: vec!["user".into()],
            iat: 0,
            exp: 0,
            jti: String::new(),
            aud: String::new(),
            iss: String::new(),
        };
        assert!(!claims.is_admin());
    }
}
