use std::env;

use crate::utils::AppError;

const DEFAULT_JWT_SECRET: &str = "default-secret-change-me";

/// Where user documents live
#[derive(Debug, Clone, PartialEq)]
pub enum StoreBackend {
    MongoDB { url: String },
    /// Optional JSON file with the initial documents
    Memory { seed_file: Option<String> },
}

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub jwt_audience: String,
    pub token_ttl_hours: i64,
    pub admin_user_id: String,
    pub admin_email: String,
    pub admin_name: String,
    /// bcrypt hash of the admin password
    pub admin_password_hash: String,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_issuer", &self.jwt_issuer)
            .field("jwt_audience", &self.jwt_audience)
            .field("token_ttl_hours", &self.token_ttl_hours)
            .field("admin_user_id", &self.admin_user_id)
            .field("admin_email", &self.admin_email)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub store: StoreBackend,
    pub users_collection: String,
    pub auth: AuthConfig,
    pub frontend_url: String,
    pub login_route: String,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key/value source; empty values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let get_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let port = get_or("PORT", "3002")
            .parse::<u16>()
            .map_err(|e| AppError::ConfigError(format!("PORT: {}", e)))?;

        let store = match get_or("STORE_BACKEND", "mongodb").to_lowercase().as_str() {
            "mongodb" | "mongo" => StoreBackend::MongoDB {
                url: get("DATABASE_URL").ok_or_else(|| {
                    AppError::ConfigError("DATABASE_URL must be set when STORE_BACKEND=mongodb".into())
                })?,
            },
            "memory" => StoreBackend::Memory {
                seed_file: get("MEMORY_SEED_FILE"),
            },
            other => {
                return Err(AppError::ConfigError(format!(
                    "Unknown STORE_BACKEND '{}'. Supported: mongodb, memory",
                    other
                )))
            }
        };

        // O segredo de desenvolvimento só vale para o store em memória
        let jwt_secret = match (get("JWT_SECRET"), &store) {
            (Some(secret), _) => secret,
            (None, StoreBackend::Memory { .. }) => {
                log::warn!("⚠️  JWT_SECRET not set, using the built-in development secret");
                DEFAULT_JWT_SECRET.to_string()
            }
            (None, StoreBackend::MongoDB { .. }) => {
                return Err(AppError::ConfigError(
                    "JWT_SECRET must be set when STORE_BACKEND=mongodb".into(),
                ))
            }
        };

        let token_ttl_hours = get_or("JWT_TTL_HOURS", "24")
            .parse::<i64>()
            .ok()
            .filter(|h| *h > 0)
            .ok_or_else(|| AppError::ConfigError("JWT_TTL_HOURS must be a positive integer".into()))?;

        let admin_password_hash = match (get("ADMIN_PASSWORD_HASH"), get("ADMIN_PASSWORD")) {
            (Some(hash), _) => hash,
            (None, Some(plain)) => {
                let cost = get("BCRYPT_COST")
                    .and_then(|c| c.parse::<u32>().ok())
                    .unwrap_or(bcrypt::DEFAULT_COST);
                log::warn!("⚠️  ADMIN_PASSWORD given in plain text; hashing it at startup");
                bcrypt::hash(plain, cost)
                    .map_err(|e| AppError::ConfigError(format!("Failed to hash ADMIN_PASSWORD: {}", e)))?
            }
            (None, None) => {
                return Err(AppError::ConfigError(
                    "ADMIN_PASSWORD_HASH or ADMIN_PASSWORD must be set".into(),
                ))
            }
        };

        let mut login_route = get_or("LOGIN_ROUTE", "/login");
        if !login_route.starts_with('/') {
            login_route.insert(0, '/');
        }

        Ok(AppConfig {
            host: get_or("HOST", "0.0.0.0"),
            port,
            store,
            users_collection: get_or("USERS_COLLECTION", "users"),
            auth: AuthConfig {
                jwt_secret,
                jwt_issuer: get_or("JWT_ISSUER", "applicant-admin-service"),
                jwt_audience: get_or("JWT_AUDIENCE", "applicant-admin"),
                token_ttl_hours,
                admin_user_id: get_or("ADMIN_USER_ID", "admin"),
                admin_email: get_or("ADMIN_EMAIL", "admin@admin.com"),
                admin_name: get_or("ADMIN_NAME", "Admin User"),
                admin_password_hash,
            },
            frontend_url: get_or("FRONTEND_URL", "").trim_end_matches('/').to_string(),
            login_route,
            cors_origins: get_or("CORS_ORIGINS", "http://localhost:3000,http://localhost:5173")
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
        })
    }

    /// Redirect target for anyone who is not the admin
    pub fn login_redirect(&self) -> String {
        format!("{}{}", self.frontend_url, self.login_route)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
