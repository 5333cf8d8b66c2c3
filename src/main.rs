mod api;
mod config;
mod database;
mod jobs;
mod middleware;
mod models;
mod services;
mod state;
mod store;
mod utils;
mod views;

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use dotenv::dotenv;
use std::io;
use std::sync::Arc;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use config::{AppConfig, StoreBackend};
use state::AppState;
use store::{InMemoryUserStore, MongoUserStore, UserStore};
use utils::AppError;

async fn build_store(config: &AppConfig) -> Result<Arc<dyn UserStore>, AppError> {
    match &config.store {
        StoreBackend::MongoDB { url } => {
            let db = database::MongoDB::new(url, &config.users_collection).await?;
            log::info!("✅ MongoDB connected successfully");
            Ok(Arc::new(MongoUserStore::new(db, config.users_collection.clone())))
        }
        StoreBackend::Memory { seed_file: Some(path) } => {
            let json = std::fs::read_to_string(path)
                .map_err(|e| AppError::ConfigError(format!("MEMORY_SEED_FILE {}: {}", path, e)))?;
            let store = InMemoryUserStore::from_json(&json)?;
            log::info!("🧪 In-memory store seeded from {}", path);
            Ok(Arc::new(store))
        }
        StoreBackend::Memory { seed_file: None } => {
            log::warn!("🧪 In-memory store starts empty (MEMORY_SEED_FILE not set)");
            Ok(Arc::new(InMemoryUserStore::new()))
        }
    }
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    // Load environment variables
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env().map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    log::info!("🚀 Starting Applicant Admin Service...");
    log::info!("🔐 Auth: {:?}", config.auth);

    let store = build_store(&config)
        .await
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e.to_string()))?;

    // Monta o painel: primeira carga da lista + contadores ao vivo
    let bind_address = config.bind_address();
    let cors_origins = config.cors_origins.clone();
    let state = web::Data::new(AppState::mount(config, store).await);

    log::info!("🌐 Server starting on {}", bind_address);
    log::info!("📚 Swagger UI available at: http://{}/swagger-ui/", bind_address);
    log::info!("📄 OpenAPI spec at: http://{}/api-docs/openapi.json", bind_address);

    let app_state = state.clone();
    HttpServer::new(move || {
        let cors = cors_origins
            .iter()
            .fold(Cors::default(), |cors, origin| cors.allowed_origin(origin))
            .allowed_methods(vec!["GET", "POST", "PATCH", "OPTIONS"])
            .allowed_headers(vec![
                actix_web::http::header::AUTHORIZATION,
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::ACCEPT,
                actix_web::http::header::CACHE_CONTROL,
            ])
            .expose_headers(vec![
                actix_web::http::header::CONTENT_TYPE,
                actix_web::http::header::LOCATION,
            ])
            .supports_credentials()
            .max_age(3600);

        // Generate OpenAPI specification
        let openapi = api::swagger::ApiDoc::openapi();

        App::new()
            .app_data(app_state.clone())
            .wrap(cors)
            .wrap(middleware::SecurityHeaders)
            .wrap(Logger::default())
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", openapi)
            )
            .configure(api::configure)
    })
    .bind(&bind_address)?
    .run()
    .await?;

    log::info!("🛑 Server stopped, unmounting dashboard");
    state.unmount().await;

    Ok(())
}
