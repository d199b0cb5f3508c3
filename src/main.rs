//! cloudprov-api - Main application entry point

use actix_web::{middleware::Logger, web, App, HttpServer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cloudprov_api::config::Config;
use cloudprov_api::db::{create_pool, run_migrations};
use cloudprov_api::handlers::{configure, AppState};
use cloudprov_api::middleware::create_rate_limiter;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize tracing subscriber for structured logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cloudprov_api=info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Loading configuration...");

    let config = Config::from_env().expect("Failed to load configuration");
    let server_addr = config.server_addr();

    match config.team_server_limit {
        Some(limit) => tracing::info!(limit, "Team server limit enforced"),
        None => tracing::info!("No team server limit configured"),
    }

    let pool = create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");

    tracing::info!("Database connection pool created");

    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations completed");

    // Shared HTTP client for provider API calls; timeouts are set per request
    let http_client = reqwest::Client::builder()
        .user_agent(concat!("cloudprov-api/", env!("CARGO_PKG_VERSION")))
        .build()
        .expect("Failed to create HTTP client");

    let app_state = web::Data::new(AppState::new(config, pool, http_client));

    tracing::info!("Starting server at http://{}", server_addr);

    HttpServer::new(move || {
        // Governor doesn't implement Clone, build one per worker
        let rate_limiter = create_rate_limiter().expect("Invalid rate limiter configuration");

        App::new()
            .app_data(app_state.clone())
            // Request logging
            .wrap(Logger::default())
            // Distributed tracing
            .wrap(tracing_actix_web::TracingLogger::default())
            // Rate limiting
            .wrap(rate_limiter)
            .configure(configure)
    })
    .bind(&server_addr)?
    .run()
    .await
}
