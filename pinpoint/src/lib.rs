//! # pinpoint: Photo Forensics & Geolocation Service
//!
//! `pinpoint` is a consumer-facing web service that accepts a photo upload,
//! submits it to a multimodal inference backend for forensic and geolocation
//! analysis, and returns a structured textual report. Around that core it
//! provides account management (registration, login, logout), a credit-based
//! metering system with a one-shot anonymous trial, and a pricing catalog.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for
//! the HTTP layer and uses PostgreSQL for all persistence needs.
//!
//! ### Request Flow
//!
//! An analysis request (`POST /api/v1/analyses`) first passes the access
//! gate ([`gate`]), which re-reads authoritative account or trial state from
//! the database. Admitted requests are normalized and forwarded to the
//! inference backend by the [`analysis`] invoker; afterwards usage is
//! settled (a credit consumed, the trial recorded, or nothing for paid
//! plans). Settlement deliberately re-checks state so concurrent requests
//! can never spend the same credit twice.
//!
//! Authentication (`/authentication/*`) is native email/password: Argon2id
//! hashes at rest, JWT session cookies on the wire. Handlers extract the
//! session via [`api::models::accounts::CurrentAccount`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use pinpoint::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = pinpoint::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     pinpoint::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Database Setup
//!
//! The application requires a PostgreSQL database and automatically runs
//! migrations on startup:
//!
//! ```no_run
//! # use sqlx::PgPool;
//! # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
//! pinpoint::migrator().run(&pool).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.
pub mod analysis;
pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod gate;
mod openapi;
pub mod telemetry;
mod types;

#[cfg(test)]
pub mod test_utils;

use crate::config::CorsOrigin;
use crate::openapi::ApiDoc;
use analysis::AnalysisInvoker;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::{
    http,
    routing::{get, post},
    Router,
};
use bon::Builder;
pub use config::Config;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{debug, info, instrument, Level};
use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

pub use types::AccountId;

/// Uploads larger than this are rejected before reaching the handler.
const MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;

/// Application state shared across all request handlers.
///
/// # Fields
///
/// - `db`: PostgreSQL connection pool
/// - `config`: Application configuration loaded from environment/files
/// - `analyzer`: Client for the inference backend
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
    pub analyzer: AnalysisInvoker,
}

/// Get the pinpoint database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Connect to PostgreSQL using the configured pool settings and run
/// migrations.
async fn setup_database(config: &Config) -> anyhow::Result<PgPool> {
    let pool_settings = &config.database.pool;

    let mut options = PgPoolOptions::new()
        .max_connections(pool_settings.max_connections)
        .min_connections(pool_settings.min_connections)
        .acquire_timeout(std::time::Duration::from_secs(pool_settings.acquire_timeout_secs));

    if pool_settings.idle_timeout_secs > 0 {
        options = options.idle_timeout(std::time::Duration::from_secs(pool_settings.idle_timeout_secs));
    }
    if pool_settings.max_lifetime_secs > 0 {
        options = options.max_lifetime(std::time::Duration::from_secs(pool_settings.max_lifetime_secs));
    }

    let pool = options.connect(&config.database.url).await?;
    migrator().run(&pool).await?;

    Ok(pool)
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let mut origins = Vec::new();
    for origin in &config.auth.security.cors.allowed_origins {
        let header_value = match origin {
            CorsOrigin::Wildcard => "*".parse::<HeaderValue>()?,
            CorsOrigin::Url(url) => url.as_str().parse::<HeaderValue>()?,
        };
        origins.push(header_value);
    }

    let mut cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(config.auth.security.cors.allow_credentials)
        .expose_headers(vec![http::header::LOCATION]);

    if let Some(max_age) = config.auth.security.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the main application router with all endpoints and middleware.
///
/// This function constructs the complete Axum router with:
/// - Authentication routes (registration, login, logout)
/// - API routes (account, analyses, plans)
/// - OpenAPI documentation via RapiDoc
/// - CORS configuration
/// - Tracing middleware
#[instrument(skip_all)]
pub fn build_router(state: &AppState) -> anyhow::Result<Router> {
    // Authentication routes (at root level, matching browser conventions)
    let auth_routes = Router::new()
        .route(
            "/authentication/register",
            get(api::handlers::auth::get_registration_info).post(api::handlers::auth::register),
        )
        .route(
            "/authentication/login",
            get(api::handlers::auth::get_login_info).post(api::handlers::auth::login),
        )
        .route("/authentication/logout", post(api::handlers::auth::logout))
        .with_state(state.clone());

    // API routes
    let api_routes = Router::new()
        .route("/account", get(api::handlers::accounts::get_account))
        .route(
            "/analyses",
            post(api::handlers::analyses::create_analysis).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/plans", get(api::handlers::plans::list_plans))
        .with_state(state.clone());

    let router = Router::new()
        .route("/healthz", get(|| async { "OK" }))
        .merge(auth_routes)
        .nest("/api/v1", api_routes)
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/docs"));

    // Create CORS layer from config
    let cors_layer = create_cors_layer(&state.config)?;
    let router = router.layer(cors_layer);

    // Add tracing layer
    let router = router.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(DefaultOnResponse::new().level(Level::INFO)),
    );

    Ok(router)
}

/// Main application struct that owns all resources and lifecycle.
///
/// # Lifecycle
///
/// 1. **Create**: [`Application::new`] connects to the database, runs
///    migrations and builds the router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts
///    handling requests
/// 3. **Shutdown**: When the shutdown signal resolves, the server drains
///    in-flight requests and closes the pool
pub struct Application {
    router: Router,
    config: Config,
    pool: PgPool,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        debug!("Starting pinpoint with configuration: {:#?}", config);

        let pool = setup_database(&config).await?;
        Self::new_with_pool(config, pool).await
    }

    /// Create an application on an existing pool (migrations already run).
    pub async fn new_with_pool(config: Config, pool: PgPool) -> anyhow::Result<Self> {
        let analyzer = AnalysisInvoker::from_config(&config.inference)?;

        let app_state = AppState::builder().db(pool.clone()).config(config.clone()).analyzer(analyzer).build();

        let router = build_router(&app_state)?;

        Ok(Self { router, config, pool })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router.into_make_service_with_connect_info::<SocketAddr>())
            .expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "Pinpoint listening on http://{}, available at http://localhost:{}",
            bind_addr, self.config.port
        );

        // ConnectInfo gives the trial gate a peer address when no
        // forwarded-for header is present
        axum::serve(listener, self.router.into_make_service_with_connect_info::<SocketAddr>())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Closing database connections...");
        self.pool.close().await;

        Ok(())
    }
}
