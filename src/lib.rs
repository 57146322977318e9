//! # dekarpio: energy-system simulation configuration backend
//!
//! `dekarpio` is the REST backend of a web application for configuring and
//! reviewing energy-system simulations. Users authenticate, edit structured
//! simulation configurations (a nested unit-type -> unit-id -> parameter
//! graph driven by an SVG diagram on the frontend), persist them, submit
//! them to an external validation/processing service, and read back results.
//!
//! ## Architecture
//!
//! The application is built on [Axum](https://github.com/tokio-rs/axum) for
//! the HTTP layer and uses PostgreSQL for persistence.
//!
//! ### Request Flow
//!
//! HTTP request -> router -> middleware (trace, CORS, response timer) ->
//! handler -> repository -> record store -> database; the response flows
//! back inverted. Handlers authenticate via a bearer-token extractor,
//! acquire one pooled connection for the duration of the request, and let
//! errors propagate to a single boundary that maps them onto an HTTP status
//! and a JSON `{error}` body.
//!
//! ### Core Components
//!
//! The **API layer** ([`api`]) exposes the REST surface under `/api`:
//! authentication, user management, studies, and the simulation
//! setup/results endpoints the frontend drives.
//!
//! The **authentication layer** ([`auth`]) issues and verifies JWT bearer
//! tokens carrying `{id, admin, email}` claims and handles salted one-way
//! password hashing.
//!
//! The **database layer** ([`db`]) routes every table through a generic
//! [`db::store::RecordStore`]: attribute-allowlisted, parameterized query
//! construction shared by the per-table repositories.
//!
//! The **workspace** ([`workspace`]) is the simulation-configuration state
//! machine the frontend embeds: default/template schema, persisted entities,
//! one active configuration, and the touched/valid lifecycle around remote
//! validation.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use dekarpio::{Application, config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = config::Args::parse();
//!     let config = config::Config::load(&args)?;
//!
//!     dekarpio::telemetry::init_telemetry()?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await
//! }
//! ```

pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
mod openapi;
pub mod telemetry;
mod types;
pub mod workspace;

#[cfg(test)]
mod test;
#[cfg(test)]
pub mod test_utils;

use std::future::Future;
use std::time::Instant;

use axum::{
    Router,
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
    routing::{get, post, put},
};
use bon::Builder;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, instrument};
use utoipa::OpenApi;
use utoipa_scalar::{Scalar, Servable};

use crate::{
    config::Config,
    db::handlers::{Repository, Users},
    db::models::users::{UserCreateDBRequest, UserUpdateDBRequest},
    errors::Error,
    openapi::ApiDoc,
};

pub use config::Config as AppConfig;
pub use types::{SimulationId, StudyId, UserId};

/// Application state shared across all request handlers: the bounded
/// connection pool and the loaded configuration.
#[derive(Clone, Builder)]
pub struct AppState {
    pub db: PgPool,
    pub config: Config,
}

/// Get the dekarpio database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create the initial admin user if it doesn't exist.
///
/// Idempotent: creates the admin account on first startup, or refreshes its
/// password when one is configured and the account already exists.
#[instrument(skip_all)]
pub async fn create_initial_admin_user(email: &str, password: Option<&str>, db: &PgPool) -> Result<UserId, Error> {
    let password_hash = password.map(auth::password::hash_string).transpose()?;

    let mut conn = db.acquire().await.map_err(db::errors::DbError::from)?;
    let mut user_repo = Users::new(&mut conn);

    if let Some(existing) = user_repo.get_user_by_email(email).await? {
        if let Some(password_hash) = password_hash {
            user_repo
                .update(
                    existing.id,
                    &UserUpdateDBRequest {
                        password_hash: Some(password_hash),
                        ..Default::default()
                    },
                )
                .await?;
        }
        return Ok(existing.id);
    }

    let created = user_repo
        .create(&UserCreateDBRequest {
            company: "AIT".to_string(),
            email: email.to_string(),
            password_hash: password_hash.unwrap_or_default(),
            admin: true,
        })
        .await?;

    info!(email, "created initial admin user");
    Ok(created.id)
}

/// `X-Response-Time` header on every response.
async fn response_timer(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let mut response = next.run(request).await;

    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    if let Ok(value) = HeaderValue::from_str(&format!("{elapsed_ms:.3}ms")) {
        response.headers_mut().insert("x-response-time", value);
    }
    response
}

/// Create CORS layer from configuration
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    if config.cors.allowed_origins.iter().any(|origin| origin == "*") {
        return Ok(cors.allow_origin(Any));
    }

    let mut origins = Vec::new();
    for origin in &config.cors.allowed_origins {
        origins.push(origin.parse::<HeaderValue>()?);
    }
    Ok(cors.allow_origin(origins))
}

/// Build the application router with all endpoints and middleware.
///
/// Bearer auth is enforced by the `CurrentUser` extractor on every handler
/// outside `/api/auth/login`; the OpenAPI document is served at `/docs`.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let cors = create_cors_layer(&state.config)?;

    let router = Router::new()
        // Authentication
        .route("/api/auth/login", post(api::handlers::auth::login))
        .route("/api/auth/check", get(api::handlers::auth::check))
        // User management (collection listing is admin only)
        .route(
            "/api/users",
            get(api::handlers::users::list_users).post(api::handlers::users::create_user),
        )
        .route(
            "/api/users/{id}",
            get(api::handlers::users::get_user)
                .put(api::handlers::users::update_user)
                .delete(api::handlers::users::delete_user),
        )
        // Studies
        .route(
            "/api/studies",
            get(api::handlers::studies::list_studies).post(api::handlers::studies::create_study),
        )
        .route(
            "/api/studies/{id}",
            get(api::handlers::studies::get_study)
                .put(api::handlers::studies::update_study)
                .delete(api::handlers::studies::delete_study),
        )
        // Simulation configuration writes
        .route("/api/simulation-setup", post(api::handlers::simulation_setup::create_simulation))
        .route(
            "/api/simulation-setup/{id}",
            put(api::handlers::simulation_setup::update_simulation).delete(api::handlers::simulation_setup::delete_simulation),
        )
        // Simulation configuration/result reads; the external processor
        // attaches results through the PUT variant
        .route(
            "/api/simulation-results/all/{user_id}/paginated",
            get(api::handlers::simulation_results::all_for_user_paginated),
        )
        .route(
            "/api/simulation-results/all/{user_id}",
            get(api::handlers::simulation_results::all_for_user),
        )
        .route(
            "/api/simulation-results/last/{user_id}/{limit}",
            get(api::handlers::simulation_results::last_for_user),
        )
        .route(
            "/api/simulation-results/{user_id}/{simulation_id}",
            get(api::handlers::simulation_results::for_user_by_id),
        )
        // One path, two meanings, as in the original router: GET reads the
        // latest configuration for a user, PUT attaches results to a
        // simulation id.
        .route(
            "/api/simulation-results/{user_id}",
            get(api::handlers::simulation_results::latest_for_user).put(api::handlers::simulation_results::attach_results),
        )
        .merge(Scalar::with_url("/docs", ApiDoc::openapi()))
        .layer(axum::middleware::from_fn(response_timer))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    Ok(router)
}

/// The assembled application: pool, migrations, seed user, and router.
pub struct Application {
    config: Config,
    router: Router,
    pub db: PgPool,
}

impl Application {
    /// Connect to the database and assemble the application.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database.max_connections)
            .acquire_timeout(config.database.acquire_timeout)
            .connect(&config.database.url)
            .await?;

        Self::new_with_pool(config, pool).await
    }

    /// Assemble the application around an existing pool (used by tests).
    pub async fn new_with_pool(config: Config, pool: PgPool) -> anyhow::Result<Self> {
        migrator().run(&pool).await?;

        create_initial_admin_user(&config.admin_email, config.admin_password.as_deref(), &pool)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create initial admin user: {e}"))?;

        let state = AppState::builder().db(pool.clone()).config(config.clone()).build();
        let router = build_router(state)?;

        Ok(Self {
            config,
            router,
            db: pool,
        })
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until the shutdown future resolves.
    pub async fn serve(self, shutdown: impl Future<Output = ()> + Send + 'static) -> anyhow::Result<()> {
        let listener = TcpListener::bind((self.config.host.as_str(), self.config.port)).await?;
        info!("listening on {}", listener.local_addr()?);

        axum::serve(listener, self.router).with_graceful_shutdown(shutdown).await?;
        Ok(())
    }
}
