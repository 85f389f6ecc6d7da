//! # chatimg: image uploads for chat clients
//!
//! `chatimg` is a small HTTP service that accepts an image uploaded from a chat client, stores
//! it on the local filesystem, records it in PostgreSQL and answers with the absolute URL the
//! image can be fetched from.
//!
//! ## Request Flow
//!
//! A client posts a `multipart/form-data` body with an `image` file part to the upload route
//! (`/server/upload` by default). The handler in [`api::handlers::upload`]:
//!
//! 1. rejects the request if there is no `image` file part,
//! 2. derives the stored filename (`<unix-seconds>_<client basename>` by default),
//! 3. makes sure the upload directory exists,
//! 4. writes the bytes,
//! 5. builds `http://<host><route directory>/<upload directory>/<filename>`,
//! 6. opens a database connection and inserts `(filename, url)` into `chat_images`,
//! 7. answers `{"success": true, "url": ...}`.
//!
//! Every failure answers HTTP 500 with `{"success": false, "error": ...}`. The file write and the
//! insert are independent: a failed insert leaves the file on disk unless
//! `uploads.remove_orphans` is enabled.
//!
//! Stored images are served back read-only under the same path the returned URL points at.
//!
//! ## Quick Start
//!
//! ```no_run
//! use clap::Parser;
//! use chatimg::{Application, Config};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let args = chatimg::config::Args::parse();
//!     let config = Config::load(&args)?;
//!
//!     chatimg::telemetry::init_telemetry(config.enable_otel_export)?;
//!
//!     let app = Application::new(config).await?;
//!     app.serve(async {
//!         tokio::signal::ctrl_c().await.expect("Failed to listen for Ctrl+C");
//!     })
//!     .await
//! }
//! ```
//!
//! ## Configuration
//!
//! See the [`config`] module for configuration options.

pub mod api;
pub mod config;
pub mod db;
pub mod errors;
pub mod naming;
pub mod telemetry;

#[cfg(test)]
pub mod test_utils;

use crate::api::handlers::upload::upload_image;
use crate::config::{CorsOrigin, HEALTH_PATH};
use crate::db::handlers::{ChatImageStore, ImageStorage, LocalImageStorage};
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, header};
use axum::{
    Router,
    routing::{get, post},
};
use bon::Builder;
pub use config::Config;
use sqlx::Connection;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{Level, debug, info, instrument};

/// Application state shared across all request handlers.
///
/// - `config`: Application configuration loaded from environment/files
/// - `storage`: Where uploaded bytes are written
/// - `store`: Connection settings for recording uploads; connects per request
///
/// # Example
///
/// ```ignore
/// let state = AppState::builder()
///     .config(config)
///     .storage(Arc::new(LocalImageStorage::new(dir)))
///     .store(ChatImageStore::new(&config.database)?)
///     .build();
/// ```
#[derive(Clone, Builder)]
pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn ImageStorage>,
    pub store: ChatImageStore,
}

/// Get the chatimg database migrator
pub fn migrator() -> sqlx::migrate::Migrator {
    sqlx::migrate!("./migrations")
}

/// Create CORS layer from configuration.
///
/// Only `POST` with a `Content-Type` header is allowed cross-origin.
fn create_cors_layer(config: &Config) -> anyhow::Result<CorsLayer> {
    let origins = &config.cors.allowed_origins;

    let allow_origin = if origins.iter().any(|origin| matches!(origin, CorsOrigin::Wildcard)) {
        AllowOrigin::any()
    } else {
        let mut values = Vec::new();
        for origin in origins {
            if let CorsOrigin::Url(url) = origin {
                // Browsers send the bare origin, without the trailing slash Url adds
                values.push(url.origin().ascii_serialization().parse::<HeaderValue>()?);
            }
        }
        AllowOrigin::list(values)
    };

    let mut cors = CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    if let Some(max_age) = config.cors.max_age {
        cors = cors.max_age(std::time::Duration::from_secs(max_age));
    }

    Ok(cors)
}

/// Build the application router.
///
/// - `POST <uploads.route>`: the image upload
/// - `GET <uploads.media_path()>/*`: stored images, served from the upload directory
/// - `GET /healthz`: liveness probe
///
/// Request bodies have no size limit. CORS and HTTP tracing wrap every route.
#[instrument(skip_all)]
pub fn build_router(state: AppState) -> anyhow::Result<Router> {
    let uploads = &state.config.uploads;
    let media_path = uploads.media_path();
    debug!(route = %uploads.route, media_path = %media_path, "Mounting upload routes");

    let cors_layer = create_cors_layer(&state.config)?;
    let media = ServeDir::new(uploads.storage_dir());

    let router = Router::new()
        .route(HEALTH_PATH, get(|| async { "OK" }))
        .route(&uploads.route, post(upload_image))
        .nest_service(&media_path, media)
        .layer(DefaultBodyLimit::disable())
        .layer(cors_layer)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_request(DefaultOnRequest::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .with_state(state);

    Ok(router)
}

/// Apply the bundled migrations over a single short-lived connection
async fn run_migrations(store: &ChatImageStore) -> anyhow::Result<()> {
    let mut conn = store.connect().await?;
    migrator().run(&mut conn).await?;
    conn.close().await?;
    Ok(())
}

/// The chatimg server.
///
/// 1. **Create**: [`Application::new`] validates the store settings, optionally runs
///    migrations and builds the router
/// 2. **Serve**: [`Application::serve`] binds to a TCP port and starts handling requests
/// 3. **Shutdown**: When the shutdown signal is received, in-flight uploads finish and telemetry
///    is flushed
pub struct Application {
    router: Router,
    config: Config,
}

impl Application {
    /// Create a new application instance with all resources initialized
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        // Not the whole config: database.url carries credentials
        debug!(
            route = %config.uploads.route,
            storage_dir = %config.uploads.storage_dir().display(),
            filename_strategy = ?config.uploads.filename_strategy,
            remove_orphans = config.uploads.remove_orphans,
            "Starting chatimg"
        );

        let store = ChatImageStore::new(&config.database)?;
        if config.database.run_migrations {
            info!("Running database migrations");
            run_migrations(&store).await?;
        }

        let storage: Arc<dyn ImageStorage> = Arc::new(LocalImageStorage::new(config.uploads.storage_dir()));
        let app_state = AppState::builder().config(config.clone()).storage(storage).store(store).build();
        let router = build_router(app_state)?;

        Ok(Self { router, config })
    }

    /// Convert application into a test server (for tests)
    #[cfg(test)]
    pub fn into_test_server(self) -> axum_test::TestServer {
        axum_test::TestServer::new(self.router).expect("Failed to create test server")
    }

    /// Start serving the application
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!(
            "chatimg listening on http://{}, uploads accepted at {}",
            bind_addr, self.config.uploads.route
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Shutting down telemetry...");
        telemetry::shutdown_telemetry();

        Ok(())
    }
}
