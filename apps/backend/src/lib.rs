pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post, put},
    Router,
};
use recall_core::Scheduler;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::db::Database;
use crate::services::storage::StorageService;

/// Room for request overhead on top of the image size limit
const BODY_LIMIT_SLACK: usize = 64 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Database>,
    pub storage: Option<Arc<StorageService>>,
    pub config: Arc<Config>,
    pub scheduler: Arc<Scheduler>,
}

impl AppState {
    pub fn new(db: Database, storage: Option<StorageService>, config: Config) -> Self {
        Self {
            db: Arc::new(db),
            storage: storage.map(Arc::new),
            config: Arc::new(config),
            scheduler: Arc::new(Scheduler::default()),
        }
    }
}

/// Build the full router: public auth routes plus everything behind the
/// session middleware.
pub fn app(state: AppState) -> Router {
    let protected_routes = Router::new()
        // Account routes
        .route("/api/auth/logout", post(routes::auth::logout))
        .route("/api/auth/me", get(routes::auth::me))
        // Collection routes
        .route(
            "/api/collections",
            get(routes::collections::list).post(routes::collections::create),
        )
        .route(
            "/api/collections/:id",
            get(routes::collections::get)
                .put(routes::collections::update)
                .delete(routes::collections::delete),
        )
        .route(
            "/api/collections/:id/cards",
            get(routes::collections::list_cards).post(routes::collections::create_card),
        )
        // Card routes
        .route(
            "/api/cards/:id",
            get(routes::cards::get)
                .put(routes::cards::update)
                .delete(routes::cards::delete),
        )
        .route("/api/cards/:id/reviews", get(routes::cards::reviews))
        .route(
            "/api/cards/:id/image",
            put(routes::images::upload)
                .get(routes::images::download)
                .delete(routes::images::delete),
        )
        // Study routes
        .route("/api/study/due", get(routes::study::due))
        .route("/api/study/review", post(routes::study::review))
        .route("/api/study/stats", get(routes::study::stats))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            routes::auth::auth_middleware,
        ));

    let body_limit = state.config.max_image_bytes + BODY_LIMIT_SLACK;

    Router::new()
        .route("/health", get(health_check))
        .route("/api/auth/register", post(routes::auth::register))
        .route("/api/auth/login", post(routes::auth::login))
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    tracing::info!("Connecting to database...");
    let db = Database::connect(&config.database_url, config.database_max_connections).await?;

    tracing::info!("Running migrations...");
    db.run_migrations().await?;

    let storage = StorageService::from_env()?;
    if storage.is_some() {
        tracing::info!("S3 image storage enabled");
    } else {
        tracing::warn!("S3_BUCKET not set, card image endpoints are disabled");
    }

    let addr = config.bind_addr();
    let state = AppState::new(db, storage, config);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state)).await?;

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}
