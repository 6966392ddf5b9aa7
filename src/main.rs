//! R-Image-Styler
//!
//! Selfie styling API using Rust + Actix-Web.
//! Fans every style request out to three concurrent image-generation calls,
//! keeps whatever succeeds and remembers prior results per uploaded image.

use actix_web::{web, App, HttpServer, middleware};
use anyhow::Context;
use tracing::{info, warn};
use tracing_actix_web::TracingLogger;
use std::sync::Arc;
use std::time::Instant;

mod api;
mod config;
mod domain;
mod engine;
mod providers;
mod session;
mod storage;

use crate::config::Settings;
use crate::engine::{GenerationClient, HistoryStore};
use crate::providers::{ProviderCredentials, ProviderFactory};
use crate::session::Editor;
use crate::storage::{FileStore, KeyValueStore, MemoryStore};

/// Application state shared across all handlers
pub struct AppState {
    pub settings: Settings,
    pub editor: Editor,
    pub started_at: Instant,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing subscriber for structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("r_image_styler=info".parse()?)
                .add_directive("actix_web=info".parse()?)
        )
        .json()
        .init();

    // Load configuration
    let settings = Settings::load().context("Failed to load configuration")?;
    let bind_addr = format!("{}:{}", settings.server.host, settings.server.port);

    info!(
        "Starting R-Image-Styler v{} on {}",
        env!("CARGO_PKG_VERSION"),
        bind_addr
    );

    // History persistence: JSON file when configured, memory otherwise
    let store: Arc<dyn KeyValueStore> = match &settings.history.path {
        Some(path) => {
            let store = FileStore::open(path)
                .with_context(|| format!("Failed to open history store at {}", path.display()))?;
            info!(path = %path.display(), "Using file-backed generation history");
            Arc::new(store)
        }
        None => {
            info!("No history path configured, generation history is kept in memory");
            Arc::new(MemoryStore::new())
        }
    };
    let history = HistoryStore::new(store, settings.history.namespace.clone(), settings.history.capacity);

    // Model provider
    let credentials = ProviderCredentials::from_env();
    if !credentials.is_configured() {
        warn!("GEMINI_API_KEY is not set; generation requests will fail until it is configured");
    }
    let model = ProviderFactory::create("gemini", &settings.gemini, credentials)
        .context("Failed to initialize model provider")?
        .context("Unknown model provider")?;
    info!(
        provider = model.code(),
        image_model = %settings.gemini.image_model,
        rate_limit_per_minute = settings.gemini.rate_limit_per_minute,
        "Model provider initialized"
    );

    let editor = Editor::new(GenerationClient::new(model), history);
    let workers = settings.server.workers.unwrap_or_else(|| num_cpus::get() * 2);
    let payload_limit = settings.server.max_payload_mb * 1024 * 1024;

    // Create shared application state
    let app_state = web::Data::new(AppState {
        settings,
        editor,
        started_at: Instant::now(),
    });

    // Configure and start HTTP server
    HttpServer::new(move || {
        App::new()
            .app_data(app_state.clone())
            // Uploads arrive as base64 inside JSON
            .app_data(web::JsonConfig::default().limit(payload_limit))
            .wrap(TracingLogger::default())
            .wrap(middleware::Compress::default())
            .wrap(
                middleware::DefaultHeaders::new()
                    .add(("X-Service", "r-image-styler"))
                    .add(("X-Version", env!("CARGO_PKG_VERSION")))
            )
            // Routes
            .configure(api::configure_routes)
    })
    .workers(workers)
    .bind(&bind_addr)
    .with_context(|| format!("Failed to bind {}", bind_addr))?
    .run()
    .await?;

    Ok(())
}
