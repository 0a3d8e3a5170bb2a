//! Application setup: shared state and the router.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use scanner::client::{ClientConfig, HttpTransport};
use scanner::engine::ScanEngine;
use scanner::jobs::JobManager;
use scanner::limits::{LimiterConfig, RateController};
use scanner::providers::{builtin_code_drivers, DriverSettings};
use scanner::registry::Registry;
use scanner::restore::FaceRestoreClient;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::routes;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<JobManager>,
    pub restore: Option<Arc<FaceRestoreClient>>,
}

/// Assemble the scanning core from config and wrap it in a router.
pub fn build_app(config: &Config) -> anyhow::Result<Router> {
    let transport = Arc::new(HttpTransport::new(&ClientConfig {
        socks_proxy: config.socks_proxy.clone(),
    })?);

    let limiter = Arc::new(RateController::new(
        &LimiterConfig::default().with_global_limit(config.concurrency),
    ));

    let settings = DriverSettings {
        hibp_api_key: config.hibp_api_key.clone(),
    };

    let mut builder = Registry::builder()
        .with_code_drivers(builtin_code_drivers(&settings))
        .with_builtin();
    if let Some(path) = &config.providers_file {
        builder = builder.with_file(path);
    }
    let registry = Arc::new(builder.build());

    let engine = Arc::new(
        ScanEngine::new(transport, limiter).with_settings(settings),
    );
    let manager = Arc::new(JobManager::new(Arc::clone(&registry), engine));

    let state = AppState {
        manager,
        restore: config
            .face_restore_url
            .as_ref()
            .map(|url| Arc::new(FaceRestoreClient::new(url))),
    };

    Ok(Router::new()
        .route("/api/scan", post(routes::scan::submit))
        .route("/api/jobs/:job_id", get(routes::jobs::poll))
        .route("/api/jobs/:job_id/cancel", post(routes::jobs::cancel))
        .route("/api/registry/reload", post(routes::registry::reload))
        .route("/api/reverse-image", get(routes::reverse_image::lookup))
        .route("/api/restore", post(routes::restore::restore))
        .route("/health", get(routes::health::health))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state))
}
