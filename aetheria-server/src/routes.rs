//! Router configuration module
//!
//! Configures all routes, middleware layers, and creates the application router.

use std::{sync::Arc, time::Duration};

use axum::{
    http::{header, HeaderName, Method, StatusCode},
    routing::{get, post},
    Router,
};
use tower_governor::{governor::GovernorConfigBuilder, GovernorLayer};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::handlers::{
    enhance_action, enhance_image, gallery, generate_variations, get_image, get_object, health,
    list_enhancements, list_images, list_variations, ready, transform_action, upload_image,
    variations_action,
};
use crate::openapi::ApiDoc;
use crate::owner::OWNER_HEADER;
use crate::state::AppState;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Create the application router with default config (for testing)
pub fn create_router(state: AppState) -> Router {
    create_router_with_config(state, &Config::default())
}

/// Create the application router with custom configuration
pub fn create_router_with_config(state: AppState, config: &Config) -> Router {
    let owner_header = HeaderName::from_static(OWNER_HEADER);
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    // Configure CORS based on allowed_origins
    let cors = match &config.allowed_origins {
        Some(origins) if !origins.is_empty() => {
            let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            tracing::info!("CORS: Restricting to {} origin(s)", origins.len());
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers([header::CONTENT_TYPE, header::ACCEPT, owner_header])
        }
        _ => {
            tracing::warn!("CORS: Allowing all origins (dev mode)");
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    };

    // Request body limit
    let body_limit = RequestBodyLimitLayer::new(config.body_limit_mb * 1024 * 1024);

    // Request timeout
    let timeout = TimeoutLayer::with_status_code(
        StatusCode::REQUEST_TIMEOUT,
        Duration::from_secs(config.timeout_secs),
    );

    let api = Router::new()
        .route("/images", post(upload_image).get(list_images))
        .route("/images/{id}", get(get_image))
        .route("/images/{id}/enhancements", get(list_enhancements))
        .route(
            "/images/{id}/variations",
            get(list_variations).post(generate_variations),
        )
        .route("/images/{id}/enhance", post(enhance_image))
        .route("/gallery", get(gallery))
        .route("/actions/enhance", post(enhance_action))
        .route("/actions/variations", post(variations_action))
        .route("/actions/transform", post(transform_action));

    // Base router with common layers
    let router = Router::new()
        .nest("/api/v1", api)
        .route("/objects/{*path}", get(get_object))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(body_limit)
        .layer(timeout)
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(SetRequestIdLayer::new(request_id, MakeRequestUuid));

    // Conditionally apply rate limiting (disabled in tests, enabled in production)
    let governor_conf = if config.rate_limit_enabled {
        let conf = GovernorConfigBuilder::default()
            .per_second(config.rate_limit_per_sec)
            .burst_size(config.rate_limit_burst)
            .finish();
        if conf.is_none() {
            tracing::error!(
                "Rate limiting: invalid settings ({} req/s, burst {}), DISABLED",
                config.rate_limit_per_sec,
                config.rate_limit_burst
            );
        }
        conf
    } else {
        tracing::warn!("Rate limiting: DISABLED");
        None
    };

    match governor_conf {
        Some(conf) => {
            tracing::info!(
                "Rate limiting: {} req/s (burst: {})",
                config.rate_limit_per_sec,
                config.rate_limit_burst
            );
            router
                .layer(GovernorLayer::new(Arc::new(conf)))
                .layer(TraceLayer::new_for_http())
        }
        None => router.layer(TraceLayer::new_for_http()),
    }
}
