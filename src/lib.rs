pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod services;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    routing::{get, patch},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::handlers::{health, inquiries};
use crate::middleware::{auth_middleware, metrics_handler, metrics_middleware, request_id_middleware};
use crate::repositories::InquiryRepository;

/// Shared state handed to every handler and the auth middleware
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub inquiries: Arc<dyn InquiryRepository>,
}

impl AppState {
    pub fn new(config: AppConfig, inquiries: Arc<dyn InquiryRepository>) -> Self {
        Self { config, inquiries }
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::HeaderName::from_static("x-request-id"),
        ])
        .allow_credentials(true)
}

pub fn create_app(state: AppState) -> Router {
    let inquiry_routes = Router::new()
        .route(
            "/",
            get(inquiries::list_inquiries).post(inquiries::create_inquiry),
        )
        .route("/sent", get(inquiries::list_sent_inquiries))
        .route("/received", get(inquiries::list_received_inquiries))
        .route("/unread-count", get(inquiries::get_unread_count))
        .route("/:id", get(inquiries::get_inquiry))
        .route("/:id/status", patch(inquiries::update_inquiry_status))
        .route(
            "/:id/messages",
            get(inquiries::get_messages).post(inquiries::send_message),
        )
        .route("/:id/messages/read", patch(inquiries::mark_messages_read))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/api/health", get(health::health_check))
        .route("/metrics", get(metrics_handler))
        .nest("/api/inquiries", inquiry_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config))
                .layer(axum_middleware::from_fn(request_id_middleware))
                .layer(axum_middleware::from_fn(metrics_middleware)),
        )
        .with_state(state)
}
