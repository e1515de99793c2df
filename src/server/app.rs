//! Axum application setup
//!
//! Creates and configures the Axum application with routes and middleware.

use crate::client::XhsApi;
use axum::{Router, routing::get};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Platform client; one instance serves every request
    pub api: Arc<XhsApi>,
    /// Server start time for uptime calculation
    pub start_time: std::time::Instant,
}

/// Create the main Axum application with routes and middleware
pub fn create_app(api: Arc<XhsApi>) -> Router {
    let state = AppState {
        api,
        start_time: std::time::Instant::now(),
    };

    Router::new()
        .route("/send_phone_code", get(super::handlers::send_phone_code))
        .route("/phone_login", get(super::handlers::phone_login))
        .route("/get_user_notes", get(super::handlers::get_user_notes))
        .route("/get_note_by_id", get(super::handlers::get_note_by_id))
        .route("/get_comment_list", get(super::handlers::get_comment_list))
        .route(
            "/get_sub_comment_list",
            get(super::handlers::get_sub_comment_list),
        )
        .route("/ping", get(super::handlers::ping))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}
