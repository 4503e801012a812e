//! HTTP surface for the rate confirmation pipeline: a Telegram webhook and
//! plain multipart upload endpoints.

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};

pub mod handlers;
pub mod settings;
pub mod state;
pub mod telegram;
pub mod upload;

pub use settings::Settings;
pub use state::AppState;
pub use telegram::TelegramApi;

/// Largest upload accepted, matching the Bot API's download cap.
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/telegram/{secret}", post(handlers::telegram::webhook))
        .route("/extract-text", post(handlers::upload::extract_text))
        .route("/extract", post(handlers::upload::extract))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(state)
}
