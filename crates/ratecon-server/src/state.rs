use std::sync::Arc;

use ratecon_core::Pipeline;

use crate::telegram::TelegramApi;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    /// `None` when no bot token is configured; the webhook route then answers 404.
    pub telegram: Option<TelegramApi>,
}

impl AppState {
    pub fn new(pipeline: Pipeline, telegram: Option<TelegramApi>) -> Arc<Self> {
        Arc::new(Self {
            pipeline: Arc::new(pipeline),
            telegram,
        })
    }
}
