use std::net::SocketAddr;
use std::sync::Arc;

use ratecon_core::{DEFAULT_API_BASE, Pipeline, config_file};
use ratecon_pdf_mupdf::MupdfBackend;
use ratecon_server::{AppState, Settings, TelegramApi};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let file = config_file::load_config();
    let settings = Settings::resolve(&file, |name| {
        std::env::var(name).ok().filter(|v| !v.is_empty())
    });

    if settings.config.api_key.is_none() && settings.config.api_base == DEFAULT_API_BASE {
        tracing::warn!("GROQ_API_KEY is not set; extraction requests will fail");
    }
    tracing::info!(config = ?settings.config, "provider configuration");

    let backend = MupdfBackend::from_config(&file.extraction.unwrap_or_default());
    let pipeline = Pipeline::from_config(&settings.config, Arc::new(backend));
    let telegram = settings
        .bot_token
        .clone()
        .map(TelegramApi::new)
        .transpose()?;

    match (&telegram, settings.webhook_url()) {
        (Some(api), Some(url)) => {
            let shown = url.replace(api.token(), "<token>");
            match api.set_webhook(&url).await {
                Ok(()) => tracing::info!(url = %shown, "webhook registered"),
                Err(e) => tracing::error!(url = %shown, error = %e, "webhook registration failed"),
            }
        }
        (Some(_), None) => tracing::warn!(
            "TELEGRAM_BOT_TOKEN is set but neither WEBHOOK_URL nor RENDER_SERVICE_NAME is; skipping webhook registration"
        ),
        (None, _) => tracing::info!("TELEGRAM_BOT_TOKEN not set; Telegram webhook disabled"),
    }

    let app = ratecon_server::router(AppState::new(pipeline, telegram));

    let addr = SocketAddr::from(([0, 0, 0, 0], settings.port));
    tracing::info!(%addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
