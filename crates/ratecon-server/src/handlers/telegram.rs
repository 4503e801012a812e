use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use ratecon_core::{Pipeline, SourceDocument, is_pdf_media_type, notices};

use crate::MAX_UPLOAD_BYTES;
use crate::state::AppState;
use crate::telegram::{Document, Message, TelegramApi, Update};

/// `POST /telegram/{secret}`: acknowledge at once, work in the background.
pub async fn webhook(
    State(state): State<Arc<AppState>>,
    Path(secret): Path<String>,
    Json(update): Json<Update>,
) -> StatusCode {
    let Some(api) = state.telegram.clone() else {
        return StatusCode::NOT_FOUND;
    };
    if secret != api.token() {
        tracing::warn!("webhook called with wrong secret");
        return StatusCode::NOT_FOUND;
    }

    let pipeline = Arc::clone(&state.pipeline);
    tokio::spawn(async move {
        handle_update(&api, &pipeline, update).await;
    });
    StatusCode::OK
}

/// Process one update to completion, replying in the originating chat.
pub async fn handle_update(api: &TelegramApi, pipeline: &Pipeline, update: Update) {
    let Some(message) = update.message else {
        tracing::debug!(update_id = update.update_id, "ignoring update without message");
        return;
    };
    let chat_id = message.chat.id;

    let reply = match message.document {
        Some(ref document) => handle_document(api, pipeline, &message, document).await,
        None => notices::USAGE.to_string(),
    };

    if let Err(e) = api.send_message(chat_id, &reply).await {
        tracing::error!(chat_id, error = %e, "failed to send reply");
    }
}

async fn handle_document(
    api: &TelegramApi,
    pipeline: &Pipeline,
    message: &Message,
    document: &Document,
) -> String {
    let chat_id = message.chat.id;
    if let Err(e) = api.send_chat_action(chat_id, "typing").await {
        tracing::debug!(chat_id, error = %e, "chat action failed");
    }

    let declared = document.mime_type.as_deref();
    let name_says_pdf = document
        .file_name
        .as_deref()
        .is_some_and(|n| n.to_ascii_lowercase().ends_with(".pdf"));
    let accepted = match declared {
        Some(media_type) => is_pdf_media_type(media_type),
        None => name_says_pdf,
    };
    if !accepted {
        tracing::info!(
            chat_id,
            media_type = declared.unwrap_or("unknown"),
            "rejected non-PDF upload"
        );
        return notices::REJECTED.to_string();
    }

    // The Bot API refuses to serve larger files anyway.
    if let Some(size) = document.file_size
        && size > MAX_UPLOAD_BYTES as u64
    {
        tracing::warn!(chat_id, size, limit = MAX_UPLOAD_BYTES, "document too large to download");
        return notices::FAILURE.to_string();
    }

    let data = match api.download(&document.file_id).await {
        Ok(d) => d,
        Err(e) => {
            tracing::error!(chat_id, file_id = %document.file_id, error = %e, "download failed");
            return notices::FAILURE.to_string();
        }
    };

    let source = match (declared, document.file_name.clone()) {
        (Some(media_type), Some(name)) => SourceDocument::new(data, media_type).with_filename(name),
        (Some(media_type), None) => SourceDocument::new(data, media_type),
        (None, name) => SourceDocument::sniffed(data, name),
    };

    let outcome = pipeline
        .run_observed(source, &|stage| {
            tracing::debug!(chat_id, message_id = message.message_id, ?stage, "stage");
        })
        .await;
    outcome.reply().to_string()
}
