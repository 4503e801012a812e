use std::sync::Arc;

use axum::Json;
use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use ratecon_core::ShipmentSummary;
use serde::Serialize;

use crate::state::AppState;
use crate::upload::parse_multipart;

pub const NO_TEXT_MARKER: &str = "[NO TEXT FOUND IN PDF]";
pub const ERROR_MARKER: &str = "[ERROR PROCESSING PDF]";

#[derive(Serialize)]
struct Detail<'a> {
    detail: &'a str,
}

#[derive(Serialize)]
struct TextBody<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct ExtractBody<'a> {
    outcome: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<&'a ShipmentSummary>,
}

fn detail(status: StatusCode, message: &str) -> Response {
    (status, Json(Detail { detail: message })).into_response()
}

/// `POST /extract-text`: text extraction only, no LLM call.
pub async fn extract_text(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Response {
    let document = match parse_multipart(multipart).await {
        Ok(d) => d,
        Err(e) => return detail(StatusCode::UNPROCESSABLE_ENTITY, &e),
    };
    if !document.is_pdf() {
        return detail(StatusCode::BAD_REQUEST, "Only PDF files allowed");
    }

    let name = document.display_name().to_string();
    match state.pipeline.extract_text(document).await {
        Ok(text) if text.is_empty() => Json(TextBody {
            text: NO_TEXT_MARKER,
        })
        .into_response(),
        Ok(text) => Json(TextBody {
            text: text.as_str(),
        })
        .into_response(),
        Err(e) => {
            tracing::error!(document = %name, kind = %e.kind(), error = %e, "error processing PDF");
            Json(TextBody { text: ERROR_MARKER }).into_response()
        }
    }
}

/// `POST /extract`: the full pipeline, answered with the same reply a chat user gets.
pub async fn extract(State(state): State<Arc<AppState>>, multipart: Multipart) -> Response {
    let document = match parse_multipart(multipart).await {
        Ok(d) => d,
        Err(e) => return detail(StatusCode::UNPROCESSABLE_ENTITY, &e),
    };

    let outcome = state.pipeline.run(document).await;
    Json(ExtractBody {
        outcome: outcome.label(),
        text: outcome.reply(),
        summary: outcome.summary(),
    })
    .into_response()
}
