use std::time::Duration;

use thiserror::Error;

pub mod backend;
pub mod client;
pub mod config_file;
pub mod document;
pub mod layout;
pub mod notices;
pub mod pipeline;
pub mod template;

// Re-export for convenience
pub use backend::{BackendError, TextExtractor};
pub use client::chat::ChatCompletionsClient;
pub use client::{CompletionError, ExtractionClient, MAX_OUTPUT_TOKENS, TEMPERATURE};
pub use document::{ExtractedText, PDF_MEDIA_TYPE, SourceDocument, is_pdf_media_type};
pub use layout::{AddressType, LayoutError, ShipmentSummary, validate_layout};
pub use pipeline::{Completion, Outcome, Pipeline, PipelineOptions, Stage, extract_document};
pub use template::{Prompt, PromptBuilder, PromptTemplate};

/// Classification of everything that can end a pipeline run early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Declared media type is not PDF.
    UnsupportedMediaType,
    /// The PDF container could not be parsed.
    MalformedDocument,
    /// Valid PDF without recoverable text. A terminal outcome, not a failure.
    EmptyExtraction,
    /// The LLM call could not complete (network, auth, rate limit, quota).
    UpstreamUnavailable,
    /// The completion does not match the required layout.
    UpstreamMalformedResponse,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::UnsupportedMediaType => "unsupported_media_type",
            ErrorKind::MalformedDocument => "malformed_document",
            ErrorKind::EmptyExtraction => "empty_extraction",
            ErrorKind::UpstreamUnavailable => "upstream_unavailable",
            ErrorKind::UpstreamMalformedResponse => "upstream_malformed_response",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),
    #[error("malformed document: {0}")]
    MalformedDocument(#[from] BackendError),
    #[error("document contains no extractable text")]
    EmptyExtraction,
    #[error("LLM provider unavailable: {0}")]
    UpstreamUnavailable(#[from] CompletionError),
    #[error("completion does not match the required layout: {0}")]
    UpstreamMalformedResponse(#[from] LayoutError),
    #[error("extraction task failed: {0}")]
    Task(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::UnsupportedMediaType(_) => ErrorKind::UnsupportedMediaType,
            // A panicking backend means the document defeated the parser.
            PipelineError::MalformedDocument(_) | PipelineError::Task(_) => {
                ErrorKind::MalformedDocument
            }
            PipelineError::EmptyExtraction => ErrorKind::EmptyExtraction,
            PipelineError::UpstreamUnavailable(_) => ErrorKind::UpstreamUnavailable,
            PipelineError::UpstreamMalformedResponse(_) => ErrorKind::UpstreamMalformedResponse,
        }
    }
}

/// Default OpenAI-compatible endpoint (Groq).
pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama-3.1-8b-instant";

/// Runtime configuration, built once at startup and never mutated per request.
#[derive(Clone)]
pub struct Config {
    pub api_key: Option<String>,
    /// Base URL of an OpenAI-compatible API, without the `/chat/completions` suffix.
    pub api_base: String,
    pub model: String,
    pub request_timeout_secs: u64,
    /// Check completions against the output skeleton before returning them.
    pub validate_layout: bool,
}

impl Config {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("validate_layout", &self.validate_layout)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout_secs: 60,
            validate_layout: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_api_key() {
        let config = Config {
            api_key: Some("gsk_secret".into()),
            ..Config::default()
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("gsk_secret"));
        assert!(debug.contains("***"));
        assert!(debug.contains("llama-3.1-8b-instant"));
    }

    #[test]
    fn errors_classify_by_kind() {
        let err = PipelineError::from(BackendError::Open("bad header".into()));
        assert_eq!(err.kind(), ErrorKind::MalformedDocument);

        let err = PipelineError::from(CompletionError::Unauthorized { status: 401 });
        assert_eq!(err.kind(), ErrorKind::UpstreamUnavailable);

        let err = PipelineError::from(LayoutError::LeadingText("Sure!".into()));
        assert_eq!(err.kind(), ErrorKind::UpstreamMalformedResponse);

        let err = PipelineError::UnsupportedMediaType("image/png".into());
        assert_eq!(err.kind().to_string(), "unsupported_media_type");
    }
}
