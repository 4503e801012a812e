//! Document → text → prompt → completion, one linear run per request.
//!
//! A run moves through `Received → Extracted → Prompted → Completed` and stops
//! early in `Rejected` (not a PDF), `Empty` (no text layer) or `Failed`.
//! Nothing is shared between runs except the immutable pipeline itself.

use std::sync::Arc;
use std::time::Instant;

use crate::backend::TextExtractor;
use crate::client::ExtractionClient;
use crate::client::chat::ChatCompletionsClient;
use crate::document::{ExtractedText, SourceDocument};
use crate::layout::{AddressType, ShipmentSummary, validate_layout};
use crate::template::{PromptBuilder, PromptTemplate};
use crate::{Config, ErrorKind, PipelineError, notices};

/// Pipeline states. The last four are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Extracted,
    Prompted,
    Completed,
    Rejected,
    Empty,
    Failed,
}

/// A successful run: the trimmed completion and, when layout validation is
/// enabled, the fields parsed from it.
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub summary: Option<ShipmentSummary>,
}

/// Terminal result of one run, owned by the caller.
#[derive(Debug)]
pub enum Outcome {
    Completed(Completion),
    Rejected { media_type: String },
    Empty,
    Failed(PipelineError),
}

impl Outcome {
    pub fn stage(&self) -> Stage {
        match self {
            Outcome::Completed(_) => Stage::Completed,
            Outcome::Rejected { .. } => Stage::Rejected,
            Outcome::Empty => Stage::Empty,
            Outcome::Failed(_) => Stage::Failed,
        }
    }

    /// The text to send back to the user.
    pub fn reply(&self) -> &str {
        match self {
            Outcome::Completed(c) => &c.text,
            Outcome::Rejected { .. } => notices::REJECTED,
            Outcome::Empty => notices::NO_TEXT,
            Outcome::Failed(_) => notices::FAILURE,
        }
    }

    /// Parsed fields of a validated completion.
    pub fn summary(&self) -> Option<&ShipmentSummary> {
        match self {
            Outcome::Completed(c) => c.summary.as_ref(),
            _ => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            Outcome::Completed(_) => None,
            Outcome::Rejected { .. } => Some(ErrorKind::UnsupportedMediaType),
            Outcome::Empty => Some(ErrorKind::EmptyExtraction),
            Outcome::Failed(e) => Some(e.kind()),
        }
    }

    /// Short machine-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Completed(_) => "completed",
            Outcome::Rejected { .. } => "rejected",
            Outcome::Empty => "empty",
            Outcome::Failed(_) => "failed",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub template: PromptTemplate,
    pub validate_layout: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            template: PromptTemplate::rate_confirmation(),
            validate_layout: true,
        }
    }
}

impl From<&Config> for PipelineOptions {
    fn from(config: &Config) -> Self {
        Self {
            validate_layout: config.validate_layout,
            ..Self::default()
        }
    }
}

/// Orchestrates extraction, prompt binding and the upstream call.
pub struct Pipeline {
    extractor: Arc<dyn TextExtractor>,
    client: Arc<dyn ExtractionClient>,
    builder: PromptBuilder,
    validate_layout: bool,
}

impl Pipeline {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        client: Arc<dyn ExtractionClient>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            extractor,
            client,
            builder: PromptBuilder::new(options.template),
            validate_layout: options.validate_layout,
        }
    }

    /// Build a pipeline talking to the provider described by `config`.
    pub fn from_config(config: &Config, extractor: Arc<dyn TextExtractor>) -> Self {
        let client = Arc::new(ChatCompletionsClient::from_config(config));
        Self::new(extractor, client, PipelineOptions::from(config))
    }

    pub async fn run(&self, document: SourceDocument) -> Outcome {
        self.run_observed(document, &|_| {}).await
    }

    /// Run the pipeline, reporting every state entered to `on_stage`.
    pub async fn run_observed(
        &self,
        document: SourceDocument,
        on_stage: &(dyn Fn(Stage) + Send + Sync),
    ) -> Outcome {
        let started = Instant::now();
        let name = document.display_name().to_string();
        on_stage(Stage::Received);

        let outcome = self.advance(document, &name, on_stage).await;

        match &outcome {
            Outcome::Completed(c) => tracing::info!(
                document = %name,
                chars = c.text.len(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "extraction completed"
            ),
            Outcome::Rejected { media_type } => {
                tracing::warn!(document = %name, media_type = %media_type, "rejected non-PDF document")
            }
            Outcome::Empty => tracing::info!(document = %name, "no extractable text"),
            Outcome::Failed(e) => tracing::error!(
                document = %name,
                kind = %e.kind(),
                error = %e,
                "extraction failed"
            ),
        }
        on_stage(outcome.stage());
        outcome
    }

    async fn advance(
        &self,
        document: SourceDocument,
        name: &str,
        on_stage: &(dyn Fn(Stage) + Send + Sync),
    ) -> Outcome {
        if !document.is_pdf() {
            return Outcome::Rejected {
                media_type: document.media_type,
            };
        }

        let text = match self.extract_blocking(document).await {
            Ok(t) => t,
            Err(e) => return Outcome::Failed(e),
        };
        on_stage(Stage::Extracted);
        tracing::debug!(document = %name, pages = text.page_count(), chars = text.len(), "extracted");

        if text.is_empty() {
            return Outcome::Empty;
        }

        let prompt = match self.builder.build(&text) {
            Ok(p) => p,
            Err(e) => return Outcome::Failed(e),
        };
        on_stage(Stage::Prompted);
        tracing::debug!(
            document = %name,
            client = self.client.name(),
            template = self.builder.template().version(),
            prompt_chars = prompt.len(),
            "requesting completion"
        );

        let raw = match self.client.complete(&prompt).await {
            Ok(r) => r,
            Err(e) => return Outcome::Failed(e.into()),
        };
        let reply = raw.trim().to_string();

        let summary = if self.validate_layout {
            match validate_layout(&reply) {
                Ok(summary) => {
                    let in_source = AddressType::classify(text.as_str());
                    if summary.address_type == AddressType::Residential
                        && in_source == AddressType::Commercial
                    {
                        tracing::warn!(document = %name, "RESIDENTIAL stated but not found in document");
                    }
                    Some(summary)
                }
                Err(e) => {
                    tracing::debug!(document = %name, completion = %reply, "completion rejected by layout check");
                    return Outcome::Failed(e.into());
                }
            }
        } else {
            None
        };

        Outcome::Completed(Completion {
            text: reply,
            summary,
        })
    }

    /// Text extraction only; non-PDF input is refused before any parsing.
    pub async fn extract_text(
        &self,
        document: SourceDocument,
    ) -> Result<ExtractedText, PipelineError> {
        if !document.is_pdf() {
            return Err(PipelineError::UnsupportedMediaType(document.media_type));
        }
        self.extract_blocking(document).await
    }

    async fn extract_blocking(
        &self,
        document: SourceDocument,
    ) -> Result<ExtractedText, PipelineError> {
        extract_document(Arc::clone(&self.extractor), document).await
    }
}

/// Run `extractor` over `document` without a provider behind it.
///
/// Parsing runs on the blocking pool; the byte buffer is moved in and
/// dropped as soon as extraction returns. The media type is not checked.
pub async fn extract_document(
    extractor: Arc<dyn TextExtractor>,
    document: SourceDocument,
) -> Result<ExtractedText, PipelineError> {
    let text = tokio::task::spawn_blocking(move || extractor.extract(&document))
        .await
        .map_err(|e| PipelineError::Task(e.to_string()))??;
    Ok(text)
}
