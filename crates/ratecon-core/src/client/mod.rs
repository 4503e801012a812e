//! LLM completion clients.

pub mod chat;
#[cfg(any(test, feature = "test-support"))]
pub mod mock;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use thiserror::Error;

use crate::template::Prompt;

/// Sampling temperature for every request. Layout must be reproducible, so
/// decoding is greedy.
pub const TEMPERATURE: f32 = 0.0;

/// Output budget per request; a full summary with the mandatory note fits
/// comfortably.
pub const MAX_OUTPUT_TOKENS: u32 = 1000;

/// Future returned by [`ExtractionClient::complete`].
pub type CompletionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, CompletionError>> + Send + 'a>>;

/// Why a completion request did not produce text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompletionError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("authentication rejected (HTTP {status})")]
    Unauthorized { status: u16 },
    #[error("rate limited (429){}", retry_hint(.retry_after))]
    RateLimited { retry_after: Option<Duration> },
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },
    #[error("could not decode response: {0}")]
    Decode(String),
    #[error("provider returned no completion")]
    EmptyCompletion,
}

fn retry_hint(retry_after: &Option<Duration>) -> String {
    match retry_after {
        Some(d) => format!(", retry after {}s", d.as_secs()),
        None => String::new(),
    }
}

/// An LLM provider that turns one prompt into one completion.
///
/// Implementations make exactly one upstream call per invocation and never
/// retry. The returned text is trimmed of surrounding whitespace and otherwise
/// untouched.
pub trait ExtractionClient: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    fn complete<'a>(&'a self, prompt: &'a Prompt) -> CompletionFuture<'a>;
}
