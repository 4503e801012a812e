//! Mock completion client for testing.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{CompletionError, CompletionFuture, ExtractionClient};
use crate::template::Prompt;

/// A configurable mock response for [`MockClient`].
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Return this completion text (trimmed, as a real client would).
    Completion(String),
    /// Simulate a rejected API key.
    Unauthorized,
    /// Simulate a 429 rate-limit response.
    RateLimited { retry_after: Option<Duration> },
    /// Simulate a transport failure.
    Error(String),
}

/// A hand-rolled mock implementing [`ExtractionClient`] for tests.
///
/// Supports:
/// - A fixed response (used for every call), **or**
/// - A sequence of responses (one per call, repeating the last if exhausted).
/// - Optional per-call latency.
/// - Call counting and capture of every prompt received.
pub struct MockClient {
    responses: Mutex<Vec<MockResponse>>,
    fallback: MockResponse,
    delay: Option<Duration>,
    call_count: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockClient {
    /// Create a mock that always returns `response`.
    pub fn new(response: MockResponse) -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            fallback: response,
            delay: None,
            call_count: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Shorthand for a mock that always completes with `text`.
    pub fn completing(text: impl Into<String>) -> Self {
        Self::new(MockResponse::Completion(text.into()))
    }

    /// Create a mock that returns responses in order, repeating the last one.
    pub fn with_sequence(mut responses: Vec<MockResponse>) -> Self {
        assert!(
            !responses.is_empty(),
            "sequence must have at least one response"
        );
        // Reverse so we can pop() from the front cheaply.
        responses.reverse();
        let fallback = responses[0].clone();
        Self {
            responses: Mutex::new(responses),
            ..Self::new(fallback)
        }
    }

    /// Set simulated network latency per call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// How many times `complete()` has been called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Every prompt received so far, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    fn next_response(&self) -> MockResponse {
        let mut seq = self.responses.lock().unwrap();
        seq.pop().unwrap_or_else(|| self.fallback.clone())
    }
}

impl ExtractionClient for MockClient {
    fn name(&self) -> &str {
        "mock"
    }

    fn complete<'a>(&'a self, prompt: &'a Prompt) -> CompletionFuture<'a> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.as_str().to_string());
        let response = self.next_response();
        let delay = self.delay;

        Box::pin(async move {
            if let Some(d) = delay {
                tokio::time::sleep(d).await;
            }

            match response {
                MockResponse::Completion(text) => Ok(text.trim().to_string()),
                MockResponse::Unauthorized => Err(CompletionError::Unauthorized { status: 401 }),
                MockResponse::RateLimited { retry_after } => {
                    Err(CompletionError::RateLimited { retry_after })
                }
                MockResponse::Error(msg) => Err(CompletionError::Transport(msg)),
            }
        })
    }
}
