//! Integration tests for [`ChatCompletionsClient`] against an in-process
//! OpenAI-compatible server bound to an ephemeral port.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};

use ratecon_core::{
    BackendError, ChatCompletionsClient, CompletionError, Config, ErrorKind, ExtractedText,
    ExtractionClient, Outcome, Pipeline, PromptBuilder, SourceDocument, TextExtractor, notices,
};

/// Canned provider response plus everything the server received.
struct Provider {
    status: StatusCode,
    headers: HeaderMap,
    body: Value,
    delay: Option<Duration>,
    requests: Mutex<Vec<(Option<String>, Value)>>,
}

impl Provider {
    fn new(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body,
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    fn requests(&self) -> Vec<(Option<String>, Value)> {
        self.requests.lock().unwrap().clone()
    }
}

async fn completions(
    State(provider): State<Arc<Provider>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, HeaderMap, Json<Value>) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    provider.requests.lock().unwrap().push((auth, body));
    if let Some(d) = provider.delay {
        tokio::time::sleep(d).await;
    }
    (
        provider.status,
        provider.headers.clone(),
        Json(provider.body.clone()),
    )
}

/// Start the fake provider; returns its API base URL.
async fn serve(provider: Arc<Provider>) -> String {
    let app = Router::new()
        .route("/v1/chat/completions", post(completions))
        .with_state(provider);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}/v1")
}

fn config(api_base: String) -> Config {
    Config {
        api_key: Some("test-key".into()),
        api_base,
        model: "test-model".into(),
        request_timeout_secs: 5,
        ..Config::default()
    }
}

fn completion_body(content: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

fn prompt() -> ratecon_core::Prompt {
    PromptBuilder::default()
        .build(&ExtractedText::from_pages(["Miles: 2,559"]))
        .unwrap()
}

#[tokio::test]
async fn sends_single_deterministic_request() {
    let provider = Arc::new(Provider::new(
        StatusCode::OK,
        completion_body("\n  PICK UP\nDallas  \n"),
    ));
    let client = ChatCompletionsClient::from_config(&config(serve(Arc::clone(&provider)).await));

    let prompt = prompt();
    let text = client.complete(&prompt).await.unwrap();
    assert_eq!(text, "PICK UP\nDallas");

    let requests = provider.requests();
    assert_eq!(requests.len(), 1);
    let (auth, body) = &requests[0];
    assert_eq!(auth.as_deref(), Some("Bearer test-key"));
    assert_eq!(body["model"], "test-model");
    assert_eq!(body["temperature"].as_f64(), Some(0.0));
    assert_eq!(body["max_tokens"], 1000);
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["content"], prompt.as_str());
}

#[tokio::test]
async fn unauthorized_is_reported() {
    let provider = Arc::new(Provider::new(
        StatusCode::UNAUTHORIZED,
        json!({"error": {"message": "Invalid API Key"}}),
    ));
    let client = ChatCompletionsClient::from_config(&config(serve(Arc::clone(&provider)).await));

    let err = client.complete(&prompt()).await.unwrap_err();
    assert_eq!(err, CompletionError::Unauthorized { status: 401 });
    assert_eq!(provider.requests().len(), 1);
}

#[tokio::test]
async fn rate_limit_carries_retry_after() {
    let mut provider = Provider::new(
        StatusCode::TOO_MANY_REQUESTS,
        json!({"error": {"message": "Rate limit reached"}}),
    );
    provider
        .headers
        .insert("retry-after", HeaderValue::from_static("12"));
    let provider = Arc::new(provider);
    let client = ChatCompletionsClient::from_config(&config(serve(Arc::clone(&provider)).await));

    let err = client.complete(&prompt()).await.unwrap_err();
    assert_eq!(
        err,
        CompletionError::RateLimited {
            retry_after: Some(Duration::from_secs(12))
        }
    );
    assert_eq!(provider.requests().len(), 1);
}

#[tokio::test]
async fn server_error_message_is_kept_for_logs() {
    let provider = Arc::new(Provider::new(
        StatusCode::SERVICE_UNAVAILABLE,
        json!({"error": {"message": "model overloaded"}}),
    ));
    let client = ChatCompletionsClient::from_config(&config(serve(provider).await));

    let err = client.complete(&prompt()).await.unwrap_err();
    assert_eq!(
        err,
        CompletionError::Http {
            status: 503,
            message: "model overloaded".into()
        }
    );
}

#[tokio::test]
async fn empty_choices_are_an_error() {
    let provider = Arc::new(Provider::new(StatusCode::OK, json!({"choices": []})));
    let client = ChatCompletionsClient::from_config(&config(serve(provider).await));

    let err = client.complete(&prompt()).await.unwrap_err();
    assert_eq!(err, CompletionError::EmptyCompletion);
}

#[tokio::test]
async fn non_json_body_is_decode_error() {
    let provider = Arc::new(Provider::new(StatusCode::OK, json!("not an object")));
    let client = ChatCompletionsClient::from_config(&config(serve(provider).await));

    let err = client.complete(&prompt()).await.unwrap_err();
    assert!(matches!(err, CompletionError::Decode(_)));
}

#[tokio::test]
async fn slow_provider_times_out() {
    let mut provider = Provider::new(StatusCode::OK, completion_body("late"));
    provider.delay = Some(Duration::from_secs(3));
    let base = serve(Arc::new(provider)).await;
    let client = ChatCompletionsClient::from_config(&Config {
        request_timeout_secs: 1,
        ..config(base)
    });

    let err = client.complete(&prompt()).await.unwrap_err();
    assert_eq!(err, CompletionError::Timeout(Duration::from_secs(1)));
}

#[tokio::test]
async fn closed_port_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let client = ChatCompletionsClient::from_config(&config(format!("http://{addr}/v1")));

    let err = client.complete(&prompt()).await.unwrap_err();
    assert!(matches!(err, CompletionError::Transport(_)));
}

struct OnePage(&'static str);

impl TextExtractor for OnePage {
    fn name(&self) -> &str {
        "one-page"
    }

    fn extract_pages(&self, _data: &[u8]) -> Result<Vec<String>, BackendError> {
        Ok(vec![self.0.to_string()])
    }
}

#[tokio::test]
async fn pipeline_hides_auth_failure_from_user() {
    let provider = Arc::new(Provider::new(
        StatusCode::UNAUTHORIZED,
        json!({"error": {"message": "Invalid API Key"}}),
    ));
    let base = serve(Arc::clone(&provider)).await;
    let pipeline = Pipeline::from_config(&config(base), Arc::new(OnePage("Miles: 2,559")));

    let doc = SourceDocument::new(b"%PDF-1.4".to_vec(), "application/pdf");
    let outcome = pipeline.run(doc).await;

    assert!(matches!(outcome, Outcome::Failed(_)));
    assert_eq!(outcome.error_kind(), Some(ErrorKind::UpstreamUnavailable));
    assert_eq!(outcome.reply(), notices::FAILURE);
    assert!(!outcome.reply().contains("Invalid API Key"));
    assert_eq!(provider.requests().len(), 1);
}
