//! Minimal Telegram Bot API client: only the calls the webhook flow needs.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Telegram rejects messages longer than this many UTF-16 code units.
pub const MAX_MESSAGE_LEN: usize = 4096;

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub document: Option<Document>,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Document {
    pub file_id: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct File {
    pub file_id: String,
    pub file_path: Option<String>,
}

/// Every Bot API reply is wrapped in this envelope.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

/// Request URLs embed the bot token, so transport errors never carry them.
#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    #[error("{method} failed: {description}")]
    Api {
        method: &'static str,
        description: String,
    },
    #[error("file {0} has no download path")]
    NoFilePath(String),
    #[error("download failed with HTTP {0}")]
    Download(u16),
}

fn transport(e: reqwest::Error) -> TelegramError {
    TelegramError::Transport(e.without_url())
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
}

#[derive(Serialize)]
struct SendChatAction<'a> {
    chat_id: i64,
    action: &'a str,
}

#[derive(Serialize)]
struct GetFile<'a> {
    file_id: &'a str,
}

#[derive(Serialize)]
struct SetWebhook<'a> {
    url: &'a str,
    allowed_updates: &'a [&'a str],
}

/// Bot API client bound to one bot token.
#[derive(Clone)]
pub struct TelegramApi {
    client: reqwest::Client,
    base: String,
    token: String,
}

impl std::fmt::Debug for TelegramApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramApi")
            .field("base", &self.base)
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl TelegramApi {
    pub fn new(token: impl Into<String>) -> Result<Self, TelegramError> {
        Self::with_base(token, DEFAULT_API_BASE)
    }

    /// Point the client at another Bot API server (a local one, or a fake in tests).
    pub fn with_base(
        token: impl Into<String>,
        base: impl Into<String>,
    ) -> Result<Self, TelegramError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(transport)?;
        Ok(Self {
            client,
            base: base.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.base, self.token, method)
    }

    async fn call<B: Serialize, T: DeserializeOwned>(
        &self,
        method: &'static str,
        body: &B,
    ) -> Result<T, TelegramError> {
        let resp = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        let envelope: Envelope<T> = resp.json().await.map_err(transport)?;
        match envelope {
            Envelope {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            Envelope { description, .. } => Err(TelegramError::Api {
                method,
                description: description.unwrap_or_else(|| "no description".to_string()),
            }),
        }
    }

    pub async fn get_file(&self, file_id: &str) -> Result<File, TelegramError> {
        self.call("getFile", &GetFile { file_id }).await
    }

    /// Resolve `file_id` and fetch the file's bytes.
    pub async fn download(&self, file_id: &str) -> Result<Vec<u8>, TelegramError> {
        let file = self.get_file(file_id).await?;
        let path = file
            .file_path
            .ok_or_else(|| TelegramError::NoFilePath(file.file_id.clone()))?;
        let url = format!("{}/file/bot{}/{}", self.base, self.token, path);
        let resp = self.client.get(url).send().await.map_err(transport)?;
        if !resp.status().is_success() {
            return Err(TelegramError::Download(resp.status().as_u16()));
        }
        Ok(resp.bytes().await.map_err(transport)?.to_vec())
    }

    /// Send `text`, split into several messages if it exceeds the length limit.
    pub async fn send_message(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        for chunk in split_message(text, MAX_MESSAGE_LEN) {
            let _: serde_json::Value = self
                .call("sendMessage", &SendMessage {
                    chat_id,
                    text: chunk,
                })
                .await?;
        }
        Ok(())
    }

    pub async fn send_chat_action(&self, chat_id: i64, action: &str) -> Result<(), TelegramError> {
        let _: bool = self
            .call("sendChatAction", &SendChatAction { chat_id, action })
            .await?;
        Ok(())
    }

    pub async fn set_webhook(&self, url: &str) -> Result<(), TelegramError> {
        let _: bool = self
            .call("setWebhook", &SetWebhook {
                url,
                allowed_updates: &["message"],
            })
            .await?;
        Ok(())
    }
}

/// Split `text` into pieces of at most `max_units` UTF-16 code units,
/// breaking after a newline where one is available.
pub fn split_message(text: &str, max_units: usize) -> Vec<&str> {
    let mut chunks = Vec::new();
    let mut rest = text;
    while let Some(hard) = overflow_at(rest, max_units) {
        let cut = match rest[..hard].rfind('\n') {
            Some(nl) if nl > 0 => nl + 1,
            _ if hard > 0 => hard,
            // A single character wider than the limit still has to go out.
            _ => rest.chars().next().map_or(rest.len(), char::len_utf8),
        };
        chunks.push(&rest[..cut]);
        rest = &rest[cut..];
    }
    if !rest.is_empty() || chunks.is_empty() {
        chunks.push(rest);
    }
    chunks
}

/// Byte offset of the first character that takes `text` past `max_units`.
fn overflow_at(text: &str, max_units: usize) -> Option<usize> {
    let mut units = 0;
    text.char_indices().find_map(|(i, c)| {
        units += c.len_utf16();
        (units > max_units).then_some(i)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_message_is_one_chunk() {
        assert_eq!(split_message("PICK UP", 4096), vec!["PICK UP"]);
        assert_eq!(split_message("", 4096), vec![""]);
    }

    #[test]
    fn long_message_breaks_on_newline() {
        let text = "aaaa\nbbbb\ncc";
        let chunks = split_message(text, 6);
        assert_eq!(chunks, vec!["aaaa\n", "bbbb\n", "cc"]);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn split_counts_utf16_units() {
        // Each emoji is one char but two UTF-16 units.
        let text = "📒".repeat(10);
        let chunks = split_message(&text, 4);
        assert_eq!(chunks.len(), 5);
        assert!(chunks.iter().all(|c| c.encode_utf16().count() <= 4));
        assert_eq!(chunks.concat(), text);

        let text = format!("{}📒", "a".repeat(MAX_MESSAGE_LEN - 1));
        assert_eq!(text.chars().count(), MAX_MESSAGE_LEN);
        let chunks = split_message(&text, MAX_MESSAGE_LEN);
        assert_eq!(chunks, vec![&text[..MAX_MESSAGE_LEN - 1], "📒"]);
    }

    #[test]
    fn oversized_character_is_sent_alone() {
        assert_eq!(split_message("📒📒", 1), vec!["📒", "📒"]);
    }

    #[test]
    fn update_without_document_parses() {
        let json = r#"{"update_id":1,"message":{"message_id":7,"chat":{"id":42,"type":"private"},"text":"hi"}}"#;
        let update: Update = serde_json::from_str(json).unwrap();
        let message = update.message.unwrap();
        assert_eq!(message.chat.id, 42);
        assert!(message.document.is_none());
        assert_eq!(message.text.as_deref(), Some("hi"));
    }

    #[test]
    fn debug_hides_token() {
        let api = TelegramApi::new("123:secret").unwrap();
        assert!(!format!("{:?}", api).contains("secret"));
    }

    #[tokio::test]
    async fn transport_errors_hide_token() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let api = TelegramApi::with_base("123456:SECRETTOKEN", format!("http://{addr}")).unwrap();
        let err = api.download("file-1").await.unwrap_err();
        assert!(matches!(err, TelegramError::Transport(_)));
        assert!(!err.to_string().contains("SECRETTOKEN"));
        assert!(!format!("{err:?}").contains("SECRETTOKEN"));
    }
}
