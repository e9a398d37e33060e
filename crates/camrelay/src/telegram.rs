//! Telegram Bot API sink.
//!
//! Two calls only: `sendPhoto` (multipart upload) and `sendMessage`
//! (form-encoded, HTML parse mode). A reply counts as delivered only when
//! the status is 2xx and the JSON body says `"ok": true`.

use crate::config::{Credentials, Settings};
use crate::http::{FilePart, HttpClient, HttpError, PostBody};
use serde::Deserialize;
use std::future::Future;
use std::time::Duration;

/// Errors from delivering to the chat.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("network error: {0}")]
    Network(String),

    #[error("Telegram returned HTTP {status}: {description}")]
    Status { status: u16, description: String },

    #[error("Telegram rejected the request: {0}")]
    Rejected(String),

    #[error("unreadable Telegram reply: {0}")]
    BadReply(String),
}

/// Where finished photos and text go.
pub trait Notifier: Send + Sync {
    fn send_photo(
        &self,
        image: Vec<u8>,
        caption: &str,
    ) -> impl Future<Output = Result<(), SinkError>> + Send;

    fn send_text(&self, text: &str) -> impl Future<Output = Result<(), SinkError>> + Send;
}

/// Envelope of every Bot API reply.
#[derive(Debug, Deserialize)]
struct BotReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// `Notifier` talking to the Telegram Bot API through an `HttpClient`.
pub struct TelegramNotifier<'a, H> {
    http: &'a H,
    api_base: String,
    credentials: Credentials,
    timeout: Duration,
}

impl<'a, H: HttpClient> TelegramNotifier<'a, H> {
    pub fn new(http: &'a H, settings: &Settings, credentials: Credentials) -> Self {
        Self {
            http,
            api_base: settings.telegram.api_base.trim_end_matches('/').to_string(),
            credentials,
            timeout: settings.telegram_timeout(),
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.credentials.bot_token, method)
    }

    /// Strip the bot token from anything that ends up in a log line.
    fn redact(&self, text: &str) -> String {
        text.replace(&self.credentials.bot_token, "<token>")
    }

    async fn call(&self, method: &str, body: PostBody) -> Result<(), SinkError> {
        let url = self.endpoint(method);
        let response = self
            .http
            .post(&url, body, self.timeout)
            .await
            .map_err(|e| match e {
                HttpError::Status { status, .. } => SinkError::Status {
                    status,
                    description: String::new(),
                },
                other => SinkError::Network(self.redact(&other.to_string())),
            })?;

        let reply = serde_json::from_slice::<BotReply>(&response.body);

        if !response.is_success() {
            let description = reply
                .ok()
                .and_then(|r| r.description)
                .unwrap_or_else(|| String::from_utf8_lossy(&response.body).into_owned());
            return Err(SinkError::Status {
                status: response.status,
                description: self.redact(&description),
            });
        }

        let reply = reply.map_err(|e| SinkError::BadReply(e.to_string()))?;
        if !reply.ok {
            return Err(SinkError::Rejected(self.redact(
                reply.description.as_deref().unwrap_or("no description"),
            )));
        }
        Ok(())
    }
}

impl<H: HttpClient> Notifier for TelegramNotifier<'_, H> {
    async fn send_photo(&self, image: Vec<u8>, caption: &str) -> Result<(), SinkError> {
        log::info!("[Telegram] sending photo '{}' ({} bytes)", caption, image.len());
        let body = PostBody::Multipart {
            fields: vec![
                ("chat_id".to_string(), self.credentials.chat_id.clone()),
                ("caption".to_string(), caption.to_string()),
            ],
            file: FilePart {
                field: "photo".to_string(),
                file_name: "image.jpg".to_string(),
                mime: "image/jpeg".to_string(),
                bytes: image,
            },
        };
        self.call("sendPhoto", body).await?;
        log::info!("[Telegram] photo '{}' delivered", caption);
        Ok(())
    }

    async fn send_text(&self, text: &str) -> Result<(), SinkError> {
        log::info!("[Telegram] sending text message ({} chars)", text.chars().count());
        let body = PostBody::Form(vec![
            ("chat_id".to_string(), self.credentials.chat_id.clone()),
            ("text".to_string(), text.to_string()),
            ("parse_mode".to_string(), "HTML".to_string()),
        ]);
        self.call("sendMessage", body).await?;
        log::info!("[Telegram] text message delivered");
        Ok(())
    }
}
