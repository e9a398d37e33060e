//! Outbound HTTP boundary.
//!
//! Pipelines and the Telegram sink call `HttpClient` instead of
//! `reqwest::Client` directly, so every network call can be replaced with
//! an in-memory fake in tests.

use std::future::Future;
use std::time::Duration;

/// Errors from HTTP operations.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("HTTP status {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("cannot build HTTP client: {0}")]
    Client(String),
}

pub type HttpResult<T> = std::result::Result<T, HttpError>;

/// Status and full body of a completed request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Return the body, or `HttpError::Status` for a non-2xx response.
    pub fn into_success(self, url: &str) -> HttpResult<Vec<u8>> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(HttpError::Status {
                url: url.to_string(),
                status: self.status,
            })
        }
    }
}

/// A binary part of a multipart upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePart {
    pub field: String,
    pub file_name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

/// Body of a POST request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostBody {
    /// `application/x-www-form-urlencoded`
    Form(Vec<(String, String)>),
    /// `multipart/form-data` with text fields and one file.
    Multipart {
        fields: Vec<(String, String)>,
        file: FilePart,
    },
}

impl PostBody {
    /// Look up a text field by name.
    pub fn field(&self, name: &str) -> Option<&str> {
        let fields = match self {
            PostBody::Form(fields) => fields,
            PostBody::Multipart { fields, .. } => fields,
        };
        fields
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Abstraction over the HTTP client.
///
/// Implementations must not retry: one call is one request.
pub trait HttpClient: Send + Sync {
    fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
        timeout: Duration,
    ) -> impl Future<Output = HttpResult<HttpResponse>> + Send;

    fn post(
        &self,
        url: &str,
        body: PostBody,
        timeout: Duration,
    ) -> impl Future<Output = HttpResult<HttpResponse>> + Send;
}

// ── ReqwestClient: real implementation ─────────────────────────────────

/// `HttpClient` backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: reqwest::Client,
}

impl ReqwestClient {
    pub fn new() -> HttpResult<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("camrelay/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HttpError::Client(e.to_string()))?;
        Ok(Self { client })
    }

    async fn finish(url: &str, request: reqwest::RequestBuilder) -> HttpResult<HttpResponse> {
        let transport = |e: reqwest::Error| HttpError::Transport {
            url: url.to_string(),
            message: e.without_url().to_string(),
        };
        let response = request.send().await.map_err(transport)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(transport)?;
        Ok(HttpResponse::new(status, body.to_vec()))
    }
}

impl HttpClient for ReqwestClient {
    async fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
        timeout: Duration,
    ) -> HttpResult<HttpResponse> {
        let request = self.client.get(url).query(query).timeout(timeout);
        Self::finish(url, request).await
    }

    async fn post(&self, url: &str, body: PostBody, timeout: Duration) -> HttpResult<HttpResponse> {
        let request = self.client.post(url).timeout(timeout);
        let request = match body {
            PostBody::Form(fields) => request.form(&fields),
            PostBody::Multipart { fields, file } => {
                let part = reqwest::multipart::Part::bytes(file.bytes)
                    .file_name(file.file_name)
                    .mime_str(&file.mime)
                    .map_err(|e| HttpError::Transport {
                        url: url.to_string(),
                        message: e.to_string(),
                    })?;
                let form = fields
                    .into_iter()
                    .fold(reqwest::multipart::Form::new(), |form, (k, v)| {
                        form.text(k, v)
                    })
                    .part(file.field, part);
                request.multipart(form)
            }
        };
        Self::finish(url, request).await
    }
}
