//! In-memory fakes for pipeline tests

#![allow(dead_code)]

use camrelay::config::{CameraDescriptor, Settings, StationDescriptor};
use camrelay::http::{HttpClient, HttpError, HttpResponse, HttpResult, PostBody};
use camrelay::scheduler::Sleeper;
use camrelay::telegram::{Notifier, SinkError};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::watch;

pub const TOKEN: &str = "123:test-token";
pub const CHAT_ID: &str = "-100200300";
pub const JPEG: &[u8] = &[0xff, 0xd8, 0xff, 0xe0, 0x00, 0x10, 0x4a, 0x46];

/// Canned answer for one URL.
#[derive(Clone)]
pub enum Reply {
    Status(u16, Vec<u8>),
    Transport(String),
}

/// One request seen by `FakeHttp`.
#[derive(Debug, Clone)]
pub struct Call {
    pub method: &'static str,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub body: Option<PostBody>,
    pub timeout: Duration,
}

/// `HttpClient` answering from a URL → reply table. Unknown URLs get 404.
#[derive(Default)]
pub struct FakeHttp {
    routes: Mutex<HashMap<String, Reply>>,
    pub calls: Mutex<Vec<Call>>,
}

impl FakeHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(self, url: &str, reply: Reply) -> Self {
        self.routes.lock().unwrap().insert(url.to_string(), reply);
        self
    }

    pub fn ok(self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.route(url, Reply::Status(200, body.into()))
    }

    /// Answer both Bot API methods with `{"ok": true}`.
    pub fn telegram_ok(self) -> Self {
        self.ok(&telegram_url("sendPhoto"), r#"{"ok":true,"result":{}}"#)
            .ok(&telegram_url("sendMessage"), r#"{"ok":true,"result":{}}"#)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn posts_to(&self, method: &str) -> Vec<Call> {
        let url = telegram_url(method);
        self.calls().into_iter().filter(|c| c.url == url).collect()
    }

    fn answer(&self, call: Call) -> HttpResult<HttpResponse> {
        let reply = self.routes.lock().unwrap().get(&call.url).cloned();
        let url = call.url.clone();
        self.calls.lock().unwrap().push(call);
        match reply {
            Some(Reply::Status(status, body)) => Ok(HttpResponse::new(status, body)),
            Some(Reply::Transport(message)) => Err(HttpError::Transport { url, message }),
            None => Ok(HttpResponse::new(404, "not found")),
        }
    }
}

impl HttpClient for FakeHttp {
    async fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
        timeout: Duration,
    ) -> HttpResult<HttpResponse> {
        self.answer(Call {
            method: "GET",
            url: url.to_string(),
            query: query
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            body: None,
            timeout,
        })
    }

    async fn post(&self, url: &str, body: PostBody, timeout: Duration) -> HttpResult<HttpResponse> {
        self.answer(Call {
            method: "POST",
            url: url.to_string(),
            query: Vec::new(),
            body: Some(body),
            timeout,
        })
    }
}

/// `Notifier` that records what it was given.
#[derive(Default)]
pub struct RecordingNotifier {
    pub photos: Mutex<Vec<(String, Vec<u8>)>>,
    pub texts: Mutex<Vec<String>>,
    failing_captions: HashSet<String>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `send_photo` fail for this caption.
    pub fn failing_for(mut self, caption: &str) -> Self {
        self.failing_captions.insert(caption.to_string());
        self
    }

    pub fn captions(&self) -> Vec<String> {
        self.photos
            .lock()
            .unwrap()
            .iter()
            .map(|(c, _)| c.clone())
            .collect()
    }

    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    async fn send_photo(&self, image: Vec<u8>, caption: &str) -> Result<(), SinkError> {
        self.photos
            .lock()
            .unwrap()
            .push((caption.to_string(), image));
        if self.failing_captions.contains(caption) {
            return Err(SinkError::Rejected("Bad Request: chat not found".to_string()));
        }
        Ok(())
    }

    async fn send_text(&self, text: &str) -> Result<(), SinkError> {
        self.texts.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

/// `Sleeper` that returns immediately and records every requested pause.
///
/// Optionally fires a shutdown signal once it has been asked for
/// `limit` pauses of length `interval`.
#[derive(Default)]
pub struct RecordingSleeper {
    pub sleeps: Mutex<Vec<Duration>>,
    stop: Option<(Duration, usize, watch::Sender<()>)>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stopping_after(interval: Duration, limit: usize, tx: watch::Sender<()>) -> Self {
        Self {
            sleeps: Mutex::new(Vec::new()),
            stop: Some((interval, limit, tx)),
        }
    }

    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().unwrap().clone()
    }
}

impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        let mut sleeps = self.sleeps.lock().unwrap();
        sleeps.push(duration);
        if let Some((interval, limit, tx)) = &self.stop {
            let seen = sleeps.iter().filter(|d| *d == interval).count();
            if seen >= *limit {
                let _ = tx.send(());
            }
        }
    }
}

pub fn telegram_url(method: &str) -> String {
    format!("https://api.telegram.org/bot{}/{}", TOKEN, method)
}

pub fn env(name: &str) -> Option<String> {
    match name {
        "TELEGRAM_TOKEN" => Some(TOKEN.to_string()),
        "TELEGRAM_CHAT_ID" => Some(CHAT_ID.to_string()),
        _ => None,
    }
}

pub fn no_env(_name: &str) -> Option<String> {
    None
}

pub const WEATHER_URL: &str = "https://aviationweather.gov/api/data/metar";

/// Three cameras on example hosts plus the default stations.
pub fn test_settings() -> Settings {
    Settings {
        cameras: vec![
            CameraDescriptor::new(
                "Alpha",
                "https://example.com/alpha",
                Some("https://example.com"),
                "cam",
            ),
            CameraDescriptor::new("Beta", "https://beta.example.org/live.html", None, "live"),
            CameraDescriptor::new(
                "Gamma",
                "https://example.com/gamma",
                Some("https://example.com"),
                "cam",
            ),
        ],
        stations: vec![
            StationDescriptor::new("MROC", "Juan Santamaría"),
            StationDescriptor::new("MRLB", "Daniel Oduber"),
        ],
        ..Settings::default()
    }
}

pub fn page_with(id: &str, src: &str) -> String {
    format!(
        r#"<html><body><h1>Webcam</h1><img id="{}" src="{}" alt="live"></body></html>"#,
        id, src
    )
}

/// `FakeHttp` where every camera in `test_settings` works.
pub fn healthy_cameras() -> FakeHttp {
    FakeHttp::new()
        .ok("https://example.com/alpha", page_with("cam", "/img/alpha.jpg"))
        .ok("https://example.com/img/alpha.jpg", JPEG)
        .ok(
            "https://beta.example.org/live.html",
            page_with("live", "snapshots/beta.jpg"),
        )
        .ok("https://beta.example.org/snapshots/beta.jpg", JPEG)
        .ok("https://example.com/gamma", page_with("cam", "https://cdn.example.net/g.jpg"))
        .ok("https://cdn.example.net/g.jpg", JPEG)
}
