//! Camera pipeline: page → `<img id=…>` → absolute URL → image → chat.

use crate::config::{CameraDescriptor, Settings};
use crate::http::{HttpClient, HttpError};
use crate::scheduler::Sleeper;
use crate::telegram::{Notifier, SinkError};
use reqwest::Url;
use scraper::{ElementRef, Html};

/// Why a camera produced no photo this cycle.
#[derive(Debug, thiserror::Error)]
pub enum SkipReason {
    #[error("page fetch failed: {0}")]
    PageFetch(HttpError),

    #[error("no <img> with id '{image_id}' on the page")]
    ImageTagMissing { image_id: String },

    #[error("<img id='{image_id}'> has no src attribute")]
    MissingSource { image_id: String },

    #[error("cannot resolve image URL: {0}")]
    InvalidUrl(String),

    #[error("image fetch failed: {0}")]
    ImageFetch(HttpError),

    #[error("image at {0} is empty")]
    EmptyImage(String),

    #[error("delivery failed: {0}")]
    Delivery(SinkError),
}

/// Per-item result of one camera run.
#[derive(Debug)]
pub enum CameraOutcome {
    /// Photo handed to the sink; carries the image size in bytes.
    Sent { bytes: usize },
    Skipped(SkipReason),
}

impl CameraOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, CameraOutcome::Sent { .. })
    }

    /// Whether the sink was called for this camera.
    fn reached_sink(&self) -> bool {
        matches!(
            self,
            CameraOutcome::Sent { .. } | CameraOutcome::Skipped(SkipReason::Delivery(_))
        )
    }
}

#[derive(Debug)]
pub struct CameraResult {
    pub name: String,
    pub outcome: CameraOutcome,
}

/// Find the first `<img>` whose `id` equals `image_id` and return its `src`.
pub fn extract_image_src(html: &str, image_id: &str) -> Result<String, SkipReason> {
    let document = Html::parse_document(html);
    let img = document
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "img" && el.value().attr("id") == Some(image_id))
        .ok_or_else(|| SkipReason::ImageTagMissing {
            image_id: image_id.to_string(),
        })?;

    img.value()
        .attr("src")
        .map(str::trim)
        .filter(|src| !src.is_empty())
        .map(str::to_string)
        .ok_or_else(|| SkipReason::MissingSource {
            image_id: image_id.to_string(),
        })
}

/// Resolve a possibly relative `src` against `base`.
///
/// Absolute sources come back unchanged.
pub fn resolve_image_url(base: &str, src: &str) -> Result<Url, SkipReason> {
    let base = Url::parse(base).map_err(|e| SkipReason::InvalidUrl(format!("{}: {}", base, e)))?;
    base.join(src)
        .map_err(|e| SkipReason::InvalidUrl(format!("{}: {}", src, e)))
}

/// Run the whole fetch-extract-deliver chain for one camera.
pub async fn process_camera<H, N>(
    camera: &CameraDescriptor,
    settings: &Settings,
    http: &H,
    notifier: &N,
) -> CameraOutcome
where
    H: HttpClient,
    N: Notifier,
{
    match fetch_and_send(camera, settings, http, notifier).await {
        Ok(bytes) => CameraOutcome::Sent { bytes },
        Err(reason) => CameraOutcome::Skipped(reason),
    }
}

async fn fetch_and_send<H, N>(
    camera: &CameraDescriptor,
    settings: &Settings,
    http: &H,
    notifier: &N,
) -> Result<usize, SkipReason>
where
    H: HttpClient,
    N: Notifier,
{
    let timeout = settings.page_timeout();

    let page = http
        .get(&camera.page_url, &[], timeout)
        .await
        .and_then(|r| r.into_success(&camera.page_url))
        .map_err(SkipReason::PageFetch)?;
    let html = String::from_utf8_lossy(&page);

    let src = extract_image_src(&html, &camera.image_id)?;
    let image_url = resolve_image_url(camera.resolve_base(), &src)?;
    log::debug!("[Camera] {}: image at {}", camera.name, image_url);

    let image = http
        .get(image_url.as_str(), &[], timeout)
        .await
        .and_then(|r| r.into_success(image_url.as_str()))
        .map_err(SkipReason::ImageFetch)?;
    if image.is_empty() {
        return Err(SkipReason::EmptyImage(image_url.to_string()));
    }

    let bytes = image.len();
    notifier
        .send_photo(image, &camera.name)
        .await
        .map_err(SkipReason::Delivery)?;
    Ok(bytes)
}

/// Process every camera in list order.
///
/// A failing camera is logged and skipped; it never stops the loop. After
/// each camera that reached the sink the pipeline pauses for the
/// configured throttle.
pub async fn run_cameras<H, N, S>(
    settings: &Settings,
    http: &H,
    notifier: &N,
    sleeper: &S,
) -> Vec<CameraResult>
where
    H: HttpClient,
    N: Notifier,
    S: Sleeper,
{
    let mut results = Vec::with_capacity(settings.cameras.len());

    for camera in &settings.cameras {
        log::info!("[Camera] processing: {}", camera.name);
        let outcome = process_camera(camera, settings, http, notifier).await;

        match &outcome {
            CameraOutcome::Sent { bytes } => {
                log::info!("[Camera] {}: sent ({} bytes)", camera.name, bytes)
            }
            CameraOutcome::Skipped(reason @ SkipReason::ImageTagMissing { .. }) => {
                log::warn!(
                    "[Camera] {}: {} at {}, skipping",
                    camera.name,
                    reason,
                    camera.page_url
                )
            }
            CameraOutcome::Skipped(reason) => {
                log::error!("[Camera] {}: {}, skipping", camera.name, reason)
            }
        }

        if outcome.reached_sink() {
            sleeper.sleep(settings.throttle()).await;
        }

        results.push(CameraResult {
            name: camera.name.clone(),
            outcome,
        });
    }

    let sent = results.iter().filter(|r| r.outcome.is_sent()).count();
    log::info!("[Camera] cycle done: {}/{} sent", sent, results.len());
    results
}
